//! Outbound HTTP collaborators
//!
//! All of them use blocking `ureq` agents and hop onto the blocking pool
//! with `spawn_blocking`, so callers stay async.

pub mod hub;
pub mod origin;
pub mod posthog;

use std::time::Duration;

use ureq::Agent;

pub use hub::{ActionValidator, HubActionValidator, HubClient, HubIdentityProvider, IdentityProvider, UserProfile};
pub use origin::{join_location, OriginClient, OriginResponse, UreqOriginClient};
pub use posthog::{AnalyticsClient, AnalyticsEvent, AnalyticsTarget, PosthogClient};

/// Agent with a global timeout; status codes are reported as errors.
pub(crate) fn agent_with_timeout(timeout_secs: u64) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .into()
}
