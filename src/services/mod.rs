//! Service layer
//!
//! Business logic shared by the HTTP handlers and the CLI.

pub mod action_proxy;
mod alias_registry;
mod link_rewriter;
pub mod tracking;

pub use action_proxy::{ActionOutcome, ActionProxy, Classification, ProxyReply};
pub use alias_registry::{AliasRegistry, RegisterRequest, RegisterResult};
pub use link_rewriter::LinkRewriter;
pub use tracking::{Tracker, TrackingDispatcher, TrackingJob};
