//! Analytics ingestion (PostHog capture API)

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::trace;
use ureq::Agent;

use super::agent_with_timeout;
use crate::config::AnalyticsConfig;
use crate::storage::{AliasOwner, Region};

/// Account and region an event is delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsTarget {
    pub api_key: String,
    pub region: Region,
}

impl From<AliasOwner> for AnalyticsTarget {
    fn from(owner: AliasOwner) -> Self {
        Self {
            api_key: owner.api_key,
            region: owner.region,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub name: String,
    pub distinct_id: String,
    pub properties: Map<String, Value>,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, distinct_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distinct_id: distinct_id.into(),
            properties: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Fire-and-forget delivery; failures are returned, never retried.
#[async_trait]
pub trait AnalyticsClient: Send + Sync {
    async fn capture(&self, target: &AnalyticsTarget, event: &AnalyticsEvent) -> anyhow::Result<()>;
}

#[derive(Serialize)]
struct CaptureBody<'a> {
    api_key: &'a str,
    event: &'a str,
    distinct_id: &'a str,
    properties: &'a Map<String, Value>,
}

pub struct PosthogClient {
    agent: Agent,
    us_endpoint: String,
    eu_endpoint: String,
}

impl PosthogClient {
    pub fn new(config: &AnalyticsConfig) -> Self {
        Self {
            agent: agent_with_timeout(config.timeout_secs),
            us_endpoint: config.us_endpoint.trim_end_matches('/').to_string(),
            eu_endpoint: config.eu_endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn capture_url(&self, region: Region) -> String {
        let endpoint = match region {
            Region::Us => &self.us_endpoint,
            Region::Eu => &self.eu_endpoint,
        };
        format!("{}/capture/", endpoint)
    }
}

#[async_trait]
impl AnalyticsClient for PosthogClient {
    async fn capture(&self, target: &AnalyticsTarget, event: &AnalyticsEvent) -> anyhow::Result<()> {
        let url = self.capture_url(target.region);
        let payload = serde_json::to_value(CaptureBody {
            api_key: &target.api_key,
            event: &event.name,
            distinct_id: &event.distinct_id,
            properties: &event.properties,
        })?;
        let agent = self.agent.clone();
        let event_name = event.name.clone();

        tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
            let response = agent
                .post(&url)
                .send_json(&payload)
                .with_context(|| format!("capture '{}' to {} failed", event_name, url))?;
            let status = response.status();
            if !status.is_success() {
                bail!("capture '{}' rejected with {}", event_name, status);
            }
            trace!("captured '{}' via {}", event_name, url);
            Ok(())
        })
        .await
        .context("capture task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_selects_endpoint() {
        let client = PosthogClient::new(&AnalyticsConfig::default());
        assert_eq!(client.capture_url(Region::Us), "https://us.i.posthog.com/capture/");
        assert_eq!(client.capture_url(Region::Eu), "https://eu.i.posthog.com/capture/");
    }

    #[test]
    fn test_capture_body_shape() {
        let event = AnalyticsEvent::new("frame_click", "42").with("buttonIndex", "2");
        let body = serde_json::to_value(CaptureBody {
            api_key: "phc_1",
            event: &event.name,
            distinct_id: &event.distinct_id,
            properties: &event.properties,
        })
        .unwrap();

        assert_eq!(body["api_key"], "phc_1");
        assert_eq!(body["event"], "frame_click");
        assert_eq!(body["distinct_id"], "42");
        assert_eq!(body["properties"]["buttonIndex"], "2");
    }
}
