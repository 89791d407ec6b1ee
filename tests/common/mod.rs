//! Shared fixtures for integration tests
//!
//! Hand-written collaborators stand in for the origin server, the hub and
//! PostHog; storage is the in-memory KV store.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

use framelinker::clients::{
    ActionValidator, AnalyticsClient, AnalyticsEvent, AnalyticsTarget, IdentityProvider,
    OriginClient, OriginResponse, UserProfile,
};
use framelinker::config::StaticConfig;
use framelinker::errors::{FramelinkerError, Result};
use framelinker::frame::{ActionPayload, CastId, MetaTagCodec, ValidatedAction};
use framelinker::runtime::lifetime::startup::{Collaborators, StartupContext};
use framelinker::storage::{KvSessionStore, KvStore, MemoryKvStore, SessionStore};

pub const PUBLIC_URL: &str = "https://proxy.test";
pub const FRAME_URL: &str = "https://ex.com/frame";

// =============================================================================
// Origin
// =============================================================================

/// A forwarded action as the origin saw it
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub url: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Default)]
pub struct MockOrigin {
    pages: Mutex<HashMap<String, OriginResponse>>,
    actions: Mutex<HashMap<String, OriginResponse>>,
    forwarded: Mutex<Vec<Forwarded>>,
}

impl MockOrigin {
    pub fn page(&self, url: &str, response: OriginResponse) {
        self.pages.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn action(&self, url: &str, response: OriginResponse) {
        self.actions.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn forwarded(&self) -> Vec<Forwarded> {
        self.forwarded.lock().unwrap().clone()
    }
}

#[async_trait]
impl OriginClient for MockOrigin {
    async fn fetch(&self, url: &str) -> Result<OriginResponse> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FramelinkerError::upstream(format!("{} unreachable", url)))
    }

    async fn forward(&self, url: &str, content_type: &str, body: Bytes) -> Result<OriginResponse> {
        self.forwarded.lock().unwrap().push(Forwarded {
            url: url.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        self.actions
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FramelinkerError::upstream(format!("{} unreachable", url)))
    }
}

pub fn html_response(html: impl Into<String>) -> OriginResponse {
    OriginResponse {
        status: 200,
        location: None,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: Bytes::from(html.into()),
    }
}

pub fn redirect_response(location: &str) -> OriginResponse {
    OriginResponse {
        status: 302,
        location: Some(location.to_string()),
        content_type: None,
        body: Bytes::new(),
    }
}

pub fn json_response(body: &str) -> OriginResponse {
    OriginResponse {
        status: 200,
        location: None,
        content_type: Some("application/json".to_string()),
        body: Bytes::from(body.to_string()),
    }
}

/// Frame page with post buttons labelled as given.
pub fn frame_page(post_url: &str, labels: &[&str]) -> String {
    let mut head = format!(
        r#"<meta property="fc:frame" content="vNext"/><meta property="fc:frame:image" content="https://ex.com/img.png"/><meta property="fc:frame:post_url" content="{}"/>"#,
        post_url
    );
    for (i, label) in labels.iter().enumerate() {
        head.push_str(&format!(
            r#"<meta property="fc:frame:button:{}" content="{}"/>"#,
            i + 1,
            label
        ));
    }
    format!("<!DOCTYPE html><html><head>{}</head><body></body></html>", head)
}

// =============================================================================
// Hub
// =============================================================================

/// Trusts the untrusted half unless told the signature is bad.
pub struct MockValidator {
    valid: AtomicBool,
}

impl Default for MockValidator {
    fn default() -> Self {
        Self {
            valid: AtomicBool::new(true),
        }
    }
}

impl MockValidator {
    pub fn reject_all(&self) {
        self.valid.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl ActionValidator for MockValidator {
    async fn validate(&self, payload: &ActionPayload) -> anyhow::Result<ValidatedAction> {
        if !self.valid.load(Ordering::SeqCst) {
            return Ok(ValidatedAction::invalid());
        }
        let data = &payload.untrusted_data;
        Ok(ValidatedAction {
            is_valid: true,
            fid: data.fid,
            cast_id: data.cast_id.clone(),
            button_index: data.button_index,
            input_text: data.input_text.clone(),
            address: data.address.clone(),
            transaction_id: data.transaction_id.clone(),
        })
    }
}

#[derive(Default)]
pub struct MockIdentity {
    calls: AtomicUsize,
}

impl MockIdentity {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn fetch_profile(&self, fid: u64, _cast: &CastId) -> anyhow::Result<UserProfile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(UserProfile {
            username: Some(format!("user{}", fid)),
            verified_addresses: vec!["0xabc".to_string()],
            ..UserProfile::default()
        })
    }
}

// =============================================================================
// Analytics
// =============================================================================

#[derive(Default)]
pub struct MockAnalytics {
    events: Mutex<Vec<(AnalyticsTarget, AnalyticsEvent)>>,
}

impl MockAnalytics {
    pub fn events(&self) -> Vec<(AnalyticsTarget, AnalyticsEvent)> {
        self.events.lock().unwrap().clone()
    }

    /// Events other than `$identify`.
    pub fn clicks(&self) -> Vec<AnalyticsEvent> {
        self.events()
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| e.name != "$identify")
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|(_, e)| e.name == name).count()
    }
}

#[async_trait]
impl AnalyticsClient for MockAnalytics {
    async fn capture(&self, target: &AnalyticsTarget, event: &AnalyticsEvent) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((target.clone(), event.clone()));
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub context: StartupContext,
    pub kv: Arc<dyn KvStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub origin: Arc<MockOrigin>,
    pub validator: Arc<MockValidator>,
    pub identity: Arc<MockIdentity>,
    pub analytics: Arc<MockAnalytics>,
}

pub fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.server.public_url = PUBLIC_URL.to_string();
    config.tracking.workers = 2;
    config.tracking.queue_capacity = 64;
    config
}

/// Must be called inside a runtime; tracking workers are spawned here.
pub fn harness() -> Harness {
    let kv: Arc<dyn KvStore> = Arc::new(MemoryKvStore::default());
    let sessions: Arc<dyn SessionStore> = Arc::new(KvSessionStore::new(kv.clone()));
    let origin = Arc::new(MockOrigin::default());
    let validator = Arc::new(MockValidator::default());
    let identity = Arc::new(MockIdentity::default());
    let analytics = Arc::new(MockAnalytics::default());

    let context = StartupContext::assemble(
        &test_config(),
        kv.clone(),
        sessions.clone(),
        Collaborators {
            codec: Arc::new(MetaTagCodec::new()),
            origin: origin.clone(),
            validator: validator.clone(),
            identity: identity.clone(),
            analytics: analytics.clone(),
        },
    );

    Harness {
        context,
        kv,
        sessions,
        origin,
        validator,
        identity,
        analytics,
    }
}

impl Harness {
    /// Polls until `done` holds or two seconds passed.
    pub async fn wait_until(&self, done: impl Fn(&MockAnalytics) -> bool) -> bool {
        for _ in 0..200 {
            if done(&self.analytics) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        done(&self.analytics)
    }

    /// Lets in-flight jobs finish so "nothing was sent" assertions hold.
    pub async fn drain(&self) {
        self.context
            .dispatcher
            .shutdown(Duration::from_secs(2))
            .await;
    }
}

/// `(root, child)` query values of a rewritten action URL.
pub fn alias_pair(url: &str) -> (String, String) {
    let parsed = url::Url::parse(url).unwrap();
    let get = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .unwrap()
    };
    (get("r"), get("n"))
}

pub fn action_body(fid: u64, button_index: u32) -> String {
    serde_json::json!({
        "untrustedData": {
            "fid": fid,
            "url": FRAME_URL,
            "messageHash": "0x01",
            "timestamp": 1706243218,
            "buttonIndex": button_index,
            "castId": {"fid": 226, "hash": "0xa48dd46161d8e57725f5e26e34ec19c13ff7f3b9"}
        },
        "trustedData": {"messageBytes": "0a0b"}
    })
    .to_string()
}
