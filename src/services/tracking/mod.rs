//! Off-path click tracking
//!
//! The proxy answers the client first and hands a [`TrackingJob`] to the
//! [`TrackingDispatcher`]. A worker then validates the action, identifies
//! the user once, works out which button was pressed and captures one event.

pub mod dispatcher;
pub mod emitter;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::clients::{ActionValidator, AnalyticsClient, AnalyticsTarget, IdentityProvider};
use crate::frame::{ActionPayload, Button, ValidatedAction};
use crate::services::AliasRegistry;
use crate::storage::{KvStore, SessionStore, StoreKey};

pub use dispatcher::{TrackingDispatcher, TrackingSnapshot, TrackingStats};
pub use emitter::{EventContext, TrackedOutcome, UNKNOWN_BUTTON_LABEL, build_event, identify_event};

/// Everything a worker needs to attribute one click
#[derive(Debug, Clone)]
pub struct TrackingJob {
    pub root_id: String,
    pub child_id: String,
    /// Target the action was forwarded to
    pub child_target: String,
    pub payload: ActionPayload,
    pub outcome: TrackedOutcome,
    /// Rewritten buttons of the card returned to the user, if any
    pub next_buttons: Option<Vec<Button>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Captured,
    SkippedNoOwner,
    SkippedInvalid,
}

#[async_trait]
pub trait TrackingHandler: Send + Sync {
    async fn handle(&self, job: TrackingJob) -> anyhow::Result<TrackStatus>;
}

pub struct Tracker {
    registry: Arc<AliasRegistry>,
    kv: Arc<dyn KvStore>,
    sessions: Arc<dyn SessionStore>,
    validator: Arc<dyn ActionValidator>,
    identity: Arc<dyn IdentityProvider>,
    analytics: Arc<dyn AnalyticsClient>,
}

impl Tracker {
    pub fn new(
        registry: Arc<AliasRegistry>,
        kv: Arc<dyn KvStore>,
        sessions: Arc<dyn SessionStore>,
        validator: Arc<dyn ActionValidator>,
        identity: Arc<dyn IdentityProvider>,
        analytics: Arc<dyn AnalyticsClient>,
    ) -> Self {
        Self {
            registry,
            kv,
            sessions,
            validator,
            identity,
            analytics,
        }
    }

    pub async fn track(&self, job: TrackingJob) -> anyhow::Result<TrackStatus> {
        let Some(owner) = self.registry.resolve_owner(&job.root_id).await? else {
            debug!("root {} has no owner, not tracking", job.root_id);
            return Ok(TrackStatus::SkippedNoOwner);
        };
        let frame_url = self
            .registry
            .resolve(&job.root_id)
            .await?
            .unwrap_or_default();
        let target = AnalyticsTarget::from(owner);

        let action = self.validator.validate(&job.payload).await?;
        if !action.is_valid {
            debug!("invalid signature on action under {}", job.root_id);
            return Ok(TrackStatus::SkippedInvalid);
        }

        self.identify_once(&target, &action).await;

        let previous = self.previous_buttons(&job, action.fid).await;
        let label = emitter::resolve_label(previous.as_deref(), action.button_index);

        if let Some(buttons) = &job.next_buttons
            && let Err(e) = self.sessions.save_session(&job.root_id, action.fid, buttons).await
        {
            warn!("Session write for fid {} under {} failed: {}", action.fid, job.root_id, e);
        }

        // 交易字段以签名消息为准
        let outcome = match &job.outcome {
            TrackedOutcome::Transaction {
                transaction_id,
                address,
            } => TrackedOutcome::Transaction {
                transaction_id: action.transaction_id.clone().or_else(|| transaction_id.clone()),
                address: action.address.clone().or_else(|| address.clone()),
            },
            other => other.clone(),
        };
        let event = build_event(
            &outcome,
            &EventContext {
                action: &action,
                button_label: &label,
                post_url: &job.child_target,
                frame_url: &frame_url,
            },
        );
        self.analytics.capture(&target, &event).await?;
        info!(
            "Tracked {} for fid {} under {} ({})",
            event.name, action.fid, job.root_id, label
        );
        Ok(TrackStatus::Captured)
    }

    /// Buttons the user saw before this click. First-card clicks read the
    /// baseline, later ones the user's own session. Read errors count as a miss.
    async fn previous_buttons(&self, job: &TrackingJob, fid: u64) -> Option<Vec<Button>> {
        match self.sessions.load_baseline(&job.root_id).await {
            Ok(Some(baseline)) if baseline.contains(&job.child_id) => return Some(baseline.buttons),
            Ok(_) => {}
            Err(e) => warn!("Baseline read for {} failed: {}", job.root_id, e),
        }
        self.sessions
            .load_session(&job.root_id, fid)
            .await
            .inspect_err(|e| warn!("Session read for fid {} failed: {}", fid, e))
            .ok()
            .flatten()
    }

    /// At most once per user, best effort: the marker is only written after
    /// the identify event went out, and concurrent first clicks may both send.
    async fn identify_once(&self, target: &AnalyticsTarget, action: &ValidatedAction) {
        let marker = StoreKey::IdentifyMarker(action.fid);
        match self.kv.get(marker).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                warn!("Identify marker read for fid {} failed: {}", action.fid, e);
                return;
            }
        }
        let Some(cast) = action.cast_id.as_ref() else {
            debug!("no cast on action from fid {}, identify skipped", action.fid);
            return;
        };

        let result: anyhow::Result<()> = async {
            let profile = self.identity.fetch_profile(action.fid, cast).await?;
            self.analytics
                .capture(target, &identify_event(action.fid, &profile))
                .await?;
            self.kv.put(marker, &Utc::now().to_rfc3339()).await?;
            Ok(())
        }
        .await;

        match result {
            Ok(()) => debug!("Identified fid {}", action.fid),
            Err(e) => warn!("Identify for fid {} failed: {:#}", action.fid, e),
        }
    }
}

#[async_trait]
impl TrackingHandler for Tracker {
    async fn handle(&self, job: TrackingJob) -> anyhow::Result<TrackStatus> {
        self.track(job).await
    }
}
