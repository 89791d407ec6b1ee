//! Action proxy
//!
//! Read path: resolve the root alias, fetch and rewrite the first card and
//! remember it as the root's baseline.
//!
//! Write path: resolve the child alias, forward the action body verbatim,
//! classify the origin's answer and hand a tracking job to the dispatcher.
//! Classification priority is redirect, then transaction, then card; anything
//! else is passed through untracked.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, warn};

use super::tracking::{TrackedOutcome, TrackingDispatcher, TrackingJob};
use super::{AliasRegistry, LinkRewriter};
use crate::clients::{join_location, OriginClient, OriginResponse};
use crate::errors::{FramelinkerError, Result};
use crate::frame::{ActionPayload, Button, FrameCodec};
use crate::storage::{Baseline, SessionStore};

pub const DEFAULT_ACTION_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_CARD_CONTENT_TYPE: &str = "text/html; charset=utf-8";
const RAW_PAGE_CONTENT_TYPE: &str = "text/html";

/// How the origin's answer to an action was understood
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Redirect,
    Transaction,
    Frame,
    /// Not a card; relayed as-is without tracking
    Passthrough,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyReply {
    /// 302 to the given absolute URL
    Redirect(String),
    Body {
        status: u16,
        content_type: String,
        body: Bytes,
    },
}

impl ProxyReply {
    fn html(status: u16, content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        ProxyReply::Body {
            status,
            content_type: content_type.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOutcome {
    pub classification: Classification,
    pub reply: ProxyReply,
}

pub struct ActionProxy {
    registry: Arc<AliasRegistry>,
    rewriter: LinkRewriter,
    codec: Arc<dyn FrameCodec>,
    origin: Arc<dyn OriginClient>,
    sessions: Arc<dyn SessionStore>,
    dispatcher: Arc<TrackingDispatcher>,
}

impl ActionProxy {
    pub fn new(
        registry: Arc<AliasRegistry>,
        codec: Arc<dyn FrameCodec>,
        origin: Arc<dyn OriginClient>,
        sessions: Arc<dyn SessionStore>,
        dispatcher: Arc<TrackingDispatcher>,
    ) -> Self {
        Self {
            rewriter: LinkRewriter::new(registry.clone()),
            registry,
            codec,
            origin,
            sessions,
            dispatcher,
        }
    }

    /// `GET /a?r=<root>`
    pub async fn load_card(&self, root_id: Option<&str>) -> Result<ProxyReply> {
        let root_id = root_id.unwrap_or_default();
        let target = self
            .registry
            .resolve(root_id)
            .await?
            .ok_or_else(invalid_request)?;

        let response = self.origin.fetch(&target).await?;
        let html = response.text();
        let card = match self.codec.parse_card(&html, &target) {
            Ok(card) => card,
            Err(e) => {
                debug!("origin {} served no card: {}", target, e);
                return Ok(ProxyReply::html(200, RAW_PAGE_CONTENT_TYPE, response.body));
            }
        };

        let (rewritten, minted) = self.rewriter.rewrite(&card, root_id).await?;
        // 每次加载都覆盖基线，点击归因依赖它
        self.sessions
            .save_baseline(root_id, &Baseline::new(minted, rewritten.buttons.clone()))
            .await?;

        let page = with_origin_redirect(&self.codec.render_card(&rewritten), &target);
        info!("Served first card of {} ({})", root_id, target);
        Ok(ProxyReply::html(200, RAW_PAGE_CONTENT_TYPE, page))
    }

    /// `POST /a?r=<root>&n=<child>`
    pub async fn handle_action(
        &self,
        root_id: Option<&str>,
        child_id: Option<&str>,
        content_type: Option<&str>,
        body: Bytes,
    ) -> Result<ActionOutcome> {
        let (Some(root_id), Some(child_id)) = (root_id, child_id) else {
            return Err(invalid_request());
        };
        if !self.registry.is_well_formed(root_id) {
            return Err(invalid_request());
        }
        let target = self
            .registry
            .resolve(child_id)
            .await?
            .ok_or_else(invalid_request)?;
        let payload = ActionPayload::from_slice(&body).map_err(|e| {
            debug!("rejecting action body: {}", e);
            invalid_request()
        })?;

        let content_type = content_type
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_ACTION_CONTENT_TYPE);
        let response = self.origin.forward(&target, content_type, body).await?;

        let job = |outcome: TrackedOutcome, next_buttons: Option<Vec<Button>>| TrackingJob {
            root_id: root_id.to_string(),
            child_id: child_id.to_string(),
            child_target: target.clone(),
            payload: payload.clone(),
            outcome,
            next_buttons,
        };

        let (classification, reply) = if response.is_redirect() {
            let location = join_location(&target, response.location.as_deref().unwrap_or_default());
            self.dispatcher.dispatch(job(
                TrackedOutcome::Redirect {
                    location: location.clone(),
                },
                None,
            ));
            (Classification::Redirect, ProxyReply::Redirect(location))
        } else if payload.carries_transaction() {
            let outcome = TrackedOutcome::Transaction {
                transaction_id: payload.untrusted_data.transaction_id.clone(),
                address: payload.untrusted_data.address.clone(),
            };
            self.dispatcher.dispatch(job(outcome, None));
            (Classification::Transaction, relay(response, DEFAULT_ACTION_CONTENT_TYPE))
        } else {
            match self.codec.parse_card(&response.text(), &target) {
                Ok(card) => {
                    let (rewritten, _) = self.rewriter.rewrite(&card, root_id).await?;
                    let html = self.codec.render_card(&rewritten);
                    self.dispatcher
                        .dispatch(job(TrackedOutcome::Frame, Some(rewritten.buttons)));
                    let content_type = response
                        .content_type
                        .unwrap_or_else(|| DEFAULT_CARD_CONTENT_TYPE.to_string());
                    (Classification::Frame, ProxyReply::html(200, content_type, html))
                }
                Err(e) => {
                    warn!("origin {} answered action with a non-card: {}", target, e);
                    (Classification::Passthrough, relay(response, RAW_PAGE_CONTENT_TYPE))
                }
            }
        };

        debug!("action {} -> {} classified as {:?}", child_id, target, classification);
        Ok(ActionOutcome {
            classification,
            reply,
        })
    }
}

fn invalid_request() -> FramelinkerError {
    FramelinkerError::bad_request("Invalid request")
}

fn relay(response: OriginResponse, default_content_type: &str) -> ProxyReply {
    ProxyReply::Body {
        status: response.status,
        content_type: response
            .content_type
            .unwrap_or_else(|| default_content_type.to_string()),
        body: response.body,
    }
}

/// Puts a script that sends browsers to the real frame right after `<html>`.
fn with_origin_redirect(page: &str, target: &str) -> String {
    let literal = serde_json::to_string(target)
        .unwrap_or_else(|_| "\"\"".to_string())
        .replace("</", "<\\/");
    let script = format!(
        "<script>if (typeof window !== \"undefined\") {{ window.location.replace({}); }}</script>",
        literal
    );
    page.replacen("<html>", &format!("<html>{}", script), 1)
}
