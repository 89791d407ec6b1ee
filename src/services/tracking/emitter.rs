//! Outcome → analytics event mapping

use serde_json::Value;

use crate::clients::{AnalyticsEvent, UserProfile};
use crate::frame::{Button, ValidatedAction};

pub const FRAME_CLICK: &str = "frame_click";
pub const FRAME_REDIRECT: &str = "frame_redirect";
pub const FRAME_TRANSACTION: &str = "frame_transaction";
pub const IDENTIFY: &str = "$identify";

/// 无法还原按钮时使用的标签
pub const UNKNOWN_BUTTON_LABEL: &str = "unknown";

/// What the origin answered, as far as analytics cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedOutcome {
    Frame,
    Redirect { location: String },
    Transaction {
        transaction_id: Option<String>,
        address: Option<String>,
    },
}

/// Per-click context shared by all event kinds
#[derive(Debug, Clone)]
pub struct EventContext<'a> {
    pub action: &'a ValidatedAction,
    pub button_label: &'a str,
    /// Child alias target the action was forwarded to
    pub post_url: &'a str,
    /// Root alias target
    pub frame_url: &'a str,
}

pub fn cast_url(hash: &str) -> String {
    format!("https://warpcast.com/~/conversations/{}", hash)
}

pub fn build_event(outcome: &TrackedOutcome, ctx: &EventContext<'_>) -> AnalyticsEvent {
    let cast_hash = ctx
        .action
        .cast_id
        .as_ref()
        .map(|c| c.hash.as_str())
        .unwrap_or_default();

    let name = match outcome {
        TrackedOutcome::Frame => FRAME_CLICK,
        TrackedOutcome::Redirect { .. } => FRAME_REDIRECT,
        TrackedOutcome::Transaction { .. } => FRAME_TRANSACTION,
    };

    let event = AnalyticsEvent::new(name, ctx.action.fid.to_string())
        .with("castHash", cast_hash)
        .with("castUrl", cast_url(cast_hash))
        .with("buttonIndex", ctx.action.button_index.to_string())
        .with("buttonLabel", ctx.button_label)
        .with("postUrl", ctx.post_url)
        .with("frameUrl", ctx.frame_url)
        .with("inputText", ctx.action.input_text.clone());

    match outcome {
        TrackedOutcome::Frame => event,
        TrackedOutcome::Redirect { location } => event.with("redirectUrl", location.as_str()),
        TrackedOutcome::Transaction {
            transaction_id,
            address,
        } => event
            .with("transactionId", transaction_id.clone())
            .with("address", address.clone()),
    }
}

pub fn identify_event(fid: u64, profile: &UserProfile) -> AnalyticsEvent {
    AnalyticsEvent::new(IDENTIFY, fid.to_string())
        .with("$set", Value::Object(profile.to_properties()))
}

/// Label of the 1-based `button_index` in `buttons`.
pub fn resolve_label(buttons: Option<&[Button]>, button_index: u32) -> String {
    (button_index as usize)
        .checked_sub(1)
        .and_then(|i| buttons?.get(i))
        .map(|b| b.label.clone())
        .unwrap_or_else(|| UNKNOWN_BUTTON_LABEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ButtonAction, CastId};

    fn action() -> ValidatedAction {
        ValidatedAction {
            is_valid: true,
            fid: 42,
            cast_id: Some(CastId {
                fid: 7,
                hash: "0xabc".to_string(),
            }),
            button_index: 2,
            input_text: Some("gm".to_string()),
            address: None,
            transaction_id: None,
        }
    }

    #[test]
    fn test_click_event_schema() {
        let action = action();
        let ctx = EventContext {
            action: &action,
            button_label: "B",
            post_url: "https://ex.com/next",
            frame_url: "https://ex.com/frame",
        };
        let event = build_event(&TrackedOutcome::Frame, &ctx);

        assert_eq!(event.name, "frame_click");
        assert_eq!(event.distinct_id, "42");
        assert_eq!(event.property("castHash"), Some("0xabc"));
        assert_eq!(
            event.property("castUrl"),
            Some("https://warpcast.com/~/conversations/0xabc")
        );
        assert_eq!(event.property("buttonIndex"), Some("2"));
        assert_eq!(event.property("buttonLabel"), Some("B"));
        assert_eq!(event.property("postUrl"), Some("https://ex.com/next"));
        assert_eq!(event.property("frameUrl"), Some("https://ex.com/frame"));
        assert_eq!(event.property("inputText"), Some("gm"));
        assert!(!event.properties.contains_key("redirectUrl"));
    }

    #[test]
    fn test_redirect_and_transaction_extras() {
        let action = action();
        let ctx = EventContext {
            action: &action,
            button_label: "unknown",
            post_url: "p",
            frame_url: "f",
        };

        let redirect = build_event(
            &TrackedOutcome::Redirect {
                location: "https://ex.com/thanks".to_string(),
            },
            &ctx,
        );
        assert_eq!(redirect.name, "frame_redirect");
        assert_eq!(redirect.property("redirectUrl"), Some("https://ex.com/thanks"));

        let tx = build_event(
            &TrackedOutcome::Transaction {
                transaction_id: Some("0xdead".to_string()),
                address: None,
            },
            &ctx,
        );
        assert_eq!(tx.name, "frame_transaction");
        assert_eq!(tx.property("transactionId"), Some("0xdead"));
        assert!(tx.properties["address"].is_null());
    }

    #[test]
    fn test_resolve_label() {
        let buttons = vec![
            Button::new("A", ButtonAction::Post),
            Button::new("B", ButtonAction::Post),
        ];
        assert_eq!(resolve_label(Some(buttons.as_slice()), 2), "B");
        assert_eq!(resolve_label(Some(buttons.as_slice()), 1), "A");
        assert_eq!(resolve_label(Some(buttons.as_slice()), 5), UNKNOWN_BUTTON_LABEL);
        assert_eq!(resolve_label(Some(buttons.as_slice()), 0), UNKNOWN_BUTTON_LABEL);
        assert_eq!(resolve_label(None, 1), UNKNOWN_BUTTON_LABEL);
    }

    #[test]
    fn test_identify_event_wraps_profile_in_set() {
        let profile = UserProfile {
            username: Some("dwr".to_string()),
            ..UserProfile::default()
        };
        let event = identify_event(42, &profile);
        assert_eq!(event.name, "$identify");
        assert_eq!(event.distinct_id, "42");
        assert_eq!(event.properties["$set"]["username"], "dwr");
    }
}
