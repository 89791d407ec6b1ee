//! Frame card model
//!
//! A card is the structured form of a frame page: an image, up to four
//! buttons and the URL their actions are posted to. Cards are produced by a
//! [`FrameCodec`] from origin HTML and rendered back to HTML after the proxy
//! rewrote their URLs.

pub mod action;
pub mod codec;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

pub use action::{ActionPayload, CastId, TrustedData, UntrustedData, ValidatedAction};
pub use codec::MetaTagCodec;

/// 单个卡片最多允许的按钮数
pub const MAX_BUTTONS: usize = 4;

/// 按钮动作类型
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ButtonAction {
    /// 回传到 post_url，返回下一张卡片
    #[default]
    Post,
    /// 回传后由服务端返回 302
    PostRedirect,
    /// 客户端直接打开外部链接
    Link,
    /// 链上铸造（target 是代币地址，不是 URL）
    Mint,
    /// 钱包交易
    Tx,
}

impl ButtonAction {
    /// Whether the proxy mints a child alias for this button's target.
    pub fn is_proxied(&self) -> bool {
        matches!(self, ButtonAction::Post | ButtonAction::Tx)
    }

    /// Whether the frame protocol requires a `target` for this action.
    pub fn requires_target(&self) -> bool {
        matches!(
            self,
            ButtonAction::Link | ButtonAction::Mint | ButtonAction::Tx
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub label: String,
    #[serde(default)]
    pub action: ButtonAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// 按钮级别的 post_url 覆盖
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
}

impl Button {
    pub fn new(label: impl Into<String>, action: ButtonAction) -> Self {
        Self {
            label: label.into(),
            action,
            target: None,
            post_url: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub version: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_aspect_ratio: Option<String>,
    pub post_url: String,
    #[serde(default)]
    pub buttons: Vec<Button>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
}

/// Reason an origin page was not accepted as a card
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardError {
    /// No frame version tag at all
    NotAFrame,
    /// Frame tags present but inconsistent
    Malformed(String),
}

impl std::fmt::Display for CardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardError::NotAFrame => write!(f, "page is not a frame"),
            CardError::Malformed(reason) => write!(f, "malformed frame: {}", reason),
        }
    }
}

impl std::error::Error for CardError {}

/// Frame HTML codec
///
/// `base_url` is the URL the HTML was fetched from; relative targets and a
/// missing post URL resolve against it.
pub trait FrameCodec: Send + Sync {
    fn parse_card(&self, html: &str, base_url: &str) -> Result<Card, CardError>;
    fn render_card(&self, card: &Card) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_action_parse() {
        assert_eq!("post".parse::<ButtonAction>(), Ok(ButtonAction::Post));
        assert_eq!(
            "post_redirect".parse::<ButtonAction>(),
            Ok(ButtonAction::PostRedirect)
        );
        assert_eq!("TX".parse::<ButtonAction>(), Ok(ButtonAction::Tx));
        assert!("teleport".parse::<ButtonAction>().is_err());
        assert_eq!(ButtonAction::PostRedirect.as_ref(), "post_redirect");
    }

    #[test]
    fn test_button_list_accepts_label_only_entries() {
        let buttons: Vec<Button> =
            serde_json::from_str(r#"[{"label":"A"},{"label":"B"}]"#).unwrap();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[1].label, "B");
        assert_eq!(buttons[1].action, ButtonAction::Post);
        assert!(buttons[1].target.is_none());
    }

    #[test]
    fn test_button_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&Button::new("Go", ButtonAction::Link).with_target("https://x.io"))
            .unwrap();
        assert_eq!(json, r#"{"label":"Go","action":"link","target":"https://x.io"}"#);
    }
}
