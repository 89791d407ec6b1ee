//! Frame action payloads
//!
//! The client posts a signature packet: `untrustedData` is a plain copy of
//! the action, `trustedData.messageBytes` is the signed message only a
//! validator can vouch for.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastId {
    pub fid: u64,
    #[serde(default)]
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UntrustedData {
    #[serde(default)]
    pub fid: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub message_hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<u64>,
    #[serde(default)]
    pub button_index: u32,
    #[serde(default)]
    pub input_text: Option<String>,
    #[serde(default)]
    pub cast_id: Option<CastId>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedData {
    /// 十六进制编码的签名消息
    pub message_bytes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default)]
    pub untrusted_data: UntrustedData,
    #[serde(default)]
    pub trusted_data: Option<TrustedData>,
}

impl ActionPayload {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// A wallet transaction id or connected address marks a transaction step.
    pub fn carries_transaction(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.untrusted_data.transaction_id) || present(&self.untrusted_data.address)
    }
}

/// Result of signature validation
///
/// Everything except `is_valid` is only meaningful when `is_valid` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedAction {
    pub is_valid: bool,
    pub fid: u64,
    pub cast_id: Option<CastId>,
    pub button_index: u32,
    pub input_text: Option<String>,
    pub address: Option<String>,
    pub transaction_id: Option<String>,
}

impl ValidatedAction {
    pub fn invalid() -> Self {
        Self::default()
    }
}
