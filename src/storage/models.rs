use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::frame::Button;

/// 分析数据所在区域
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Region {
    Us,
    Eu,
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Analytics account that owns a root alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasOwner {
    pub api_key: String,
    pub region: Region,
}

impl AliasOwner {
    pub fn new(api_key: impl Into<String>, region: Region) -> Self {
        Self {
            api_key: api_key.into(),
            region,
        }
    }

    /// Stored as `key:region`
    pub fn encode(&self) -> String {
        format!("{}:{}", self.api_key, self.region)
    }

    /// Splits on the last `:` so API keys containing `:` survive.
    pub fn decode(raw: &str) -> Option<Self> {
        let (api_key, region) = raw.rsplit_once(':')?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self {
            api_key: api_key.to_string(),
            region: region.parse().ok()?,
        })
    }
}

/// First card served under a root alias
///
/// The very first click of a user has no per-user session yet; if the
/// clicked child alias belongs to `minted_ids` the baseline buttons are used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Baseline {
    pub minted_ids: BTreeSet<String>,
    pub buttons: Vec<Button>,
}

impl Baseline {
    pub fn new(minted_ids: impl IntoIterator<Item = String>, buttons: Vec<Button>) -> Self {
        Self {
            minted_ids: minted_ids.into_iter().collect(),
            buttons,
        }
    }

    pub fn contains(&self, alias_id: &str) -> bool {
        self.minted_ids.contains(alias_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct StorageStatus {
    pub backend: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
