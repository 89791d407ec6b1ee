//! Alias registry
//!
//! Short alias ↔ target URL mapping plus the analytics owner of root
//! aliases. Shared by the HTTP register endpoint, the CLI and the proxy.

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{FramelinkerError, Result};
use crate::storage::{AliasOwner, KvStore, Region, StoreKey};
use crate::utils::url_validator::{is_valid_frame_url, root_link};
use crate::utils::{generate_alias_id, is_valid_alias_id};

/// Registration input as received (fields may be missing)
#[derive(Debug, Clone, Default)]
pub struct RegisterRequest {
    pub frame_url: Option<String>,
    pub api_key: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterResult {
    pub alias_id: String,
    /// Public link to share in place of the frame URL
    pub url: String,
}

pub struct AliasRegistry {
    kv: Arc<dyn KvStore>,
    id_length: usize,
    public_url: String,
}

impl AliasRegistry {
    pub fn new(kv: Arc<dyn KvStore>, id_length: usize, public_url: impl Into<String>) -> Self {
        Self {
            kv,
            id_length,
            public_url: public_url.into(),
        }
    }

    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    pub fn is_well_formed(&self, alias_id: &str) -> bool {
        is_valid_alias_id(alias_id, self.id_length)
    }

    /// Mints a fresh id; identical targets are not deduplicated.
    pub async fn create(&self, target_url: &str, owner: Option<&AliasOwner>) -> Result<String> {
        let id = generate_alias_id(self.id_length);
        self.kv.put(StoreKey::Alias(&id), target_url).await?;
        if let Some(owner) = owner {
            self.kv.put(StoreKey::AliasOwner(&id), &owner.encode()).await?;
        }
        debug!("alias {} -> {}", id, target_url);
        Ok(id)
    }

    /// Malformed ids resolve to nothing without touching storage.
    pub async fn resolve(&self, alias_id: &str) -> Result<Option<String>> {
        if !self.is_well_formed(alias_id) {
            return Ok(None);
        }
        self.kv.get(StoreKey::Alias(alias_id)).await
    }

    pub async fn resolve_owner(&self, root_id: &str) -> Result<Option<AliasOwner>> {
        if !self.is_well_formed(root_id) {
            return Ok(None);
        }
        let raw = self.kv.get(StoreKey::AliasOwner(root_id)).await?;
        Ok(raw.as_deref().and_then(AliasOwner::decode))
    }

    /// Validates a registration and creates its root alias.
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResult> {
        let present = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let (Some(frame_url), Some(api_key), Some(region)) =
            (present(req.frame_url), present(req.api_key), present(req.region))
        else {
            return Err(FramelinkerError::validation("Missing required fields"));
        };

        if !is_valid_frame_url(&frame_url) {
            return Err(FramelinkerError::validation("Invalid URL"));
        }
        let region: Region = region
            .parse()
            .map_err(|_| FramelinkerError::validation("Invalid region"))?;

        let owner = AliasOwner::new(api_key, region);
        let alias_id = self.create(&frame_url, Some(&owner)).await?;
        let url = root_link(&self.public_url, &alias_id);
        info!("Registered {} as {} ({})", frame_url, alias_id, region);

        Ok(RegisterResult { alias_id, url })
    }
}
