//! Farcaster hub: signature validation and requester profile
//!
//! Both collaborators share one [`HubClient`]. Byte fields in hub JSON come
//! back base64-encoded except hashes, which are `0x` hex.

use anyhow::{Context, bail};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};
use ureq::Agent;

use super::agent_with_timeout;
use crate::config::HubConfig;
use crate::frame::{ActionPayload, CastId, ValidatedAction};

/// Verifies the signed half of an action payload.
#[async_trait]
pub trait ActionValidator: Send + Sync {
    async fn validate(&self, payload: &ActionPayload) -> anyhow::Result<ValidatedAction>;
}

/// Social-graph lookup for the identify call.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn fetch_profile(&self, fid: u64, cast: &CastId) -> anyhow::Result<UserProfile>;
}

/// Requester context pushed to analytics as person properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub verified_addresses: Vec<String>,
    pub custody_address: Option<String>,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub pfp: Option<String>,
    pub bio: Option<String>,
    pub caster_follows_requester: bool,
    pub requester_follows_caster: bool,
    pub liked_cast: bool,
    pub recasted_cast: bool,
}

impl UserProfile {
    /// Flat property map sent under `$set`.
    pub fn to_properties(&self) -> Map<String, Value> {
        let verified_address = match self.verified_addresses.as_slice() {
            [only] => only.clone(),
            _ => String::new(),
        };
        let warpcast_url = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!("https://warpcast.com/{}", u))
            .unwrap_or_default();
        let verified_addresses =
            serde_json::to_string(&self.verified_addresses).unwrap_or_else(|_| "[]".to_string());

        let mut props = Map::new();
        props.insert("verifiedAddresses".into(), json!(verified_addresses));
        props.insert("verifiedAddress".into(), json!(verified_address));
        props.insert(
            "custodyAddress".into(),
            json!(self.custody_address.clone().unwrap_or_default()),
        );
        props.insert("warpcastUrl".into(), json!(warpcast_url));
        for (key, value) in [
            ("username", &self.username),
            ("displayName", &self.display_name),
            ("pfp", &self.pfp),
            ("bio", &self.bio),
        ] {
            if let Some(value) = value {
                props.insert(key.into(), json!(value));
            }
        }
        props.insert("casterFollowsRequester".into(), json!(self.caster_follows_requester));
        props.insert("requesterFollowsCaster".into(), json!(self.requester_follows_caster));
        props.insert("likedCast".into(), json!(self.liked_cast));
        props.insert("recastedCast".into(), json!(self.recasted_cast));
        props
    }
}

#[derive(Clone)]
pub struct HubClient {
    agent: Agent,
    base_url: String,
    api_key: Option<String>,
}

impl HubClient {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            agent: agent_with_timeout(config.timeout_secs),
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    fn get(&self, path: &str) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        let mut request = self.agent.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            request = request.header("api_key", key);
        }
        request.call()
    }

    /// 2xx means the record exists; hubs answer 404 otherwise.
    fn exists(&self, path: &str) -> bool {
        matches!(self.get(path), Ok(response) if response.status().is_success())
    }

    fn get_json(&self, path: &str) -> anyhow::Result<Value> {
        let response = self.get(path).with_context(|| format!("hub GET {} failed", path))?;
        response
            .into_body()
            .read_json()
            .with_context(|| format!("hub GET {} returned invalid JSON", path))
    }

    /// `Ok(None)` when the hub refuses the message outright.
    fn validate_message(&self, message: Vec<u8>) -> anyhow::Result<Option<Value>> {
        let mut request = self
            .agent
            .post(format!("{}/v1/validateMessage", self.base_url))
            .header("Content-Type", "application/octet-stream");
        if let Some(key) = &self.api_key {
            request = request.header("api_key", key);
        }
        match request.send(message) {
            Ok(response) => Ok(Some(response.into_body().read_json()?)),
            Err(ureq::Error::StatusCode(code)) => {
                debug!("hub rejected message with status {}", code);
                Ok(None)
            }
            Err(e) => Err(e).context("hub validateMessage failed"),
        }
    }

    async fn on_blocking_pool<T, F>(&self, job: F) -> anyhow::Result<T>
    where
        F: FnOnce(HubClient) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let client = self.clone();
        tokio::task::spawn_blocking(move || job(client))
            .await
            .context("hub task panicked")?
    }
}

pub struct HubActionValidator {
    client: HubClient,
}

impl HubActionValidator {
    pub fn new(client: HubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActionValidator for HubActionValidator {
    async fn validate(&self, payload: &ActionPayload) -> anyhow::Result<ValidatedAction> {
        let Some(trusted) = payload.trusted_data.as_ref() else {
            return Ok(ValidatedAction::invalid());
        };
        let hex_bytes = trusted.message_bytes.trim_start_matches("0x");
        let Ok(message) = hex::decode(hex_bytes) else {
            debug!("messageBytes is not hex");
            return Ok(ValidatedAction::invalid());
        };

        let response = self
            .client
            .on_blocking_pool(move |client| client.validate_message(message))
            .await?;
        Ok(response
            .as_ref()
            .map(parse_validation)
            .unwrap_or_else(ValidatedAction::invalid))
    }
}

/// Reads the hub's `validateMessage` answer.
pub fn parse_validation(response: &Value) -> ValidatedAction {
    if !response["valid"].as_bool().unwrap_or(false) {
        return ValidatedAction::invalid();
    }
    let data = &response["message"]["data"];
    let Some(fid) = as_u64(&data["fid"]) else {
        return ValidatedAction::invalid();
    };
    let body = &data["frameActionBody"];
    let cast_id = as_u64(&body["castId"]["fid"]).map(|cast_fid| CastId {
        fid: cast_fid,
        hash: body["castId"]["hash"].as_str().unwrap_or_default().to_string(),
    });

    ValidatedAction {
        is_valid: true,
        fid,
        cast_id,
        button_index: as_u64(&body["buttonIndex"])
            .and_then(|index| u32::try_from(index).ok())
            .unwrap_or(0),
        input_text: body["inputText"].as_str().and_then(decode_text),
        address: body["address"].as_str().and_then(decode_bytes_as_hex),
        transaction_id: body["transactionId"].as_str().and_then(decode_bytes_as_hex),
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn decode_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match STANDARD.decode(raw).ok().and_then(|b| String::from_utf8(b).ok()) {
        Some(text) if !text.is_empty() => Some(text),
        Some(_) => None,
        None => Some(raw.to_string()),
    }
}

fn decode_bytes_as_hex(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    if raw.starts_with("0x") {
        return Some(raw.to_string());
    }
    match STANDARD.decode(raw) {
        Ok(bytes) if !bytes.is_empty() => Some(format!("0x{}", hex::encode(bytes))),
        _ => Some(raw.to_string()),
    }
}

pub struct HubIdentityProvider {
    client: HubClient,
}

impl HubIdentityProvider {
    pub fn new(client: HubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProvider for HubIdentityProvider {
    async fn fetch_profile(&self, fid: u64, cast: &CastId) -> anyhow::Result<UserProfile> {
        let same_user = fid == cast.fid;
        let caster = cast.fid;
        let hash = urlencoding::encode(&cast.hash).into_owned();
        let reaction = move |kind: u8| {
            format!(
                "/v1/reactionById?fid={}&reaction_type={}&target_fid={}&target_hash={}",
                fid, kind, caster, hash
            )
        };
        let like_path = reaction(1);
        let recast_path = reaction(2);

        let (follows, followed_by, liked, recasted, verifications, custody, user_data) = tokio::join!(
            self.client.on_blocking_pool(move |c| Ok(c.exists(&format!(
                "/v1/linkById?fid={}&target_fid={}&link_type=follow",
                fid, caster
            )))),
            self.client.on_blocking_pool(move |c| Ok(c.exists(&format!(
                "/v1/linkById?fid={}&target_fid={}&link_type=follow",
                caster, fid
            )))),
            self.client.on_blocking_pool(move |c| Ok(c.exists(&like_path))),
            self.client.on_blocking_pool(move |c| Ok(c.exists(&recast_path))),
            self.client
                .on_blocking_pool(move |c| c.get_json(&format!("/v1/verificationsByFid?fid={}", fid))),
            self.client
                .on_blocking_pool(move |c| c.get_json(&format!("/v1/onChainIdRegistryEvent?fid={}", fid))),
            self.client
                .on_blocking_pool(move |c| c.get_json(&format!("/v1/userDataByFid?fid={}", fid))),
        );

        let verifications = verifications?;
        let user_data = user_data?;
        // 托管地址缺失不影响 identify
        let custody = custody.ok();

        let mut profile = UserProfile {
            verified_addresses: parse_verified_addresses(&verifications),
            custody_address: custody.as_ref().and_then(parse_custody_address),
            requester_follows_caster: follows? || same_user,
            caster_follows_requester: followed_by? || same_user,
            liked_cast: liked?,
            recasted_cast: recasted?,
            ..UserProfile::default()
        };
        apply_user_data(&mut profile, &user_data)?;
        trace!("hub profile for fid {}: {:?}", fid, profile);
        Ok(profile)
    }
}

fn messages(response: &Value) -> &[Value] {
    response["messages"].as_array().map(Vec::as_slice).unwrap_or_default()
}

fn parse_verified_addresses(response: &Value) -> Vec<String> {
    messages(response)
        .iter()
        .filter_map(|m| {
            let data = &m["data"];
            data["verificationAddAddressBody"]["address"]
                .as_str()
                .or_else(|| data["verificationAddEthAddressBody"]["address"].as_str())
                .map(str::to_string)
        })
        .collect()
}

fn parse_custody_address(response: &Value) -> Option<String> {
    response["idRegisterEventBody"]["to"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| decode_bytes_as_hex(s).unwrap_or_else(|| s.to_string()))
}

fn apply_user_data(profile: &mut UserProfile, response: &Value) -> anyhow::Result<()> {
    if !response["messages"].is_array() {
        bail!("hub userDataByFid returned no messages");
    }
    for message in messages(response) {
        let body = &message["data"]["userDataBody"];
        let Some(value) = body["value"].as_str().map(str::to_string) else {
            continue;
        };
        match body["type"].as_str().unwrap_or_default() {
            "USER_DATA_TYPE_USERNAME" => profile.username = Some(value),
            "USER_DATA_TYPE_DISPLAY" => profile.display_name = Some(value),
            "USER_DATA_TYPE_PFP" => profile.pfp = Some(value),
            "USER_DATA_TYPE_BIO" => profile.bio = Some(value),
            _ => {}
        }
    }
    Ok(())
}
