//! Origin frame server client

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};
use ureq::Agent;
use url::Url;

use crate::config::OriginConfig;
use crate::errors::{FramelinkerError, Result};

/// 单个源站响应体上限
const MAX_BODY_BYTES: u64 = 5 * 1024 * 1024;

/// 重定向链最多跳数，读路径与动作路径共用
pub const MAX_REDIRECTS: u32 = 10;

/// Raw origin answer, redirects included
///
/// For a forwarded action that redirects, `location` is the end of the
/// redirect chain, already absolute.
#[derive(Debug, Clone, Default)]
pub struct OriginResponse {
    pub status: u16,
    pub location: Option<String>,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl OriginResponse {
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.location.is_some()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait OriginClient: Send + Sync {
    /// GET the card page.
    async fn fetch(&self, url: &str) -> Result<OriginResponse>;

    /// POST the action body as received.
    async fn forward(&self, url: &str, content_type: &str, body: Bytes) -> Result<OriginResponse>;
}

/// 读路径跟随重定向；动作转发只观察重定向，不跟随
///
/// Any status is a response, never an error.
pub struct UreqOriginClient {
    reader: Agent,
    forwarder: Agent,
    user_agent: String,
}

impl UreqOriginClient {
    pub fn new(config: &OriginConfig) -> Self {
        let timeout = Some(Duration::from_secs(config.timeout_secs));
        let reader = Agent::config_builder()
            .timeout_global(timeout)
            .max_redirects(MAX_REDIRECTS)
            .http_status_as_error(false)
            .build()
            .into();
        let forwarder = Agent::config_builder()
            .timeout_global(timeout)
            .max_redirects(0)
            .max_redirects_will_error(false)
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            reader,
            forwarder,
            user_agent: config.user_agent.clone(),
        }
    }

    fn read_response(
        url: &str,
        result: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
    ) -> Result<OriginResponse> {
        let response = result
            .map_err(|e| FramelinkerError::upstream(format!("Origin {} unreachable: {}", url, e)))?;

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = response.status().as_u16();
        let location = header("location");
        let content_type = header("content-type");

        let body = response
            .into_body()
            .with_config()
            .limit(MAX_BODY_BYTES)
            .read_to_vec()
            .map_err(|e| FramelinkerError::upstream(format!("Origin {} body read failed: {}", url, e)))?;

        trace!("origin {} -> {} ({} bytes)", url, status, body.len());
        Ok(OriginResponse {
            status,
            location,
            content_type,
            body: Bytes::from(body),
        })
    }

    /// 用 HEAD 沿重定向链走到终点，只读响应头不取页面
    fn follow_location(agent: &Agent, user_agent: &str, from: &str, location: &str) -> String {
        let mut current = join_location(from, location);
        for _ in 0..MAX_REDIRECTS {
            let next = match agent.head(&current).header("User-Agent", user_agent).call() {
                Ok(response) if response.status().is_redirection() => response
                    .headers()
                    .get("location")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string),
                Ok(_) => None,
                Err(e) => {
                    debug!("stopping redirect chain at {}: {}", current, e);
                    None
                }
            };
            match next {
                Some(next) => current = join_location(&current, &next),
                None => break,
            }
        }
        current
    }

    async fn run_blocking<F>(job: F) -> Result<OriginResponse>
    where
        F: FnOnce() -> Result<OriginResponse> + Send + 'static,
    {
        tokio::task::spawn_blocking(job)
            .await
            .map_err(|e| FramelinkerError::upstream(format!("Origin request task failed: {}", e)))?
    }
}

#[async_trait]
impl OriginClient for UreqOriginClient {
    async fn fetch(&self, url: &str) -> Result<OriginResponse> {
        debug!("Fetching origin card {}", url);
        let agent = self.reader.clone();
        let user_agent = self.user_agent.clone();
        let url = url.to_string();
        Self::run_blocking(move || {
            let result = agent.get(&url).header("User-Agent", &user_agent).call();
            Self::read_response(&url, result)
        })
        .await
    }

    async fn forward(&self, url: &str, content_type: &str, body: Bytes) -> Result<OriginResponse> {
        debug!("Forwarding action to {}", url);
        let agent = self.forwarder.clone();
        let user_agent = self.user_agent.clone();
        let content_type = content_type.to_string();
        let url = url.to_string();
        Self::run_blocking(move || {
            let result = agent
                .post(&url)
                .header("User-Agent", &user_agent)
                .header("Content-Type", &content_type)
                .send(&body[..]);
            let mut response = Self::read_response(&url, result)?;
            if response.is_redirect() {
                let first = response.location.take().unwrap_or_default();
                response.location = Some(Self::follow_location(&agent, &user_agent, &url, &first));
            }
            Ok(response)
        })
        .await
    }
}

/// Resolves a possibly relative `Location` against the URL that sent it.
pub fn join_location(base: &str, location: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(location))
        .map(String::from)
        .unwrap_or_else(|_| location.to_string())
}
