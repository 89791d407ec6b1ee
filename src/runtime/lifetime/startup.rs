//! Component wiring
//!
//! Everything the HTTP server needs is built once here and shared with the
//! actix workers through `web::Data`.

use std::sync::Arc;

use actix_web::web;
use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::api::services::{AppStartTime, health_routes, proxy_routes, register_routes};
use crate::clients::{
    ActionValidator, AnalyticsClient, HubActionValidator, HubClient, HubIdentityProvider,
    IdentityProvider, OriginClient, PosthogClient, UreqOriginClient,
};
use crate::config::StaticConfig;
use crate::frame::{FrameCodec, MetaTagCodec};
use crate::services::{ActionProxy, AliasRegistry, Tracker, TrackingDispatcher};
use crate::storage::{KvStore, SessionStore, create_kv_store, create_session_store};

/// 请求体上限（签名包和表单都很小）
const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// External collaborators, swappable in tests
#[derive(Clone)]
pub struct Collaborators {
    pub codec: Arc<dyn FrameCodec>,
    pub origin: Arc<dyn OriginClient>,
    pub validator: Arc<dyn ActionValidator>,
    pub identity: Arc<dyn IdentityProvider>,
    pub analytics: Arc<dyn AnalyticsClient>,
}

impl Collaborators {
    pub fn from_config(config: &StaticConfig) -> Self {
        let hub = HubClient::new(&config.hub);
        Self {
            codec: Arc::new(MetaTagCodec::new()),
            origin: Arc::new(UreqOriginClient::new(&config.origin)),
            validator: Arc::new(HubActionValidator::new(hub.clone())),
            identity: Arc::new(HubIdentityProvider::new(hub)),
            analytics: Arc::new(PosthogClient::new(&config.analytics)),
        }
    }
}

#[derive(Clone)]
pub struct StartupContext {
    pub kv: Arc<dyn KvStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub registry: Arc<AliasRegistry>,
    pub proxy: Arc<ActionProxy>,
    pub dispatcher: Arc<TrackingDispatcher>,
    pub start_time: AppStartTime,
}

impl StartupContext {
    /// Wires the services; spawns tracking workers on the current runtime.
    pub fn assemble(
        config: &StaticConfig,
        kv: Arc<dyn KvStore>,
        sessions: Arc<dyn SessionStore>,
        collaborators: Collaborators,
    ) -> Self {
        let registry = Arc::new(AliasRegistry::new(
            kv.clone(),
            config.alias.id_length,
            config.server.public_url.clone(),
        ));

        let tracker = Arc::new(Tracker::new(
            registry.clone(),
            kv.clone(),
            sessions.clone(),
            collaborators.validator,
            collaborators.identity,
            collaborators.analytics,
        ));
        let dispatcher = Arc::new(TrackingDispatcher::start(
            tracker,
            config.tracking.workers,
            config.tracking.queue_capacity,
        ));

        let proxy = Arc::new(ActionProxy::new(
            registry.clone(),
            collaborators.codec,
            collaborators.origin,
            sessions.clone(),
            dispatcher.clone(),
        ));

        Self {
            kv,
            sessions,
            registry,
            proxy,
            dispatcher,
            start_time: AppStartTime::default(),
        }
    }

    /// Shared state plus every route.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.kv.clone()))
            .app_data(web::Data::new(self.sessions.clone()))
            .app_data(web::Data::new(self.registry.clone()))
            .app_data(web::Data::new(self.proxy.clone()))
            .app_data(web::Data::new(self.dispatcher.clone()))
            .app_data(web::Data::new(self.start_time.clone()))
            .app_data(web::PayloadConfig::new(MAX_PAYLOAD_BYTES))
            .service(register_routes())
            .service(proxy_routes())
            .service(health_routes());
    }
}

/// Installs the process-wide rustls provider used by redis TLS connections.
/// A second install attempt is harmless.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Connects storage backends and builds the real collaborators.
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let started = std::time::Instant::now();
    install_crypto_provider();

    let kv = create_kv_store(&config.kv)
        .await
        .context("Failed to create kv store")?;
    let sessions = create_session_store(config, kv.clone())
        .await
        .context("Failed to create session store")?;
    info!(
        "Storage ready: kv={}, sessions={}",
        kv.backend_name(),
        sessions.backend_name()
    );

    let context = StartupContext::assemble(config, kv, sessions, Collaborators::from_config(config));
    debug!("Startup completed in {:?}", started.elapsed());
    Ok(context)
}
