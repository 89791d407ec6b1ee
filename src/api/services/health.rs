use std::sync::Arc;
use std::time::Duration;

use actix_web::{HttpResponse, Resource, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, trace};

use crate::errors::Result;
use crate::services::TrackingDispatcher;
use crate::services::tracking::TrackingSnapshot;
use crate::storage::{KvStore, SessionStore, StorageStatus};

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: DateTime<Utc>,
}

impl Default for AppStartTime {
    fn default() -> Self {
        Self {
            start_datetime: Utc::now(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub kv: StorageStatus,
    pub sessions: StorageStatus,
    pub tracking: TrackingSnapshot,
    pub uptime_seconds: i64,
}

pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        kv: web::Data<Arc<dyn KvStore>>,
        sessions: web::Data<Arc<dyn SessionStore>>,
        dispatcher: web::Data<Arc<TrackingDispatcher>>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let kv_status = Self::probe(kv.backend_name(), kv.health_check()).await;
        let session_status = Self::probe(sessions.backend_name(), sessions.health_check()).await;
        let healthy = kv_status.status == "healthy" && session_status.status == "healthy";

        let body = HealthResponse {
            status: if healthy { "healthy" } else { "unhealthy" },
            kv: kv_status,
            sessions: session_status,
            tracking: dispatcher.stats(),
            uptime_seconds: (Utc::now() - app_start_time.start_datetime)
                .num_seconds()
                .max(0),
        };

        if healthy {
            HttpResponse::Ok().json(body)
        } else {
            HttpResponse::ServiceUnavailable().json(body)
        }
    }

    async fn probe(
        backend: &str,
        check: impl std::future::Future<Output = Result<()>>,
    ) -> StorageStatus {
        let error = match tokio::time::timeout(CHECK_TIMEOUT, check).await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some("timeout".to_string()),
        };
        if let Some(e) = &error {
            error!("{} health check failed: {}", backend, e);
        }
        StorageStatus {
            backend: backend.to_string(),
            status: if error.is_none() { "healthy" } else { "unhealthy" }.to_string(),
            error,
        }
    }
}

pub fn health_routes() -> Resource {
    web::resource("/health").route(web::get().to(HealthService::health_check))
}
