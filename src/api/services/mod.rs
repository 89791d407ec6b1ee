pub mod health;
pub mod proxy;
pub mod register;

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use tracing::{debug, error};

use crate::errors::FramelinkerError;

pub use health::{AppStartTime, HealthService, health_routes};
pub use proxy::{ProxyService, proxy_routes};
pub use register::{RegisterService, register_routes};

/// Body text for an error: client errors carry their message, server errors
/// only their status reason.
pub(crate) fn public_message(err: &FramelinkerError) -> String {
    let status = err.http_status();
    if status.is_server_error() {
        error!("{}", err.format_simple());
        status.canonical_reason().unwrap_or("Internal Server Error").to_string()
    } else {
        debug!("{}", err.format_simple());
        err.message().to_string()
    }
}

pub(crate) fn plain_error(err: &FramelinkerError) -> HttpResponse {
    let status = err.http_status();
    HttpResponse::build(status)
        .content_type("text/plain; charset=utf-8")
        .body(public_message(err))
}

pub(crate) fn status_or_bad_gateway(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY)
}
