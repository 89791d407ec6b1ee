use std::sync::Arc;

use actix_web::http::header::{CONTENT_TYPE, LOCATION};
use actix_web::{HttpRequest, HttpResponse, Resource, web};
use serde::Deserialize;
use tracing::trace;

use super::{plain_error, status_or_bad_gateway};
use crate::services::{ActionProxy, ProxyReply};

/// `r` is the root alias, `n` the child alias the action targets
#[derive(Debug, Default, Deserialize)]
pub struct ProxyQuery {
    pub r: Option<String>,
    pub n: Option<String>,
}

pub struct ProxyService;

impl ProxyService {
    pub async fn load_card(
        query: web::Query<ProxyQuery>,
        proxy: web::Data<Arc<ActionProxy>>,
    ) -> HttpResponse {
        match proxy.load_card(query.r.as_deref()).await {
            Ok(reply) => Self::into_response(reply),
            Err(e) => plain_error(&e),
        }
    }

    pub async fn handle_action(
        req: HttpRequest,
        query: web::Query<ProxyQuery>,
        body: web::Bytes,
        proxy: web::Data<Arc<ActionProxy>>,
    ) -> HttpResponse {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        match proxy
            .handle_action(query.r.as_deref(), query.n.as_deref(), content_type, body)
            .await
        {
            Ok(outcome) => {
                trace!("action classified as {:?}", outcome.classification);
                Self::into_response(outcome.reply)
            }
            Err(e) => plain_error(&e),
        }
    }

    fn into_response(reply: ProxyReply) -> HttpResponse {
        match reply {
            ProxyReply::Redirect(location) => HttpResponse::Found()
                .insert_header((LOCATION, location))
                .body("Redirected"),
            ProxyReply::Body {
                status,
                content_type,
                body,
            } => HttpResponse::build(status_or_bad_gateway(status))
                .insert_header((CONTENT_TYPE, content_type))
                .body(body),
        }
    }
}

pub fn proxy_routes() -> Resource {
    web::resource(vec!["/a", "/a/"])
        .route(web::get().to(ProxyService::load_card))
        .route(web::post().to(ProxyService::handle_action))
}
