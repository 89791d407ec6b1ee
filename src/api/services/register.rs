use std::sync::Arc;

use actix_web::http::header::CONTENT_TYPE;
use actix_web::{HttpRequest, HttpResponse, Resource, web};
use serde::Deserialize;
use serde_json::json;

use super::public_message;
use crate::errors::FramelinkerError;
use crate::services::{AliasRegistry, RegisterRequest};

/// Accepted as JSON, form or query string; body fields win over the query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    pub frame_url: Option<String>,
    pub api_key: Option<String>,
    pub region: Option<String>,
    /// Older clients send `euRegion=true` instead of `region`
    pub eu_region: Option<String>,
}

impl RegisterForm {
    fn merge(self, fallback: RegisterForm) -> Self {
        Self {
            frame_url: self.frame_url.or(fallback.frame_url),
            api_key: self.api_key.or(fallback.api_key),
            region: self.region.or(fallback.region),
            eu_region: self.eu_region.or(fallback.eu_region),
        }
    }

    fn into_request(self) -> RegisterRequest {
        let region = self.region.or_else(|| {
            self.eu_region
                .map(|flag| if flag == "true" { "eu" } else { "us" }.to_string())
        });
        RegisterRequest {
            frame_url: self.frame_url,
            api_key: self.api_key,
            region,
        }
    }
}

pub struct RegisterService;

impl RegisterService {
    pub async fn register(
        req: HttpRequest,
        body: web::Bytes,
        registry: web::Data<Arc<AliasRegistry>>,
    ) -> HttpResponse {
        let form = match Self::parse(&req, &body) {
            Ok(form) => form,
            Err(e) => return Self::error(&e),
        };

        match registry.register(form.into_request()).await {
            Ok(result) => HttpResponse::Ok().json(json!({ "url": result.url })),
            Err(e) => Self::error(&e),
        }
    }

    fn parse(req: &HttpRequest, body: &[u8]) -> Result<RegisterForm, FramelinkerError> {
        let query = web::Query::<RegisterForm>::from_query(req.query_string())
            .map(web::Query::into_inner)
            .unwrap_or_default();
        if body.is_empty() {
            return Ok(query);
        }

        let is_json = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let form = if is_json {
            serde_json::from_slice::<RegisterForm>(body)
                .map_err(|_| FramelinkerError::bad_request("Invalid request body"))?
        } else {
            let text = std::str::from_utf8(body)
                .map_err(|_| FramelinkerError::bad_request("Invalid request body"))?;
            web::Query::<RegisterForm>::from_query(text)
                .map_err(|_| FramelinkerError::bad_request("Invalid request body"))?
                .into_inner()
        };
        Ok(form.merge(query))
    }

    fn error(err: &FramelinkerError) -> HttpResponse {
        HttpResponse::build(err.http_status()).json(json!({ "error": public_message(err) }))
    }
}

pub fn register_routes() -> Resource {
    web::resource("/register").route(web::post().to(RegisterService::register))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eu_region_flag() {
        let form = RegisterForm {
            eu_region: Some("true".to_string()),
            ..RegisterForm::default()
        };
        assert_eq!(form.into_request().region.as_deref(), Some("eu"));

        let form = RegisterForm {
            region: Some("us".to_string()),
            eu_region: Some("true".to_string()),
            ..RegisterForm::default()
        };
        assert_eq!(form.into_request().region.as_deref(), Some("us"));
    }

    #[test]
    fn test_body_fields_override_query() {
        let body = RegisterForm {
            frame_url: Some("https://a.com".to_string()),
            ..RegisterForm::default()
        };
        let query = RegisterForm {
            frame_url: Some("https://b.com".to_string()),
            api_key: Some("k".to_string()),
            ..RegisterForm::default()
        };
        let merged = body.merge(query);
        assert_eq!(merged.frame_url.as_deref(), Some("https://a.com"));
        assert_eq!(merged.api_key.as_deref(), Some("k"));
    }
}
