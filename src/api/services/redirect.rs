use actix_web::http::header::{self, HeaderValue};
use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

use super::helpers::error_response;
use crate::api::constants;
use crate::services::LinkService;
use crate::utils::is_valid_short_code;

pub struct RedirectService;

impl RedirectService {
    pub async fn handle_redirect(
        path: web::Path<String>,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let key = path.into_inner();

        if !is_valid_short_code(&key) {
            // 非法短码，直接 404
            trace!("Invalid short code rejected: {}", key);
            return Self::not_found_response();
        }

        let ctx = link_service.request_context(None);
        match link_service.resolve(&ctx, &key).await {
            Ok(Some(record)) if record.deleted => {
                debug!("Redirect to deleted link: {}", key);
                HttpResponse::Gone()
                    .insert_header(("Content-Type", constants::TEXT_CONTENT_TYPE))
                    .body("Gone")
            }
            Ok(Some(record)) => match HeaderValue::from_str(&record.full) {
                Ok(location) => HttpResponse::TemporaryRedirect()
                    .insert_header((header::LOCATION, location))
                    .finish(),
                Err(_) => {
                    // 存储中的地址无法作为 Location 头
                    warn!("Stored URL for {} is not a valid Location header", key);
                    Self::not_found_response()
                }
            },
            Ok(None) => {
                debug!("Redirect link not found: {}", key);
                Self::not_found_response()
            }
            Err(e) => {
                error!("Redirect lookup failed for {}: {}", key, e);
                error_response(&e)
            }
        }
    }

    fn not_found_response() -> HttpResponse {
        HttpResponse::NotFound()
            .insert_header(("Content-Type", constants::TEXT_CONTENT_TYPE))
            .body("Not Found")
    }
}
