use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{error, info};

use super::helpers::{error_response, missing_identity};
use super::types::UserUrlItem;
use crate::auth::Identity;
use crate::errors::LinkVaultError;
use crate::services::LinkService;

/// Owner-scoped endpoints under `/api/user`.
pub struct UserUrlsService;

impl UserUrlsService {
    pub async fn list_urls(
        identity: Option<web::ReqData<Identity>>,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let Some(identity) = identity else {
            return missing_identity();
        };
        let ctx = link_service.request_context(Some(&identity.user_id));

        match link_service.user_urls(&ctx, &identity.user_id).await {
            Ok(urls) if urls.is_empty() => HttpResponse::NoContent().finish(),
            Ok(urls) => {
                let body: Vec<UserUrlItem> = urls
                    .into_iter()
                    .map(|u| UserUrlItem {
                        short_url: link_service.short_url(&u.short),
                        original_url: u.full,
                    })
                    .collect();
                HttpResponse::Ok().json(body)
            }
            Err(e) => {
                error!("Listing links for {} failed: {}", identity.user_id, e);
                error_response(&e)
            }
        }
    }

    /// Accepts a JSON array of short keys and deletes them in the background.
    pub async fn delete_urls(
        identity: Option<web::ReqData<Identity>>,
        payload: web::Json<Vec<String>>,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let Some(identity) = identity else {
            return missing_identity();
        };

        let shorts = payload.into_inner();
        let count = shorts.len();
        match link_service.delete_urls(&identity.user_id, shorts) {
            Ok(_task) => {
                info!("Scheduled deletion of {} keys for {}", count, identity.user_id);
                HttpResponse::Accepted().finish()
            }
            Err(e @ LinkVaultError::Unsupported(_)) => {
                info!("Deletion requested on a backend without support");
                error_response(&e)
            }
            Err(e) => {
                error!("Scheduling deletion failed: {}", e);
                error_response(&e)
            }
        }
    }
}
