use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{debug, error};

use super::helpers::{error_response, missing_identity};
use super::types::{BatchRequestItem, BatchResponseItem, ShortenRequest, ShortenResponse};
use crate::api::constants;
use crate::auth::Identity;
use crate::errors::LinkVaultError;
use crate::services::{BatchItem, LinkService};
use crate::storage::UrlRecord;

pub struct ShortenService;

impl ShortenService {
    /// `POST /` with the URL as plain text body.
    pub async fn shorten_text(
        identity: Option<web::ReqData<Identity>>,
        body: String,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let Some(identity) = identity else {
            return missing_identity();
        };
        let ctx = link_service.request_context(Some(&identity.user_id));

        match link_service.shorten(&ctx, &identity.user_id, &body).await {
            Ok(record) => Self::text(HttpResponse::Created(), &link_service, &record),
            Err(LinkVaultError::Conflict(existing)) => {
                debug!("URL already shortened: {}", existing.full);
                Self::text(HttpResponse::Conflict(), &link_service, &existing)
            }
            Err(e) => Self::failure(&e),
        }
    }

    /// `POST /api/shorten` with `{"url": ...}`.
    pub async fn shorten_json(
        identity: Option<web::ReqData<Identity>>,
        payload: web::Json<ShortenRequest>,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let Some(identity) = identity else {
            return missing_identity();
        };
        let ctx = link_service.request_context(Some(&identity.user_id));

        match link_service
            .shorten(&ctx, &identity.user_id, &payload.url)
            .await
        {
            Ok(record) => HttpResponse::Created().json(ShortenResponse {
                result: link_service.short_url(&record.short),
            }),
            Err(LinkVaultError::Conflict(existing)) => {
                HttpResponse::Conflict().json(ShortenResponse {
                    result: link_service.short_url(&existing.short),
                })
            }
            Err(e) => Self::failure(&e),
        }
    }

    /// `POST /api/shorten/batch`. Response items follow request order.
    pub async fn shorten_batch(
        identity: Option<web::ReqData<Identity>>,
        payload: web::Json<Vec<BatchRequestItem>>,
        link_service: web::Data<Arc<LinkService>>,
    ) -> impl Responder {
        let Some(identity) = identity else {
            return missing_identity();
        };
        let ctx = link_service.request_context(Some(&identity.user_id));

        let items = payload.into_inner();
        let order: Vec<String> = items.iter().map(|i| i.correlation_id.clone()).collect();
        let batch = items
            .into_iter()
            .map(|i| BatchItem {
                correlation_id: i.correlation_id,
                original_url: i.original_url,
            })
            .collect();

        match link_service
            .shorten_batch(&ctx, &identity.user_id, batch)
            .await
        {
            Ok(result) => {
                let body: Vec<BatchResponseItem> = order
                    .into_iter()
                    .filter_map(|id| {
                        let short = result.get(&id)?.short.clone();
                        Some(BatchResponseItem {
                            correlation_id: id,
                            short_url: link_service.short_url(&short),
                        })
                    })
                    .collect();
                HttpResponse::Created().json(body)
            }
            Err(e) => Self::failure(&e),
        }
    }

    fn text(
        mut builder: actix_web::HttpResponseBuilder,
        link_service: &LinkService,
        record: &UrlRecord,
    ) -> HttpResponse {
        builder
            .insert_header(("Content-Type", constants::TEXT_CONTENT_TYPE))
            .body(link_service.short_url(&record.short))
    }

    fn failure(err: &LinkVaultError) -> HttpResponse {
        match err {
            LinkVaultError::Validation(_) => debug!("Rejected shorten request: {}", err),
            _ => error!("Shorten failed: {}", err),
        }
        error_response(err)
    }
}
