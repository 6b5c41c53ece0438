use actix_web::{HttpResponse, Responder, web};
use std::sync::Arc;
use tracing::{error, trace};

use super::helpers::error_response;
use super::types::StatsResponse;
use crate::services::LinkService;

/// Health Service
///
/// 注意：ping 的任何失败都返回 500。
pub struct HealthService;

impl HealthService {
    pub async fn ping(link_service: web::Data<Arc<LinkService>>) -> impl Responder {
        let ctx = link_service.request_context(None);
        match link_service.ping(&ctx).await {
            Ok(()) => {
                trace!("Storage ping succeeded");
                HttpResponse::Ok().finish()
            }
            Err(e) => {
                error!("Storage ping failed: {}", e);
                HttpResponse::InternalServerError().finish()
            }
        }
    }

    pub async fn stats(link_service: web::Data<Arc<LinkService>>) -> impl Responder {
        let ctx = link_service.request_context(None);
        match link_service.stats(&ctx).await {
            Ok(stats) => HttpResponse::Ok().json(StatsResponse::from(stats)),
            Err(e) => {
                error!("Stats query failed: {}", e);
                error_response(&e)
            }
        }
    }
}
