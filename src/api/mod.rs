//! HTTP and RPC transports
//!
//! Both transports resolve identity through [`crate::auth::IdentityResolver`]
//! before any owner-scoped storage call.

pub mod constants;
pub mod middleware;
pub mod rpc;
pub mod services;

use actix_web::web;
use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::config::AuthConfig;
use middleware::IdentityGuard;
use services::{health_routes, public_routes, user_routes};

/// Register every HTTP route with its identity guard.
///
/// Order matters: the public scope has an empty prefix and goes last.
pub fn configure(cfg: &mut web::ServiceConfig, resolver: &Arc<IdentityResolver>, auth: &AuthConfig) {
    cfg.configure(health_routes)
        .service(
            web::scope(constants::USER_SCOPE)
                .wrap(IdentityGuard::auth_only(resolver.clone(), auth))
                .configure(user_routes),
        )
        .service(
            web::scope("")
                .wrap(IdentityGuard::sign_in(resolver.clone(), auth))
                .configure(public_routes),
        );
}
