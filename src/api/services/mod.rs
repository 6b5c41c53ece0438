pub mod health;
pub mod helpers;
pub mod redirect;
pub mod shorten;
pub mod types;
pub mod user;

use actix_web::web;

pub use health::HealthService;
pub use redirect::RedirectService;
pub use shorten::ShortenService;
pub use user::UserUrlsService;

/// Routes without identity: liveness and aggregate stats.
///
/// Must be registered before the public scope.
pub fn health_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/ping", web::get().to(HealthService::ping))
        .route("/api/internal/stats", web::get().to(HealthService::stats));
}

/// Owner-scoped routes; mount under the auth-only guard.
pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/urls", web::get().to(UserUrlsService::list_urls))
        .route("/urls", web::delete().to(UserUrlsService::delete_urls));
}

/// Public routes; mount under the sign-in guard.
pub fn public_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::post().to(ShortenService::shorten_text))
        .route("/api/shorten", web::post().to(ShortenService::shorten_json))
        .route(
            "/api/shorten/batch",
            web::post().to(ShortenService::shorten_batch),
        )
        .route("/{id}", web::get().to(RedirectService::handle_redirect));
}
