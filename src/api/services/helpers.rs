//! HTTP 帮助函数

use actix_web::HttpResponse;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::http::StatusCode;
use serde::Serialize;

use crate::api::constants;
use crate::errors::LinkVaultError;

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub code: &'static str,
    pub error: &'static str,
    pub message: &'a str,
}

/// HTTP status for a core error.
///
/// `InvalidToken` maps to 500 here; the auth-only middleware answers 401
/// for every rejection on its own.
pub fn status_for(err: &LinkVaultError) -> StatusCode {
    match err {
        LinkVaultError::Conflict(_) => StatusCode::CONFLICT,
        LinkVaultError::EmptyUserId
        | LinkVaultError::Unauthorized(_)
        | LinkVaultError::SignatureInvalid => StatusCode::UNAUTHORIZED,
        LinkVaultError::Validation(_) => StatusCode::BAD_REQUEST,
        LinkVaultError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
        LinkVaultError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
        LinkVaultError::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_with_status(status: StatusCode, err: &LinkVaultError) -> HttpResponse {
    HttpResponse::build(status)
        .insert_header(("Content-Type", constants::JSON_CONTENT_TYPE))
        .json(ErrorBody {
            code: err.code(),
            error: err.error_type(),
            message: err.message(),
        })
}

/// 从 LinkVaultError 构建错误响应
pub fn error_response(err: &LinkVaultError) -> HttpResponse {
    error_with_status(status_for(err), err)
}

/// 401 for handlers reached without an identity on the request.
pub fn missing_identity() -> HttpResponse {
    error_with_status(
        StatusCode::UNAUTHORIZED,
        &LinkVaultError::unauthorized("no identity on request"),
    )
}

/// Cookie carrying a freshly issued session token.
pub fn session_cookie(name: &str, token: String, days: i64) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_string(), token);
    cookie.set_path(constants::SESSION_COOKIE_PATH);
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(actix_web::cookie::time::Duration::days(days));
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UrlRecord;

    #[test]
    fn test_status_mapping() {
        let conflict = LinkVaultError::conflict(UrlRecord::new("u", "http://a.com", "k"));
        assert_eq!(status_for(&conflict), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&LinkVaultError::EmptyUserId),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_for(&LinkVaultError::invalid_token("expired")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&LinkVaultError::unsupported("delete")),
            StatusCode::NOT_IMPLEMENTED
        );
        assert_eq!(
            status_for(&LinkVaultError::DeadlineExceeded),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("token", "abc".into(), 30);
        assert_eq!(cookie.name(), "token");
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(
            cookie.max_age(),
            Some(actix_web::cookie::time::Duration::days(30))
        );
    }
}
