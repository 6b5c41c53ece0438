use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{error, info, trace};

use crate::api::services::helpers::{error_with_status, session_cookie};
use crate::auth::{IdentityMode, IdentityResolver, Rejection};
use crate::config::AuthConfig;
use crate::errors::LinkVaultError;

/// Resolves the caller's anonymous identity from the session cookie and
/// stores it in request extensions as [`crate::auth::Identity`].
#[derive(Clone)]
pub struct IdentityGuard {
    resolver: Arc<IdentityResolver>,
    cookie_name: Rc<str>,
    token_days: i64,
    mode: IdentityMode,
}

impl IdentityGuard {
    pub fn new(resolver: Arc<IdentityResolver>, auth: &AuthConfig, mode: IdentityMode) -> Self {
        Self {
            resolver,
            cookie_name: Rc::from(auth.cookie_name.as_str()),
            token_days: auth.token_days,
            mode,
        }
    }

    /// Mint a session for unknown callers.
    pub fn sign_in(resolver: Arc<IdentityResolver>, auth: &AuthConfig) -> Self {
        Self::new(resolver, auth, IdentityMode::SignIn)
    }

    /// Reject callers without a valid session.
    pub fn auth_only(resolver: Arc<IdentityResolver>, auth: &AuthConfig) -> Self {
        Self::new(resolver, auth, IdentityMode::AuthOnly)
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityGuardMiddleware {
            service: Rc::new(service),
            guard: self.clone(),
        }))
    }
}

pub struct IdentityGuardMiddleware<S> {
    service: Rc<S>,
    guard: IdentityGuard,
}

impl<S, B> IdentityGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    fn handle_rejection(
        req: ServiceRequest,
        mode: IdentityMode,
        err: &LinkVaultError,
    ) -> ServiceResponse<EitherBody<B>> {
        let status = match mode.classify(err) {
            Rejection::Unauthenticated => {
                info!("Identity rejected ({:?}): {}", mode, err);
                StatusCode::UNAUTHORIZED
            }
            Rejection::Internal => {
                error!("Identity resolution failed: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        req.into_response(error_with_status(status, err).map_into_right_body())
    }
}

impl<S, B> Service<ServiceRequest> for IdentityGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let guard = self.guard.clone();

        Box::pin(async move {
            let token = req.cookie(&guard.cookie_name).map(|c| c.value().to_string());

            let identity = match guard.resolver.resolve(guard.mode, token.as_deref()) {
                Ok(identity) => identity,
                Err(e) => return Ok(Self::handle_rejection(req, guard.mode, &e)),
            };

            trace!("Request identity: {}", identity.user_id);
            let issued = identity.issued_token.clone();
            req.extensions_mut().insert(identity);

            let mut res = srv.call(req).await?;
            if let Some(token) = issued {
                let cookie = session_cookie(&guard.cookie_name, token, guard.token_days);
                if let Err(e) = res.response_mut().add_cookie(&cookie) {
                    // 响应已生成，只记录
                    error!("Failed to attach session cookie: {}", e);
                }
            }
            Ok(res.map_into_left_body())
        })
    }
}

