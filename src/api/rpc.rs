//! RPC identity adapter
//!
//! A tonic interceptor that reads the session token from request metadata
//! and resolves it with the same [`IdentityResolver`] the HTTP middleware
//! uses.

use std::sync::Arc;

use tonic::metadata::{AsciiMetadataKey, MetadataValue};
use tonic::service::Interceptor;
use tonic::{Request, Response, Status};
use tracing::{error, info, trace};

use crate::auth::{Identity, IdentityMode, IdentityResolver, Rejection};
use crate::config::AuthConfig;
use crate::errors::{LinkVaultError, Result};

#[derive(Clone)]
pub struct IdentityInterceptor {
    resolver: Arc<IdentityResolver>,
    metadata_key: AsciiMetadataKey,
    mode: IdentityMode,
}

impl IdentityInterceptor {
    pub fn new(resolver: Arc<IdentityResolver>, auth: &AuthConfig, mode: IdentityMode) -> Result<Self> {
        let metadata_key = AsciiMetadataKey::from_bytes(auth.metadata_key.as_bytes()).map_err(|e| {
            LinkVaultError::config(format!(
                "Invalid auth.metadata_key '{}': {}",
                auth.metadata_key, e
            ))
        })?;
        Ok(Self {
            resolver,
            metadata_key,
            mode,
        })
    }

    pub fn mode(&self) -> IdentityMode {
        self.mode
    }

    /// Copy a freshly issued token into the response metadata.
    pub fn attach_issued_token<T>(
        &self,
        identity: &Identity,
        response: &mut Response<T>,
    ) -> std::result::Result<(), Status> {
        let Some(token) = identity.issued_token.as_deref() else {
            return Ok(());
        };
        let value = MetadataValue::try_from(token).map_err(|e| {
            error!("Issued token is not valid metadata: {}", e);
            Status::internal("failed to attach session token")
        })?;
        response
            .metadata_mut()
            .insert(self.metadata_key.clone(), value);
        Ok(())
    }
}

impl Interceptor for IdentityInterceptor {
    fn call(&mut self, mut request: Request<()>) -> std::result::Result<Request<()>, Status> {
        let token = request
            .metadata()
            .get(&self.metadata_key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match self.resolver.resolve(self.mode, token.as_deref()) {
            Ok(identity) => {
                trace!("RPC identity: {}", identity.user_id);
                request.extensions_mut().insert(identity);
                Ok(request)
            }
            Err(e) => Err(match self.mode.classify(&e) {
                Rejection::Unauthenticated => {
                    info!("RPC identity rejected ({:?}): {}", self.mode, e);
                    Status::unauthenticated(e.message())
                }
                Rejection::Internal => {
                    error!("RPC identity resolution failed: {}", e);
                    Status::internal("identity resolution failed")
                }
            }),
        }
    }
}

/// Identity placed on the request by [`IdentityInterceptor`].
pub fn identity_of<T>(request: &Request<T>) -> std::result::Result<&Identity, Status> {
    request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| Status::unauthenticated("no identity on request"))
}

/// Convert a core error to an RPC status.
pub fn status_from_error(err: &LinkVaultError) -> Status {
    match err {
        LinkVaultError::Conflict(_) => Status::unknown("conflict"),
        LinkVaultError::EmptyUserId
        | LinkVaultError::Unauthorized(_)
        | LinkVaultError::SignatureInvalid => Status::unauthenticated(err.message()),
        LinkVaultError::Validation(msg) => Status::invalid_argument(msg.clone()),
        LinkVaultError::Unsupported(msg) => Status::unimplemented(msg.clone()),
        LinkVaultError::Cancelled => Status::cancelled(err.message()),
        LinkVaultError::DeadlineExceeded => Status::deadline_exceeded(err.message()),
        _ => Status::internal(err.to_string()),
    }
}
