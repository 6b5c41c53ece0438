//! Anonymous identity resolution shared by the HTTP and RPC adapters.

use tracing::{debug, info};
use uuid::Uuid;

use super::jwt::JwtService;
use crate::errors::{LinkVaultError, Result};

/// The caller's resolved identity for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    /// Set when a new token was minted and must be sent back to the caller.
    pub issued_token: Option<String>,
}

impl Identity {
    pub fn is_new(&self) -> bool {
        self.issued_token.is_some()
    }
}

/// How an endpoint treats callers without a usable token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityMode {
    /// Mint an anonymous identity for unknown callers.
    SignIn,
    /// Reject unknown callers.
    AuthOnly,
}

/// What a transport should answer when resolution fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthenticated,
    Internal,
}

impl IdentityMode {
    pub fn classify(self, err: &LinkVaultError) -> Rejection {
        match self {
            IdentityMode::AuthOnly => Rejection::Unauthenticated,
            IdentityMode::SignIn => match err {
                LinkVaultError::EmptyUserId
                | LinkVaultError::Unauthorized(_)
                | LinkVaultError::SignatureInvalid => Rejection::Unauthenticated,
                _ => Rejection::Internal,
            },
        }
    }
}

pub struct IdentityResolver {
    jwt: JwtService,
}

impl IdentityResolver {
    pub fn new(jwt: JwtService) -> Self {
        Self { jwt }
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    pub fn resolve(&self, mode: IdentityMode, token: Option<&str>) -> Result<Identity> {
        match mode {
            IdentityMode::SignIn => self.sign_in(token),
            IdentityMode::AuthOnly => Ok(Identity {
                user_id: self.authenticate(token)?,
                issued_token: None,
            }),
        }
    }

    /// Reuse a valid identity, or mint a new one when the token is absent
    /// or its signature does not verify.
    pub fn sign_in(&self, token: Option<&str>) -> Result<Identity> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return self.mint();
        };

        match self.jwt.parse(token) {
            Ok(claims) if claims.user_id.is_empty() => Err(LinkVaultError::EmptyUserId),
            Ok(claims) => {
                debug!("Existing session resolved for {}", claims.user_id);
                Ok(Identity {
                    user_id: claims.user_id,
                    issued_token: None,
                })
            }
            Err(LinkVaultError::SignatureInvalid) => {
                info!("Session token signature invalid, issuing a new identity");
                self.mint()
            }
            Err(e) => Err(e),
        }
    }

    /// Accept only a valid token carrying a user id.
    pub fn authenticate(&self, token: Option<&str>) -> Result<String> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LinkVaultError::unauthorized("session token is missing"))?;

        let claims = self.jwt.parse(token)?;
        if claims.user_id.is_empty() {
            return Err(LinkVaultError::EmptyUserId);
        }
        Ok(claims.user_id)
    }

    fn mint(&self) -> Result<Identity> {
        let user_id = Uuid::new_v4().to_string();
        let token = self.jwt.issue(&user_id)?;
        info!("New anonymous identity issued: {}", user_id);
        Ok(Identity {
            user_id,
            issued_token: Some(token),
        })
    }
}
