use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::errors::Result;

/// Shared signing secret used when none is configured.
pub const DEFAULT_JWT_SECRET: &str = "linkvault-anonymous-session-secret";

/// Anonymous session lifetime.
pub const TOKEN_LIFETIME_DAYS: i64 = 30;

/// Session claims: one custom claim plus the registered expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId", default)]
    pub user_id: String,
    pub exp: i64,
}

/// JWT Service for generating and validating session tokens (HS256)
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_days: i64,
}

impl JwtService {
    pub fn new(secret: &str, token_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_days,
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(&config.jwt_secret, config.token_days)
    }

    pub fn create_token_string(&self, user_id: &str, expires_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            user_id: user_id.to_string(),
            exp: expires_at.timestamp(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Token for `user_id` expiring after the configured lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String> {
        self.create_token_string(user_id, Utc::now() + Duration::days(self.token_days))
    }

    /// Verify signature and expiry. A bad signature maps to
    /// `SignatureInvalid`, everything else to `InvalidToken`. An empty
    /// user id is returned as-is; callers decide what it means.
    pub fn parse(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LinkVaultError;

    fn create_test_service() -> JwtService {
        JwtService::new("test_secret_key_32_bytes_long!!", TOKEN_LIFETIME_DAYS)
    }

    #[test]
    fn test_create_and_parse_token() {
        let service = create_test_service();
        let token = service
            .create_token_string("user-1", Utc::now() + Duration::hours(1))
            .unwrap();
        let claims = service.parse(&token).unwrap();
        assert_eq!(claims.user_id, "user-1");
    }

    #[test]
    fn test_issue_uses_configured_lifetime() {
        let service = create_test_service();
        let claims = service.parse(&service.issue("u").unwrap()).unwrap();
        let lifetime = claims.exp - Utc::now().timestamp();
        assert!(lifetime > Duration::days(29).num_seconds());
        assert!(lifetime <= Duration::days(30).num_seconds());
    }

    #[test]
    fn test_wrong_secret_is_signature_invalid() {
        let service1 = create_test_service();
        let service2 = JwtService::new("different_secret_key_32_bytes!!", TOKEN_LIFETIME_DAYS);

        let token = service1.issue("u").unwrap();
        assert!(matches!(
            service2.parse(&token),
            Err(LinkVaultError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_malformed_token_is_invalid_token() {
        let service = create_test_service();
        assert!(matches!(
            service.parse("invalid.token.here"),
            Err(LinkVaultError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = create_test_service();
        // 超过默认 leeway
        let token = service
            .create_token_string("u", Utc::now() - Duration::hours(1))
            .unwrap();
        assert!(matches!(
            service.parse(&token),
            Err(LinkVaultError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_claim_wire_name() {
        let claims = Claims {
            user_id: "abc".into(),
            exp: 1,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json, r#"{"userId":"abc","exp":1}"#);
    }
}
