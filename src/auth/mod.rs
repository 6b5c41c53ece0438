//! Anonymous session identity
//!
//! `JwtService` signs and verifies tokens; `IdentityResolver` turns an
//! optional token into an [`Identity`] for both transports.

pub mod identity;
pub mod jwt;

pub use identity::{Identity, IdentityMode, IdentityResolver, Rejection};
pub use jwt::{Claims, DEFAULT_JWT_SECRET, JwtService, TOKEN_LIFETIME_DAYS};
