pub mod identity;

pub use identity::IdentityGuard;
