//! Two-Factor Authentication Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases: login orchestration, enrollment, throttling
//! - `infra/` - PostgreSQL implementations
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Security Model
//! - TOTP (RFC 6238, 30s step, 6 digits, ±1 step skew)
//! - Device trust is a random bearer token; the server stores only its
//!   SHA-256 hash, so a database leak cannot reconstruct trust
//! - Login attempts are throttled per account and per network origin with
//!   fixed windows before credentials are ever checked
//! - Trust-ledger failures fail closed (device treated as untrusted);
//!   second-factor config lookup failures fail open (login proceeds),
//!   favoring availability on infrastructure loss

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::TwoFactorConfig;
pub use error::{TwoFactorError, TwoFactorResult};
pub use infra::postgres::PgTwoFactorRepository;
pub use presentation::router::two_factor_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod handlers {
    pub use crate::presentation::handlers::*;
}

pub mod store {
    pub use crate::infra::postgres::PgTwoFactorRepository as TwoFactorStore;
}

pub mod router {
    pub use crate::presentation::router::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}

#[cfg(test)]
mod tests;
