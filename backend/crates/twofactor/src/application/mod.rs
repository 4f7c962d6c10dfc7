//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod disable;
pub mod enroll;
pub mod ledger;
pub mod login;
pub mod throttle;
pub mod verify_login;

// Re-exports
pub use config::TwoFactorConfig;
pub use disable::DisableUseCase;
pub use enroll::{EnrollSetupOutput, EnrollUseCase};
pub use ledger::DeviceTrustLedger;
pub use login::{LoginInput, LoginOutcome, LoginUseCase};
pub use throttle::{LoginThrottle, ThrottleDecision};
pub use verify_login::VerifyLoginUseCase;
