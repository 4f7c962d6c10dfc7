//! Value Objects

pub mod totp_secret;
pub mod trust_token;
pub mod user_id;

pub use totp_secret::TotpSecret;
pub use trust_token::TrustToken;
pub use user_id::UserId;
