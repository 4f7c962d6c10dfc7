//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, random tokens, Base64)
//! - Password hashing (Argon2id)
//! - Cookie management
//! - Fixed-window rate limiting
//! - Client identification (IP, User-Agent)

pub mod client;
pub mod cookie;
pub mod crypto;
pub mod password;
pub mod rate_limit;
