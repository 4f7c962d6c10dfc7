//! Entities

pub mod second_factor;
pub mod trusted_device;

pub use second_factor::SecondFactorConfig;
pub use trusted_device::TrustedDevice;
