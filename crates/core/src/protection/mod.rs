//! Password protection with a local fallback.
//!
//! The remote protection service is trusted when it answers with a usable
//! result. Any service failure is absorbed: the caller gets a degraded artifact
//! that reuses the original bytes, flagged `degraded = true`.

mod policy;
mod types;

pub use policy::{degraded_name, ProtectionFallback, DEGRADED_SUFFIX};
pub use types::{PasswordPolicy, ProtectionError, ProtectionRequest, ProtectionResult};
