//! Types for the protection module.

use std::fmt;

use thiserror::Error;

use crate::artifact::{ArtifactRef, SourceDocument};

/// How the password of each protected artifact is chosen.
#[derive(Clone, PartialEq, Eq)]
pub enum PasswordPolicy {
    /// The password is the recipient identifier (matricule).
    MatriculeDerived,
    /// The same custom secret for every artifact.
    Fixed(String),
}

impl PasswordPolicy {
    pub fn uses_matricule(&self) -> bool {
        matches!(self, Self::MatriculeDerived)
    }
}

impl fmt::Debug for PasswordPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MatriculeDerived => f.write_str("MatriculeDerived"),
            Self::Fixed(_) => f.write_str("Fixed(***)"),
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self::MatriculeDerived
    }
}

/// A request to protect one source document.
#[derive(Debug, Clone)]
pub struct ProtectionRequest {
    pub source: Option<SourceDocument>,
    pub policy: PasswordPolicy,
}

impl ProtectionRequest {
    pub fn new(source: SourceDocument, policy: PasswordPolicy) -> Self {
        Self {
            source: Some(source),
            policy,
        }
    }
}

/// Outcome of a protection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtectionResult {
    pub artifacts: Vec<ArtifactRef>,
    /// `true` when produced locally because the service was unusable.
    pub degraded: bool,
    /// Why the fallback engaged, when it did.
    pub degradation_reason: Option<String>,
}

/// Rejections raised before the protection service is contacted.
#[derive(Debug, Error)]
pub enum ProtectionError {
    #[error("Invalid protection request: {0}")]
    InvalidInput(String),

    #[error("Authentication required")]
    NotAuthenticated,
}
