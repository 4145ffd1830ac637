//! Fallback policy around the remote protection service.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::artifact::{ArtifactRef, Location, SourceDocument};
use crate::auth::CredentialProvider;
use crate::metrics;
use crate::services::{Protector, ServiceError};

use super::types::{PasswordPolicy, ProtectionError, ProtectionRequest, ProtectionResult};

/// Suffix given to locally produced (unprotected) artifacts.
pub const DEGRADED_SUFFIX: &str = "-protected.pdf";

/// Name of the degraded artifact for `source_name`: a trailing `.pdf` is
/// dropped and [`DEGRADED_SUFFIX`] appended.
pub fn degraded_name(source_name: &str) -> String {
    let lower = source_name.to_ascii_lowercase();
    let stem = if lower.ends_with(".pdf") {
        &source_name[..source_name.len() - 4]
    } else {
        source_name
    };
    format!("{}{}", stem, DEGRADED_SUFFIX)
}

/// Decides per request whether to trust the remote result or degrade.
pub struct ProtectionFallback {
    protector: Arc<dyn Protector>,
    credentials: Arc<dyn CredentialProvider>,
    call_timeout: Duration,
}

impl ProtectionFallback {
    pub fn new(
        protector: Arc<dyn Protector>,
        credentials: Arc<dyn CredentialProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            protector,
            credentials,
            call_timeout,
        }
    }

    /// Protect one document.
    ///
    /// Only input validation and a missing credential are errors; every
    /// service failure yields a degraded result instead.
    pub async fn protect(
        &self,
        request: ProtectionRequest,
    ) -> Result<ProtectionResult, ProtectionError> {
        let source = match request.source {
            Some(source) if !source.is_empty() => source,
            Some(source) => {
                return Err(ProtectionError::InvalidInput(format!(
                    "source document '{}' is empty",
                    source.name
                )))
            }
            None => {
                return Err(ProtectionError::InvalidInput(
                    "no source document".to_string(),
                ))
            }
        };

        if let PasswordPolicy::Fixed(secret) = &request.policy {
            if secret.is_empty() {
                return Err(ProtectionError::InvalidInput(
                    "custom password is empty".to_string(),
                ));
            }
        }

        let credential = self
            .credentials
            .current_credential()
            .await
            .map_err(|_| ProtectionError::NotAuthenticated)?;

        debug!(
            "Protecting {} via {} ({:?})",
            source.name,
            self.protector.name(),
            request.policy
        );

        let outcome = match tokio::time::timeout(
            self.call_timeout,
            self.protector.protect(&source, &request.policy, &credential),
        )
        .await
        {
            Ok(Ok(artifacts)) if artifacts.is_empty() => Err(ServiceError::Malformed(
                "protection service returned no artifacts".to_string(),
            )),
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout),
        };

        match outcome {
            Ok(artifacts) => {
                info!(
                    "Protection service secured {} artifact(s) from {}",
                    artifacts.len(),
                    source.name
                );
                metrics::PROTECTION_RESULTS
                    .with_label_values(&["remote"])
                    .inc();
                Ok(ProtectionResult {
                    artifacts,
                    degraded: false,
                    degradation_reason: None,
                })
            }
            Err(e) => {
                warn!(
                    "Protection service unavailable for {}, using unprotected local copy: {}",
                    source.name, e
                );
                metrics::PROTECTION_RESULTS
                    .with_label_values(&["degraded"])
                    .inc();
                Ok(Self::degrade(source, &e))
            }
        }
    }

    fn degrade(source: SourceDocument, cause: &ServiceError) -> ProtectionResult {
        let artifact =
            ArtifactRef::new(degraded_name(&source.name), Location::Inline(source.bytes));
        ProtectionResult {
            artifacts: vec![artifact],
            degraded: true,
            degradation_reason: Some(cause.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionCredentials;
    use crate::testing::MockProtector;

    fn fallback(protector: Arc<MockProtector>) -> ProtectionFallback {
        ProtectionFallback::new(
            protector,
            Arc::new(SessionCredentials::with_token("token")),
            Duration::from_secs(5),
        )
    }

    fn source() -> SourceDocument {
        SourceDocument::new("fiches.pdf", b"%PDF-1.7 payload".to_vec())
    }

    #[test]
    fn test_degraded_name() {
        assert_eq!(degraded_name("fiches.pdf"), "fiches-protected.pdf");
        assert_eq!(degraded_name("FICHES.PDF"), "FICHES-protected.pdf");
        assert_eq!(degraded_name("notes"), "notes-protected.pdf");
    }

    #[tokio::test]
    async fn test_remote_success_is_not_degraded() {
        let protector = Arc::new(MockProtector::new());
        let remote = vec![
            ArtifactRef::new("EMP001.pdf", Location::Url("http://h/p/EMP001.pdf".into())),
            ArtifactRef::new("EMP002.pdf", Location::Url("http://h/p/EMP002.pdf".into())),
        ];
        protector.set_artifacts(remote.clone()).await;

        let result = fallback(Arc::clone(&protector))
            .protect(ProtectionRequest::new(source(), PasswordPolicy::MatriculeDerived))
            .await
            .unwrap();

        assert!(!result.degraded);
        assert_eq!(result.artifacts, remote);
        assert_eq!(protector.call_count().await, 1);
    }

    #[tokio::test]
    async fn test_remote_failure_degrades_with_original_bytes() {
        let protector = Arc::new(MockProtector::new());
        protector
            .set_next_error(ServiceError::NotFound("/api/protect".into()))
            .await;

        let result = fallback(protector)
            .protect(ProtectionRequest::new(source(), PasswordPolicy::MatriculeDerived))
            .await
            .unwrap();

        assert!(result.degraded);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].id, "fiches-protected.pdf");
        assert_eq!(
            result.artifacts[0].location,
            Location::Inline(b"%PDF-1.7 payload".to_vec())
        );
        assert!(result.degradation_reason.unwrap().contains("/api/protect"));
    }

    #[tokio::test]
    async fn test_empty_remote_result_degrades() {
        let protector = Arc::new(MockProtector::new());
        protector.set_artifacts(vec![]).await;

        let result = fallback(protector)
            .protect(ProtectionRequest::new(source(), PasswordPolicy::MatriculeDerived))
            .await
            .unwrap();

        assert!(result.degraded);
        assert!(!result.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_slow_service_degrades() {
        let protector = Arc::new(MockProtector::new());
        protector.set_latency(Duration::from_millis(200)).await;

        let fallback = ProtectionFallback::new(
            protector,
            Arc::new(SessionCredentials::with_token("token")),
            Duration::from_millis(20),
        );
        let result = fallback
            .protect(ProtectionRequest::new(source(), PasswordPolicy::MatriculeDerived))
            .await
            .unwrap();

        assert!(result.degraded);
        assert_eq!(result.degradation_reason.as_deref(), Some("Request timed out"));
    }

    #[tokio::test]
    async fn test_missing_source_short_circuits() {
        let protector = Arc::new(MockProtector::new());
        let request = ProtectionRequest {
            source: None,
            policy: PasswordPolicy::MatriculeDerived,
        };

        let result = fallback(Arc::clone(&protector)).protect(request).await;

        assert!(matches!(result, Err(ProtectionError::InvalidInput(_))));
        assert_eq!(protector.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_source_short_circuits() {
        let protector = Arc::new(MockProtector::new());
        let request = ProtectionRequest::new(
            SourceDocument::new("vide.pdf", vec![]),
            PasswordPolicy::MatriculeDerived,
        );

        let result = fallback(Arc::clone(&protector)).protect(request).await;

        assert!(matches!(result, Err(ProtectionError::InvalidInput(_))));
        assert_eq!(protector.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_fixed_password_rejected() {
        let protector = Arc::new(MockProtector::new());
        let request = ProtectionRequest::new(source(), PasswordPolicy::Fixed(String::new()));

        let result = fallback(Arc::clone(&protector)).protect(request).await;

        assert!(matches!(result, Err(ProtectionError::InvalidInput(_))));
        assert_eq!(protector.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_missing_credential_rejected_before_call() {
        let protector = Arc::new(MockProtector::new());
        let fallback = ProtectionFallback::new(
            Arc::clone(&protector) as Arc<dyn Protector>,
            Arc::new(SessionCredentials::new()),
            Duration::from_secs(1),
        );

        let result = fallback
            .protect(ProtectionRequest::new(source(), PasswordPolicy::MatriculeDerived))
            .await;

        assert!(matches!(result, Err(ProtectionError::NotAuthenticated)));
        assert_eq!(protector.call_count().await, 0);
    }
}
