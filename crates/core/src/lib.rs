pub mod artifact;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod orchestrator;
pub mod protection;
pub mod registry;
pub mod scheduler;
pub mod services;
pub mod testing;

pub use artifact::{ArtifactRef, DistributionItem, Location, MessageTemplate, SourceDocument};
pub use auth::{AuthError, Credential, CredentialProvider, SessionCredentials};
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use dispatch::{DispatchConfig, DispatchOutcome, DispatchPipeline, DispatchProgress};
pub use orchestrator::{
    DistributionOrchestrator, JobSnapshot, JobState, JobUpdate, OrchestratorConfig,
    OrchestratorError, OrchestratorServices,
};
pub use protection::{PasswordPolicy, ProtectionFallback, ProtectionRequest, ProtectionResult};
pub use registry::{ArtifactRegistry, MemorySlotStore, RegistryError, SlotStore, SqliteSlotStore};
pub use scheduler::{format_countdown, ScheduleHandle, Scheduler};
pub use services::ServiceError;
