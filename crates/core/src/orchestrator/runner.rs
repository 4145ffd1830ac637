//! Distribution orchestrator implementation.
//!
//! Owns the single job state cell and drives it through:
//! - `Idle`/terminal → `Processing` → `Completed` | `PartiallyFailed` (send now)
//! - `Idle`/terminal → `Scheduled` → `Processing` → terminal (scheduled send)
//! - `Scheduled` → `Cancelled`
//!
//! Every transition happens under the job lock, so a fire racing a cancel
//! resolves to exactly one of them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifact::{ArtifactRef, DistributionItem, MessageTemplate, SourceDocument};
use crate::auth::CredentialProvider;
use crate::config::Config;
use crate::dispatch::{
    DispatchError, DispatchOutcome, DispatchPipeline, DispatchProgress, FailureReason, ItemFailure,
};
use crate::metrics;
use crate::protection::{ProtectionFallback, ProtectionRequest, ProtectionResult};
use crate::registry::{
    ArtifactRegistry, RegistryError, SlotStore, SqliteSlotStore, PROTECTED_SLOT, SCHEDULE_SLOT,
    SPLIT_SLOT,
};
use crate::scheduler::{FireCallback, ScheduleHandle, Scheduler};
use crate::services::{
    ConsoleClient, Dispatcher, Fetcher, HttpFetcher, Protector, ServiceError, Splitter,
};

use super::config::OrchestratorConfig;
use super::types::{JobSnapshot, JobState, JobUpdate, OrchestratorError, ScheduledJob};

/// Remote collaborators and storage the orchestrator is wired to.
pub struct OrchestratorServices {
    pub splitter: Arc<dyn Splitter>,
    pub protector: Arc<dyn Protector>,
    pub dispatcher: Arc<dyn Dispatcher>,
    pub fetcher: Arc<dyn Fetcher>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub store: Arc<dyn SlotStore>,
}

/// The job state cell.
///
/// `pending` holds the armed job and is set exactly while the state is `Scheduled`.
#[derive(Default)]
struct JobCell {
    snapshot: JobSnapshot,
    handle: Option<ScheduleHandle>,
    pending: Option<ScheduledJob>,
}

/// Drives distribution jobs and owns the artifact registries.
///
/// Cloning is cheap; clones share the same job and registries.
#[derive(Clone)]
pub struct DistributionOrchestrator {
    config: OrchestratorConfig,
    pipeline: Arc<DispatchPipeline>,
    protection: Arc<ProtectionFallback>,
    scheduler: Scheduler,
    splitter: Arc<dyn Splitter>,
    credentials: Arc<dyn CredentialProvider>,
    store: Arc<dyn SlotStore>,
    split_registry: Arc<ArtifactRegistry>,
    protected_registry: Arc<ArtifactRegistry>,
    job: Arc<Mutex<JobCell>>,
    updates: broadcast::Sender<JobUpdate>,
}

impl DistributionOrchestrator {
    /// Create a new orchestrator. Registries are loaded from `services.store`.
    pub fn new(config: OrchestratorConfig, services: OrchestratorServices) -> Self {
        let call_timeout = config.dispatch.call_timeout();
        let pipeline = DispatchPipeline::new(
            config.dispatch.clone(),
            services.fetcher,
            services.dispatcher,
            Arc::clone(&services.credentials),
        );
        let protection = ProtectionFallback::new(
            services.protector,
            Arc::clone(&services.credentials),
            call_timeout,
        );
        let (updates, _) = broadcast::channel(config.update_capacity.max(1));

        Self {
            scheduler: Scheduler::new(config.scheduler.clone()),
            pipeline: Arc::new(pipeline),
            protection: Arc::new(protection),
            splitter: services.splitter,
            credentials: services.credentials,
            split_registry: Arc::new(ArtifactRegistry::open(
                Arc::clone(&services.store),
                SPLIT_SLOT,
            )),
            protected_registry: Arc::new(ArtifactRegistry::open(
                Arc::clone(&services.store),
                PROTECTED_SLOT,
            )),
            store: services.store,
            job: Arc::new(Mutex::new(JobCell::default())),
            updates,
            config,
        }
    }

    /// Wire the orchestrator to the console backend and the SQLite slot store.
    pub fn from_config(
        config: &Config,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, OrchestratorError> {
        let client = Arc::new(ConsoleClient::new(&config.services)?);
        let fetcher = Arc::new(HttpFetcher::new(config.dispatch.call_timeout())?);
        let store = Arc::new(SqliteSlotStore::new(&config.storage.path)?);

        Ok(Self::new(
            OrchestratorConfig::from(config),
            OrchestratorServices {
                splitter: client.clone(),
                protector: client.clone(),
                dispatcher: client,
                fetcher,
                credentials,
                store,
            },
        ))
    }

    // =========================================================================
    // Job lifecycle
    // =========================================================================

    /// Dispatch `items` immediately and wait for the batch to finish.
    ///
    /// Returns the final snapshot (Completed or PartiallyFailed).
    pub async fn submit_now(
        &self,
        items: Vec<DistributionItem>,
        template: MessageTemplate,
    ) -> Result<JobSnapshot, OrchestratorError> {
        let job_id = {
            let mut cell = self.job.lock().await;
            self.check_new_job(&cell, "submit")?;
            self.check_items(&items)?;
            self.check_credential().await?;

            let job_id = Uuid::new_v4().to_string();
            cell.handle = None;
            cell.pending = None;
            cell.snapshot = JobSnapshot {
                job_id: Some(job_id.clone()),
                state: cell.snapshot.state,
                total: items.len(),
                ..Default::default()
            };
            self.transition(&mut cell, JobState::Processing);
            job_id
        };

        // The batch runs in its own task so it settles even if this caller goes away.
        let this = self.clone();
        let job = tokio::spawn(async move { this.run_job(&job_id, &items, &template).await });
        match job.await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                error!("Dispatch task failed: {}", e);
                Ok(self.status().await)
            }
        }
    }

    /// Arm a job to be dispatched at `at`.
    pub async fn schedule(
        &self,
        items: Vec<DistributionItem>,
        template: MessageTemplate,
        at: DateTime<Utc>,
    ) -> Result<JobSnapshot, OrchestratorError> {
        let mut cell = self.job.lock().await;
        self.check_new_job(&cell, "schedule")?;
        self.check_items(&items)?;
        if at <= Utc::now() {
            return Err(OrchestratorError::InputInvalid(format!(
                "scheduled instant {} is not in the future",
                at.to_rfc3339()
            )));
        }
        self.check_credential().await?;

        let job = ScheduledJob {
            job_id: Uuid::new_v4().to_string(),
            items,
            template,
            scheduled_at: at,
        };
        self.persist_schedule(&job)?;

        let handle = match self.scheduler.arm(at, self.fire_callback(job.job_id.clone())) {
            Ok(handle) => handle,
            Err(e) => {
                self.forget_schedule();
                return Err(e.into());
            }
        };

        self.enter_scheduled(&mut cell, job, Some(handle));
        Ok(cell.snapshot.clone())
    }

    /// Cancel the scheduled job; no item of it will ever be dispatched.
    pub async fn cancel_schedule(&self) -> Result<JobSnapshot, OrchestratorError> {
        let mut cell = self.job.lock().await;
        if cell.snapshot.state != JobState::Scheduled {
            return Err(OrchestratorError::InvalidStateTransition {
                operation: "cancel schedule",
                state: cell.snapshot.state,
            });
        }

        // The state check in `fire` discards a callback that already started.
        if let Some(handle) = cell.handle.take() {
            handle.cancel();
        }
        cell.pending = None;
        self.forget_schedule();
        self.transition(&mut cell, JobState::Cancelled);
        Ok(cell.snapshot.clone())
    }

    /// Restore a job persisted before the last shutdown.
    ///
    /// A job whose instant is still ahead is re-armed; one whose instant
    /// elapsed while the process was down is dispatched right away in the
    /// background. Returns the snapshot right after recovery, if a job was found.
    pub async fn recover(&self) -> Result<Option<JobSnapshot>, OrchestratorError> {
        let raw = match self.store.load(SCHEDULE_SLOT)? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let job: ScheduledJob = match serde_json::from_str(&raw) {
            Ok(job) => job,
            Err(e) => {
                warn!("Discarding unreadable scheduled job: {}", e);
                self.forget_schedule();
                return Ok(None);
            }
        };

        let mut cell = self.job.lock().await;
        self.check_new_job(&cell, "recover")?;

        if job.scheduled_at > Utc::now() {
            info!(
                "Re-arming job {} for {}",
                job.job_id,
                job.scheduled_at.to_rfc3339()
            );
            let handle = self
                .scheduler
                .arm(job.scheduled_at, self.fire_callback(job.job_id.clone()))?;
            self.enter_scheduled(&mut cell, job, Some(handle));
        } else {
            info!(
                "Job {} was due at {} while stopped, dispatching now",
                job.job_id,
                job.scheduled_at.to_rfc3339()
            );
            let job_id = job.job_id.clone();
            self.enter_scheduled(&mut cell, job, None);
            let this = self.clone();
            tokio::spawn(async move { this.fire(job_id).await });
        }

        Ok(Some(cell.snapshot.clone()))
    }

    /// Current job snapshot.
    pub async fn status(&self) -> JobSnapshot {
        self.job.lock().await.snapshot.clone()
    }

    /// Time left before the scheduled job fires, if one is armed.
    pub async fn remaining(&self) -> Option<Duration> {
        let cell = self.job.lock().await;
        match (&cell.snapshot.state, &cell.handle) {
            (JobState::Scheduled, Some(handle)) => Some(handle.remaining()),
            _ => None,
        }
    }

    /// Countdown channel of the scheduled job, if one is armed.
    pub async fn countdown(&self) -> Option<watch::Receiver<Duration>> {
        let cell = self.job.lock().await;
        match (&cell.snapshot.state, &cell.handle) {
            (JobState::Scheduled, Some(handle)) => Some(handle.countdown()),
            _ => None,
        }
    }

    /// Subscribe to job state changes and progress.
    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.updates.subscribe()
    }

    // =========================================================================
    // Artifacts
    // =========================================================================

    /// Split a combined document and replace the split registry with the result.
    pub async fn split_document(
        &self,
        source: SourceDocument,
    ) -> Result<Vec<ArtifactRef>, OrchestratorError> {
        if source.is_empty() {
            return Err(OrchestratorError::InputInvalid(format!(
                "source document '{}' is empty",
                source.name
            )));
        }
        let credential = self.check_credential().await?;

        let timeout = self.config.dispatch.call_timeout();
        let artifacts = match tokio::time::timeout(
            timeout,
            self.splitter.split(&source, &credential),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(ServiceError::Timeout.into()),
        };

        info!(
            "Split '{}' into {} artifact(s) via {}",
            source.name,
            artifacts.len(),
            self.splitter.name()
        );
        self.split_registry.put(artifacts)?;
        Ok(self.split_registry.get())
    }

    /// Protect a document and replace the protected registry with the result.
    ///
    /// The returned `degraded` flag tells whether the local fallback was used.
    pub async fn protect(
        &self,
        request: ProtectionRequest,
    ) -> Result<ProtectionResult, OrchestratorError> {
        let result = self.protection.protect(request).await?;
        self.protected_registry.put(result.artifacts.clone())?;
        Ok(result)
    }

    /// Split artifacts as distribution items, in registry order.
    pub fn registered_items(&self) -> Vec<DistributionItem> {
        self.split_registry
            .get()
            .into_iter()
            .map(DistributionItem::from)
            .collect()
    }

    pub fn split_artifacts(&self) -> Vec<ArtifactRef> {
        self.split_registry.get()
    }

    pub fn protected_artifacts(&self) -> Vec<ArtifactRef> {
        self.protected_registry.get()
    }

    /// Dispatch every split artifact now.
    pub async fn send_registered_now(
        &self,
        template: MessageTemplate,
    ) -> Result<JobSnapshot, OrchestratorError> {
        if self.split_registry.is_empty() {
            return Err(OrchestratorError::InputInvalid(
                "no split artifacts registered".to_string(),
            ));
        }
        self.submit_now(self.registered_items(), template).await
    }

    /// Send a single split artifact as a one-item job.
    ///
    /// Subject to the same state rules as `submit_now`.
    pub async fn send_one(
        &self,
        id: &str,
        template: MessageTemplate,
    ) -> Result<DispatchOutcome, OrchestratorError> {
        let artifact = self
            .split_registry
            .find(id)
            .ok_or_else(|| OrchestratorError::ArtifactNotFound(id.to_string()))?;

        let snapshot = self
            .submit_now(vec![DistributionItem::from(artifact)], template)
            .await?;
        Ok(snapshot.outcome.unwrap_or_default())
    }

    /// Empty both registries and their persisted slots.
    pub fn clear_artifacts(&self) -> Result<(), OrchestratorError> {
        let (split, protected) = (self.split_registry.len(), self.protected_registry.len());
        self.split_registry.clear()?;
        self.protected_registry.clear()?;
        info!(
            "Cleared {} split and {} protected artifacts",
            split, protected
        );
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn check_new_job(
        &self,
        cell: &JobCell,
        operation: &'static str,
    ) -> Result<(), OrchestratorError> {
        if cell.snapshot.state.accepts_new_job() {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidStateTransition {
                operation,
                state: cell.snapshot.state,
            })
        }
    }

    fn check_items(&self, items: &[DistributionItem]) -> Result<(), OrchestratorError> {
        if items.is_empty() {
            return Err(OrchestratorError::InputInvalid(
                "no items to distribute".to_string(),
            ));
        }
        Ok(())
    }

    async fn check_credential(&self) -> Result<crate::auth::Credential, OrchestratorError> {
        self.credentials
            .current_credential()
            .await
            .map_err(|e| OrchestratorError::InputInvalid(e.to_string()))
    }

    /// Record a transition, count it and broadcast it.
    fn transition(&self, cell: &mut JobCell, to: JobState) {
        let from = cell.snapshot.state;
        cell.snapshot.state = to;

        let job_id = cell.snapshot.job_id.clone().unwrap_or_default();
        info!("Job {}: {} -> {}", job_id, from, to);
        metrics::JOB_TRANSITIONS
            .with_label_values(&[from.as_str(), to.as_str()])
            .inc();
        let _ = self.updates.send(JobUpdate::StateChanged { job_id, from, to });
    }

    fn enter_scheduled(
        &self,
        cell: &mut JobCell,
        job: ScheduledJob,
        handle: Option<ScheduleHandle>,
    ) {
        cell.handle = handle;
        cell.snapshot = JobSnapshot {
            job_id: Some(job.job_id.clone()),
            state: cell.snapshot.state,
            total: job.items.len(),
            scheduled_at: Some(job.scheduled_at),
            ..Default::default()
        };
        cell.pending = Some(job);
        self.transition(cell, JobState::Scheduled);
    }

    fn persist_schedule(&self, job: &ScheduledJob) -> Result<(), RegistryError> {
        let json = serde_json::to_string(job)
            .map_err(|e| RegistryError::Serialization(e.to_string()))?;
        self.store.save(SCHEDULE_SLOT, &json)
    }

    fn forget_schedule(&self) {
        if let Err(e) = self.store.remove(SCHEDULE_SLOT) {
            warn!("Failed to remove persisted schedule: {}", e);
        }
    }

    fn fire_callback(&self, job_id: String) -> FireCallback {
        let this = self.clone();
        Box::new(move || Box::pin(async move { this.fire(job_id).await }))
    }

    /// Start the scheduled job `job_id` unless it was cancelled or replaced.
    async fn fire(&self, job_id: String) {
        let job = {
            let mut cell = self.job.lock().await;
            let job = match cell.pending.take() {
                Some(job)
                    if cell.snapshot.state == JobState::Scheduled && job.job_id == job_id =>
                {
                    job
                }
                other => {
                    cell.pending = other;
                    debug!("Ignoring fire for stale job {}", job_id);
                    return;
                }
            };
            cell.handle = None;
            self.transition(&mut cell, JobState::Processing);
            job
        };

        // Storage only matters for restarts once the job is under way.
        self.forget_schedule();
        self.run_job(&job.job_id, &job.items, &job.template).await;
    }

    /// Run the pipeline for a job already in Processing and settle its final state.
    async fn run_job(
        &self,
        job_id: &str,
        items: &[DistributionItem],
        template: &MessageTemplate,
    ) -> JobSnapshot {
        let (progress_tx, mut progress_rx) =
            mpsc::channel::<DispatchProgress>(items.len().max(1));

        let forward = async {
            while let Some(progress) = progress_rx.recv().await {
                let mut cell = self.job.lock().await;
                if cell.snapshot.job_id.as_deref() == Some(job_id) {
                    cell.snapshot.processed = progress.processed;
                }
                drop(cell);

                let _ = self.updates.send(JobUpdate::Progress {
                    job_id: job_id.to_string(),
                    progress,
                });
            }
        };

        let (result, ()) = tokio::join!(
            self.pipeline.run(items, template, Some(progress_tx)),
            forward
        );

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(DispatchError::NotAuthenticated) => {
                warn!("Job {}: credential unavailable at dispatch time", job_id);
                precondition_failure(items, "authentication required")
            }
        };

        let state = if outcome.is_complete() {
            JobState::Completed
        } else {
            JobState::PartiallyFailed
        };
        self.finish(job_id, outcome, state).await
    }

    async fn finish(
        &self,
        job_id: &str,
        outcome: DispatchOutcome,
        state: JobState,
    ) -> JobSnapshot {
        let mut cell = self.job.lock().await;
        if cell.snapshot.job_id.as_deref() == Some(job_id) {
            cell.snapshot.outcome = Some(outcome);
            self.transition(&mut cell, state);
        }
        cell.snapshot.clone()
    }
}

/// Outcome recording every item as failed before any attempt.
fn precondition_failure(items: &[DistributionItem], detail: &str) -> DispatchOutcome {
    DispatchOutcome {
        succeeded: 0,
        failed: items
            .iter()
            .enumerate()
            .map(|(index, item)| ItemFailure {
                index,
                item_id: item.id().to_string(),
                reason: FailureReason::PreconditionFailed(detail.to_string()),
            })
            .collect(),
    }
}
