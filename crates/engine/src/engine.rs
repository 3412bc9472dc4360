//! Job engine driver

use chrono::{DateTime, Utc};
use pnp_sequencer_config::EngineConfig;
use pnp_sequencer_machine::Machine;
use pnp_sequencer_metrics::{JobSpan, MetricsCollector};
use pnp_sequencer_types::{BoardLocationId, Job, Location, PlacementId};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn, Instrument};

use crate::abort::AbortHandle;
use crate::command::Command;
use crate::context::{PhaseEnv, RunContext, RunSummary};
use crate::error::{JobError, JobFailure};
use crate::phase::{Phase, PhaseOutcome};
use crate::plan::PlannedPlacement;
use crate::record::{JobPlacement, PlacementKey, PlacementStatus};
use crate::status::{StatusChannel, StatusListener, SubscriptionId};
use crate::{execution, fiducial, planner, preflight, recovery};

/// Resumable job sequencer.
///
/// The engine holds at most one job. [`JobEngine::initialize`] binds it and
/// points the engine at [`Phase::PreFlight`]; every [`JobEngine::next`] call
/// then runs exactly one phase. A failed phase keeps the phase pointer where it
/// was, so the caller can execute one of the offered recovery [`Command`]s and
/// step again.
pub struct JobEngine {
    machine: Arc<dyn Machine>,
    config: EngineConfig,
    status: Arc<StatusChannel>,
    metrics: Option<Arc<MetricsCollector>>,
    abort: AbortHandle,
    run: Option<RunContext>,
    phase: Option<Phase>,
    span: Option<JobSpan>,
}

impl JobEngine {
    pub fn new(machine: Arc<dyn Machine>) -> Self {
        Self {
            machine,
            config: EngineConfig::default(),
            status: Arc::new(StatusChannel::new()),
            metrics: None,
            abort: AbortHandle::new(),
            run: None,
            phase: None,
            span: None,
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bind a job and point the engine at PreFlight.
    ///
    /// A job still in progress is aborted first, including the safe-Z cleanup.
    /// Jobs with duplicate board location ids, or duplicate placement ids on one
    /// board, are rejected before anything else happens.
    pub async fn initialize(&mut self, job: Job) -> Result<(), JobFailure> {
        RunContext::check_identities(&job)?;
        if self.phase.is_some() {
            warn!(
                phase = ?self.phase,
                "initializing while a job is in progress, aborting it first"
            );
            self.abort().await?;
        }

        self.abort.reset();
        let span = JobSpan::new(job.name.clone());
        info!(
            job = %job.name,
            correlation_id = %span.correlation_id,
            boards = job.board_locations.len(),
            "job initialized"
        );
        self.run = Some(RunContext::new(job));
        self.phase = Some(Phase::PreFlight);
        self.span = Some(span);
        if let Some(metrics) = &self.metrics {
            metrics.record_job_started();
        }
        Ok(())
    }

    /// Run the current phase once. Returns false when there is nothing left to do.
    pub async fn next(&mut self) -> Result<bool, JobFailure> {
        self.next_with(None).await
    }

    /// With a command, execute it as a recovery step without moving the phase
    /// pointer; otherwise run the current phase once.
    pub async fn next_with(&mut self, command: Option<Command>) -> Result<bool, JobFailure> {
        if let Some(command) = command {
            self.execute(command).await?;
            return Ok(true);
        }

        let Some(phase) = self.phase else {
            return Ok(false);
        };
        if self.abort.is_aborted() {
            info!(phase = %phase, "abort requested between steps");
            self.cleanup_after_abort().await;
            return Ok(false);
        }

        let Some(run) = self.run.as_mut() else {
            self.phase = None;
            return Err(JobError::invalid_state("phase set without a bound job").into());
        };
        let span = self
            .span
            .as_ref()
            .map(JobSpan::span)
            .unwrap_or_else(tracing::Span::none);

        debug!(phase = %phase, description = phase.description(), "executing phase");
        let started = Instant::now();
        let result = {
            let env = PhaseEnv {
                machine: self.machine.as_ref(),
                config: &self.config,
                status: &self.status,
                metrics: self.metrics.as_deref(),
                cancel: self.abort.token(),
            };
            execute_phase(phase, run, &env).instrument(span).await
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_phase_duration(phase.name(), started.elapsed());
        }

        match result {
            Ok(PhaseOutcome::Advance(next)) => {
                debug!(from = %phase, to = %next, "phase advanced");
                self.phase = Some(next);
            }
            Ok(PhaseOutcome::Retry) => {
                debug!(phase = %phase, "phase will run again");
            }
            Ok(PhaseOutcome::Complete) => {
                self.phase = None;
                if let Some(metrics) = &self.metrics {
                    metrics.record_job_completed();
                }
            }
            Err(failure) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_failure(failure.error.kind());
                }
                if matches!(failure.error, JobError::Aborted) {
                    info!(phase = %phase, "job aborted during phase");
                    self.cleanup_after_abort().await;
                } else {
                    warn!(
                        phase = %phase,
                        error = %failure.error,
                        actions = failure.actions.len(),
                        "phase failed"
                    );
                }
                return Err(failure);
            }
        }
        Ok(true)
    }

    async fn execute(&mut self, command: Command) -> Result<(), JobFailure> {
        if let Some(metrics) = &self.metrics {
            metrics.record_recovery_action(command.name());
        }
        if command == Command::AbortJob {
            return self.abort().await;
        }

        let (Some(phase), Some(run)) = (self.phase, self.run.as_mut()) else {
            return Err(JobError::misuse(format!("{} issued while idle", command.name())).into());
        };
        let result = recovery::apply(run, phase, &command)?;
        if result.skipped > 0 {
            if let Some(metrics) = &self.metrics {
                metrics.record_placements_skipped(result.skipped);
            }
        }
        Ok(())
    }

    /// Abort the current job: safe Z, discard held parts, become idle.
    ///
    /// The engine is idle afterwards even if the cleanup motion fails.
    pub async fn abort(&mut self) -> Result<(), JobFailure> {
        self.abort.abort();
        let was_running = self.phase.take().is_some();

        let machine = self.machine.clone();
        let cleanup = async move {
            let head = machine.default_head()?;
            head.move_to_safe_z().await?;
            head.release_all().await
        };
        let result = cleanup.await.map_err(JobFailure::from);

        self.finish_abort(was_running);
        result
    }

    /// Cleanup after an in-flight or between-steps abort; errors are only logged
    async fn cleanup_after_abort(&mut self) {
        let was_running = self.phase.take().is_some();
        match self.machine.default_head() {
            Ok(head) => {
                if let Err(e) = head.move_to_safe_z().await {
                    error!(error = %e, "safe Z move failed during abort");
                }
                if let Err(e) = head.release_all().await {
                    error!(error = %e, "releasing held parts failed during abort");
                }
            }
            Err(e) => error!(error = %e, "no head available for abort cleanup"),
        }
        self.finish_abort(was_running);
    }

    /// Records and the cycle plan stay as last committed so they can be inspected
    fn finish_abort(&self, was_running: bool) {
        if was_running {
            if let Some(metrics) = &self.metrics {
                metrics.record_job_aborted();
            }
            self.status.fire("Job aborted.");
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn status_channel(&self) -> Arc<StatusChannel> {
        self.status.clone()
    }

    pub fn subscribe(&self, listener: Arc<dyn StatusListener>) -> SubscriptionId {
        self.status.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.status.unsubscribe(id)
    }

    pub fn current_phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_some()
    }

    pub fn run(&self) -> Option<&RunContext> {
        self.run.as_ref()
    }

    pub fn job(&self) -> Option<&Job> {
        self.run.as_ref().map(RunContext::job)
    }

    pub fn placements(&self) -> &[JobPlacement] {
        self.run
            .as_ref()
            .map(RunContext::placements)
            .unwrap_or_default()
    }

    pub fn placement(&self, key: &PlacementKey) -> Option<&JobPlacement> {
        self.run.as_ref().and_then(|run| run.placement(key))
    }

    /// Records for a placement id on every board, optionally filtered by status
    pub fn placements_by_id(
        &self,
        placement: &PlacementId,
        status: Option<PlacementStatus>,
    ) -> Vec<&JobPlacement> {
        self.placements()
            .iter()
            .filter(|r| r.placement_id() == placement)
            .filter(|r| status.map_or(true, |s| r.status() == s))
            .collect()
    }

    pub fn cycle_plan(&self) -> &[PlannedPlacement] {
        self.run
            .as_ref()
            .map(RunContext::cycle_plan)
            .unwrap_or_default()
    }

    pub fn fiducial_override(&self, board: &BoardLocationId) -> Option<Location> {
        self.run
            .as_ref()
            .and_then(|run| run.fiducial_override(board).copied())
    }

    pub fn total_parts_placed(&self) -> u64 {
        self.run.as_ref().map_or(0, RunContext::total_parts_placed)
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.run.as_ref().and_then(RunContext::started_at)
    }

    pub fn summary(&self) -> RunSummary {
        self.run
            .as_ref()
            .map(RunContext::summary)
            .unwrap_or_default()
    }
}

async fn execute_phase(
    phase: Phase,
    run: &mut RunContext,
    env: &PhaseEnv<'_>,
) -> Result<PhaseOutcome, JobFailure> {
    match phase {
        Phase::PreFlight => preflight::run(run, env).await,
        Phase::FiducialCheck => fiducial::run(run, env).await,
        Phase::Plan => planner::run(run, env).await,
        Phase::Feed => execution::feed(run, env).await,
        Phase::Pick => execution::pick(run, env).await,
        Phase::Align => execution::align(run, env).await,
        Phase::Place => execution::place(run, env).await,
        Phase::Cleanup => execution::cleanup(run, env).await,
        Phase::Finish => execution::finish(run, env).await,
    }
}
