use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec,
    register_int_gauge, Histogram, HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

lazy_static! {
    // ═══════════════════════════════════════════════════════════════════════════
    // JOB METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of jobs initialised
    pub static ref JOBS_STARTED: IntCounter = register_int_counter!(
        "pnp_sequencer_jobs_started_total",
        "Total number of jobs initialised"
    )
    .unwrap();

    /// Total number of jobs that ran to completion
    pub static ref JOBS_COMPLETED: IntCounter = register_int_counter!(
        "pnp_sequencer_jobs_completed_total",
        "Total number of jobs completed"
    )
    .unwrap();

    /// Total number of jobs aborted
    pub static ref JOBS_ABORTED: IntCounter = register_int_counter!(
        "pnp_sequencer_jobs_aborted_total",
        "Total number of jobs aborted"
    )
    .unwrap();

    /// Jobs currently bound to an engine and not yet finished
    pub static ref ACTIVE_JOBS: IntGauge = register_int_gauge!(
        "pnp_sequencer_jobs_active",
        "Current number of active jobs"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // PLACEMENT METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of parts placed
    pub static ref PLACEMENTS_PLACED: IntCounter = register_int_counter!(
        "pnp_sequencer_placements_placed_total",
        "Total number of parts placed"
    )
    .unwrap();

    /// Total number of placements skipped by recovery actions
    pub static ref PLACEMENTS_SKIPPED: IntCounter = register_int_counter!(
        "pnp_sequencer_placements_skipped_total",
        "Total number of placements skipped"
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // CYCLE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total number of non-empty cycles planned
    pub static ref CYCLES_PLANNED: IntCounter = register_int_counter!(
        "pnp_sequencer_cycles_planned_total",
        "Total number of cycles planned"
    )
    .unwrap();

    /// Placements per planned cycle
    pub static ref CYCLE_SIZE: Histogram = register_histogram!(
        "pnp_sequencer_cycle_size",
        "Number of placements in each planned cycle",
        vec![1.0, 2.0, 4.0, 8.0, 16.0]
    )
    .unwrap();

    /// Phase execution duration by phase
    pub static ref PHASE_DURATION: HistogramVec = register_histogram_vec!(
        "pnp_sequencer_phase_duration_ms",
        "Phase execution duration in milliseconds",
        &["phase"],
        vec![1.0, 10.0, 100.0, 500.0, 1000.0, 5000.0, 30000.0]
    )
    .unwrap();

    // ═══════════════════════════════════════════════════════════════════════════
    // FAILURE METRICS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Phase failures by error kind
    pub static ref JOB_FAILURES: IntCounterVec = register_int_counter_vec!(
        "pnp_sequencer_failures_total",
        "Total phase failures by error kind",
        &["kind"]
    )
    .unwrap();

    /// Recovery actions executed by action name
    pub static ref RECOVERY_ACTIONS: IntCounterVec = register_int_counter_vec!(
        "pnp_sequencer_recovery_actions_total",
        "Total recovery actions executed",
        &["action"]
    )
    .unwrap();

    /// Log events observed by the tracing layer, by level
    pub static ref LOG_EVENTS: IntCounterVec = register_int_counter_vec!(
        "pnp_sequencer_log_events_total",
        "Total log events by level",
        &["level"]
    )
    .unwrap();
}
