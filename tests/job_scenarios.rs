//! End-to-end job runs against the simulated machine

use async_trait::async_trait;
use pnp_sequencer::config::EngineConfig;
use pnp_sequencer::engine::PlacementKey;
use pnp_sequencer::machine::sim::{
    OperationLog, SimAlignment, SimFeeder, SimFiducialLocator, SimHead, SimNozzle,
    SimulatedMachine,
};
use pnp_sequencer::machine::{FiducialLocator, MachineError};
use pnp_sequencer::metrics::MetricsCollector;
use pnp_sequencer::types::{BoardLocation, Job, Location};
use pnp_sequencer::{Command, JobEngine, JobError, Phase, PlacementStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn sample_job() -> Job {
    serde_json::from_str(include_str!("fixtures/two_boards.json")).unwrap()
}

fn simulated(job: &Job, log: &OperationLog) -> SimulatedMachine {
    let nozzles = vec![
        Arc::new(SimNozzle::new("N1", log)),
        Arc::new(SimNozzle::new("N2", log)),
    ];
    let mut machine = SimulatedMachine::new(log)
        .with_head(Arc::new(SimHead::new("H1", nozzles, log)))
        .with_alignment(Arc::new(SimAlignment::new(log)));
    for (i, part) in job.required_parts().into_iter().enumerate() {
        machine = machine.with_feeder(Arc::new(SimFeeder::new(
            format!("F{}", i + 1),
            part,
            Location::xy(-20.0, 8.0 * i as f64),
            log,
        )));
    }
    machine
}

async fn drive(engine: &mut JobEngine) -> usize {
    let mut steps = 0;
    while engine.next().await.unwrap() {
        steps += 1;
        assert!(steps < 500, "job did not finish");
    }
    steps
}

/// Fails the first `failures` locate calls, then reports the nominal origin
struct FlakyLocator {
    failures: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl FiducialLocator for FlakyLocator {
    async fn locate_board(&self, board_location: &BoardLocation) -> Result<Location, MachineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(MachineError::Vision("fiducial out of camera view".to_string()));
        }
        Ok(board_location.location)
    }
}

#[tokio::test]
async fn test_sample_job_runs_to_completion() {
    let job = sample_job();
    let log = OperationLog::new();
    let locator = Arc::new(SimFiducialLocator::new(&log));
    locator.set_correction("panel-1", Location::new(0.5, -0.25, 0.0, 0.0));
    let machine = simulated(&job, &log).with_fiducial_locator(locator);

    let mut engine = JobEngine::new(Arc::new(machine))
        .with_config(EngineConfig::default().with_park_when_complete(true));
    let statuses = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = statuses.clone();
    engine.subscribe(Arc::new(move |text: &str| sink.lock().unwrap().push(text.to_string())));

    engine.initialize(job).await.unwrap();
    drive(&mut engine).await;

    let keys: Vec<String> = engine.placements().iter().map(|r| r.key().to_string()).collect();
    assert_eq!(keys, vec!["panel-1/R1", "panel-1/R2", "panel-1/C1", "panel-1/U1"]);
    assert_eq!(engine.total_parts_placed(), 4);
    assert!(engine
        .placements()
        .iter()
        .all(|r| r.status() == PlacementStatus::Placed));

    assert_eq!(log.count_matching("locate board panel-1"), 1);
    assert_eq!(log.count_matching("place SHT40 at 70.500,49.750,-0.800"), 1);
    assert_eq!(log.entries().last().map(String::as_str), Some("head H1 park"));

    let statuses = statuses.lock().unwrap();
    assert_eq!(statuses.first().map(String::as_str), Some("Checking job for setup errors."));
    assert!(statuses.last().unwrap().starts_with("Job complete."));
}

#[tokio::test]
async fn test_fiducial_check_rescans_on_reentry() {
    let job = Job::new("retry").with_board(
        sample_job().board_locations[0]
            .clone()
            .with_fiducial_check(true),
    );
    let log = OperationLog::new();
    let locator = Arc::new(FlakyLocator {
        failures: AtomicUsize::new(2),
        calls: AtomicUsize::new(0),
    });
    let machine = simulated(&job, &log).with_fiducial_locator(locator.clone());
    let mut engine = JobEngine::new(Arc::new(machine));

    engine.initialize(job).await.unwrap();
    engine.next().await.unwrap();

    for _ in 0..2 {
        let failure = engine.next().await.unwrap_err();
        assert!(matches!(failure.error, JobError::Fiducial { .. }));
        assert_eq!(engine.current_phase(), Some(Phase::FiducialCheck));
    }
    assert!(engine.next().await.unwrap());
    assert_eq!(engine.current_phase(), Some(Phase::Plan));
    assert_eq!(locator.calls.load(Ordering::SeqCst), 3);
    assert_eq!(
        engine.fiducial_override(&"panel-1".into()),
        Some(Location::new(50.0, 40.0, -1.6, 0.0))
    );
}

#[tokio::test]
async fn test_missing_locator_offers_board_recoveries() {
    let job = sample_job();
    let log = OperationLog::new();
    let mut engine = JobEngine::new(Arc::new(simulated(&job, &log)));

    engine.initialize(job).await.unwrap();
    engine.next().await.unwrap();

    let failure = engine.next().await.unwrap_err();
    assert_eq!(
        failure.actions,
        vec![
            Command::SkipFiducialCheck {
                board: "panel-1".into()
            },
            Command::DisableBoard {
                board: "panel-1".into()
            },
        ]
    );

    engine
        .next_with(Some(failure.actions[1].clone()))
        .await
        .unwrap();
    drive(&mut engine).await;
    assert_eq!(engine.total_parts_placed(), 0);
    assert_eq!(engine.summary().skipped, 4);
    assert_eq!(log.count_matching(" pick "), 0);
}

#[tokio::test]
async fn test_recovery_mix_with_metrics() {
    let mut job = sample_job();
    job.board_locations[0].check_fiducials = false;
    // C1 loses its part definition
    job.board_locations[0].board.placements[3].part = None;

    let log = OperationLog::new();
    let collector = Arc::new(MetricsCollector::new());
    let mut engine = JobEngine::new(Arc::new(simulated(&job, &log))).with_metrics(collector.clone());
    engine.initialize(job).await.unwrap();

    let failure = engine.next().await.unwrap_err();
    assert_eq!(
        failure.actions,
        vec![Command::SkipPlacement {
            placement: PlacementKey::new("panel-1", "C1")
        }]
    );
    engine.next_with(Some(failure.actions[0].clone())).await.unwrap();
    engine
        .next_with(Some(Command::SkipPart {
            part: "SHT40".into(),
        }))
        .await
        .unwrap();

    drive(&mut engine).await;
    let summary = engine.summary();
    assert_eq!(summary.placed, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(
        engine
            .placements_by_id(&"U1".into(), None)
            .first()
            .map(|r| r.status()),
        Some(PlacementStatus::Skipped)
    );

    let metrics = collector.export_metrics().unwrap();
    assert!(metrics.contains("pnp_sequencer_placements_placed_total"));
    assert!(metrics.contains("action=\"Skip Part\""));
    assert!(metrics.contains("kind=\"placement_validation\""));
}

#[tokio::test]
async fn test_engine_is_reusable_after_completion() {
    let job = sample_job();
    let log = OperationLog::new();
    let locator = Arc::new(SimFiducialLocator::new(&log));
    let machine = simulated(&job, &log).with_fiducial_locator(locator);
    let mut engine = JobEngine::new(Arc::new(machine));

    engine.initialize(job.clone()).await.unwrap();
    drive(&mut engine).await;
    let first_start = engine.started_at().unwrap();

    engine.initialize(job).await.unwrap();
    assert_eq!(engine.total_parts_placed(), 0);
    drive(&mut engine).await;
    assert_eq!(engine.total_parts_placed(), 4);
    assert!(engine.started_at().unwrap() >= first_start);
    assert_eq!(log.count_matching(" place "), 8);
}
