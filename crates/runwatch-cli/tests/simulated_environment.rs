use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use runwatch_cli::simulation::SimulatedEnvironment;
use runwatch_runtime::{InstanceSession, Provider, ScreenState, SimulationConfig};
use runwatch_testing::assertions::assert_strictly_increasing;
use runwatch_types::{InstanceId, RunCriteria, Snapshot, TerminationStatus};

fn config(step_delay_ms: u64) -> SimulationConfig {
    SimulationConfig {
        jobs: 1,
        step_delay_ms,
        fail_ratio_pct: 0,
        seed_history: 2,
    }
}

fn wait_until<T>(timeout: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(value) = check() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

#[test]
fn test_attached_session_follows_run_to_the_end() {
    let env: Arc<dyn Provider> = Arc::new(SimulatedEnvironment::start(config(5)));
    let id = env.get_instances(&RunCriteria::all()).unwrap().remove(0);

    let mut session = InstanceSession::attach(Arc::clone(&env), id, 256).unwrap();
    let ended = wait_until(Duration::from_secs(10), || {
        session.pump();
        session.state().is_frozen().then_some(())
    });

    assert!(ended.is_some());
    assert_eq!(session.state(), &ScreenState::Ending);
    assert!(session.snapshot().unwrap().is_ended());

    let ordinals: Vec<u64> = session.output_lines().iter().map(|l| l.ordinal).collect();
    assert!(!ordinals.is_empty());
    assert_strictly_increasing(&ordinals).unwrap();
}

#[test]
fn test_seeded_history_is_newest_first() {
    let env = SimulatedEnvironment::start(config(50));
    let runs = env.read_history(&RunCriteria::all(), 10).unwrap();

    assert_eq!(runs.len(), 2);
    assert!(runs[0].created_at() > runs[1].created_at());
    assert!(runs.iter().all(Snapshot::is_ended));

    let tail = env.fetch_output_tail(&runs[0].instance_id, None).unwrap();
    assert!(!tail.is_empty());
    env.shutdown();
}

#[test]
fn test_stop_request_ends_run_as_stopped() {
    let env = SimulatedEnvironment::start(config(100));
    let id = env.get_instances(&RunCriteria::all()).unwrap().remove(0);

    env.stop(&id).unwrap();
    let ended = wait_until(Duration::from_secs(5), || {
        env.get_run(&id).ok()
    })
    .unwrap();

    assert_eq!(
        ended.root.termination_status(),
        Some(TerminationStatus::Stopped)
    );
    assert!(ended.root.stop_requested);
    env.shutdown();
}

#[test]
fn test_stop_of_unknown_instance_is_rejected() {
    let env = SimulatedEnvironment::idle(config(10));
    let err = env.stop(&InstanceId::new("ghost", "r1")).unwrap_err();
    assert!(err.to_string().contains("ghost@r1"));
}
