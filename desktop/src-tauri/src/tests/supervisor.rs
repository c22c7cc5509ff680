use crate::supervisor::{
    BackendState, BackendSupervisor, SupervisorConfig, SupervisorError,
};
use crate::tests::support::{RecordingNotifier, ScriptedProbe};

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

/// Config tuned for tests: instant grace periods, an effectively
/// disabled background loop (ticks are driven by hand), and a restart
/// threshold of two sweeps.
fn test_config(executable: Option<PathBuf>) -> SupervisorConfig {
    let mut config = SupervisorConfig::default();
    config.backend.executable = executable;
    config.backend.args = vec!["30".into()];
    config.health.startup_grace_ms = 10;
    config.health.probe_timeout_ms = 50;
    config.health.interval_secs = 3600;
    config.health.failure_threshold = 2;
    config.health.shutdown_grace_secs = 1;
    config
}

fn test_supervisor(
    config: SupervisorConfig,
    answering: &[u16],
) -> (
    BackendSupervisor,
    Arc<ScriptedProbe>,
    Arc<RecordingNotifier>,
    TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    let probe = Arc::new(ScriptedProbe::answering(answering));
    let notifier = Arc::new(RecordingNotifier::default());

    let supervisor = BackendSupervisor::new(
        dir.path().to_path_buf(),
        config,
        probe.clone(),
        notifier.clone(),
    );

    (supervisor, probe, notifier, dir)
}

#[tokio::test]
async fn stop_when_already_stopped_is_a_noop() {
    let (supervisor, _, _, _dir) = test_supervisor(test_config(None), &[]);

    supervisor.stop().await.unwrap();

    assert_eq!(supervisor.state().await, BackendState::Stopped);
    assert_eq!(supervisor.endpoint().await, None);
}

#[tokio::test]
async fn start_fails_when_binary_is_missing() {
    let missing = PathBuf::from("/nonexistent/multiplelive-server");
    let (supervisor, probe, _, _dir) = test_supervisor(test_config(Some(missing)), &[8090]);

    let err = supervisor.start().await.unwrap_err();

    assert!(matches!(err, SupervisorError::BinaryNotFound { .. }));
    assert!(matches!(
        supervisor.state().await,
        BackendState::Failed { .. }
    ));
    // Nothing spawned, nothing probed.
    assert!(probe.probed().is_empty());
    assert_eq!(supervisor.pid().await, None);
}

// Lifecycle tests below spawn /bin/sleep as a stand-in backend: the
// supervisor treats the child as opaque, so any long-lived process
// works.
#[cfg(unix)]
mod with_child {
    use super::*;

    fn sleep_config() -> SupervisorConfig {
        test_config(Some(PathBuf::from("/bin/sleep")))
    }

    #[tokio::test]
    async fn start_discovers_endpoint_probing_from_base() {
        let (supervisor, probe, notifier, _dir) = test_supervisor(sleep_config(), &[8093]);

        let endpoint = supervisor.start().await.unwrap();

        assert_eq!(endpoint.port, 8093);
        assert_eq!(endpoint.url(), "http://127.0.0.1:8093/");
        assert_eq!(probe.probed(), vec![8090, 8091, 8092, 8093]);
        assert_eq!(
            supervisor.state().await,
            BackendState::Running { endpoint }
        );
        assert_eq!(notifier.endpoints.lock().unwrap().as_slice(), &[endpoint]);
        assert!(supervisor.pid().await.is_some());

        supervisor.stop().await.unwrap();
        assert_eq!(supervisor.state().await, BackendState::Stopped);
        assert_eq!(supervisor.endpoint().await, None);
        assert_eq!(supervisor.pid().await, None);
    }

    #[tokio::test]
    async fn ensure_healthy_probes_without_spawning() {
        let (supervisor, probe, _, _dir) = test_supervisor(sleep_config(), &[8090]);

        supervisor.start().await.unwrap();
        let pid = supervisor.pid().await;
        probe.clear_probed();

        let endpoint = supervisor.ensure_healthy().await.unwrap();

        assert_eq!(endpoint.port, 8090);
        assert_eq!(probe.probed(), vec![8090]);
        assert_eq!(supervisor.pid().await, pid);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn ensure_healthy_requires_a_known_endpoint() {
        let (supervisor, _, _, _dir) = test_supervisor(sleep_config(), &[8090]);

        let err = supervisor.ensure_healthy().await.unwrap_err();

        assert!(matches!(err, SupervisorError::NotRunning { .. }));
    }

    #[tokio::test]
    async fn start_fails_when_no_port_answers() {
        let (supervisor, probe, _, _dir) = test_supervisor(sleep_config(), &[]);

        let err = supervisor.start().await.unwrap_err();

        assert!(matches!(err, SupervisorError::StartupFailed { .. }));
        assert!(matches!(
            supervisor.state().await,
            BackendState::Failed { .. }
        ));
        assert_eq!(supervisor.endpoint().await, None);
        // Full sweep, one probe per port, and the child was reaped.
        assert_eq!(probe.probed().len(), 10);
        assert_eq!(supervisor.pid().await, None);
    }

    #[tokio::test]
    async fn one_failed_sweep_does_not_restart() {
        let (supervisor, probe, notifier, _dir) = test_supervisor(sleep_config(), &[8090]);

        let endpoint = supervisor.start().await.unwrap();
        let pid = supervisor.pid().await;

        probe.set_answering(&[]);
        let mut failures = 0u32;
        supervisor.health_tick(&mut failures).await;

        // Below the threshold of two: still running on the same child.
        assert_eq!(failures, 1);
        assert_eq!(
            supervisor.state().await,
            BackendState::Running { endpoint }
        );
        assert_eq!(supervisor.pid().await, pid);
        assert!(notifier.notices.lock().unwrap().is_empty());

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn sustained_failure_restarts_and_failed_restart_is_surfaced() {
        let (supervisor, probe, notifier, _dir) = test_supervisor(sleep_config(), &[8090]);

        supervisor.start().await.unwrap();

        // Two consecutive failed sweeps trip the restart. The restart's
        // own discovery also finds nothing, so it fails.
        probe.set_answering(&[]);
        let mut failures = 0u32;
        supervisor.health_tick(&mut failures).await;
        supervisor.health_tick(&mut failures).await;

        assert!(matches!(
            supervisor.state().await,
            BackendState::Failed { .. }
        ));
        assert_eq!(notifier.notices.lock().unwrap().len(), 1);
        assert_eq!(supervisor.endpoint().await, None);

        // The loop keeps ticking; once a port answers again the backend
        // recovers without operator intervention.
        probe.set_answering(&[8091]);
        supervisor.health_tick(&mut failures).await;

        let endpoint = supervisor.endpoint().await.unwrap();
        assert_eq!(endpoint.port, 8091);
        assert_eq!(
            supervisor.state().await,
            BackendState::Running { endpoint }
        );
        assert_eq!(failures, 0);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn endpoint_rediscovered_after_external_move() {
        let (supervisor, probe, notifier, _dir) = test_supervisor(sleep_config(), &[8090]);

        supervisor.start().await.unwrap();
        assert_eq!(supervisor.endpoint().await.unwrap().port, 8090);

        // Backend moved ports behind our back (e.g. restarted itself).
        probe.set_answering(&[8093]);
        probe.clear_probed();
        let mut failures = 0u32;
        supervisor.health_tick(&mut failures).await;

        let endpoint = supervisor.endpoint().await.unwrap();
        assert_eq!(endpoint.port, 8093);
        assert_eq!(probe.probed(), vec![8090, 8091, 8092, 8093]);
        assert_eq!(
            supervisor.state().await,
            BackendState::Running { endpoint }
        );
        // Both the original endpoint and the move were announced.
        assert_eq!(notifier.endpoints.lock().unwrap().len(), 2);

        supervisor.stop().await.unwrap();
    }

    #[tokio::test]
    async fn tick_after_stop_is_inert() {
        let (supervisor, probe, _, _dir) = test_supervisor(sleep_config(), &[8090]);

        supervisor.start().await.unwrap();
        supervisor.stop().await.unwrap();
        probe.clear_probed();

        let mut failures = 0u32;
        supervisor.health_tick(&mut failures).await;

        assert!(probe.probed().is_empty());
        assert_eq!(supervisor.state().await, BackendState::Stopped);
    }
}
