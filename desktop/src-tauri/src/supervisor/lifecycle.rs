//! Backend process lifecycle with discovery-driven crash recovery.

use crate::supervisor::{
    BackendState, Notifier, Prober, ServiceEndpoint, SupervisorConfig, SupervisorError,
    SupervisorResult, UnreachableNotice, discover, parse_port_hint,
};

use std::panic::Location;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use error_location::ErrorLocation;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const BACKEND_BINARY: &str = "multiplelive-server";

/// Supervises the backend process.
///
/// Responsibilities:
/// - Spawn the backend with captured stdio
/// - Discover which port it bound by probing the search range
/// - Monitor health on an interval and restart after sustained failure
/// - Guarantee clean shutdown synchronized with application exit
///
/// All lifecycle operations (`start`, `stop`, loop-triggered restarts)
/// serialize on one op lock; state transitions happen only here.
#[derive(Clone)]
pub struct BackendSupervisor {
    inner: Arc<Inner>,
}

struct Inner {
    config: SupervisorConfig,
    backend_dir: PathBuf,
    prober: Arc<dyn Prober>,
    notifier: Arc<dyn Notifier>,
    child: Mutex<Option<Child>>,
    endpoint: Mutex<Option<ServiceEndpoint>>,
    op_lock: Mutex<()>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    shutdown_requested: AtomicBool,
    state_tx: watch::Sender<BackendState>,
    state_rx: watch::Receiver<BackendState>,
}

impl BackendSupervisor {
    /// Create a new supervisor. Configuration is fixed for its lifetime.
    pub fn new(
        backend_dir: PathBuf,
        config: SupervisorConfig,
        prober: Arc<dyn Prober>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(BackendState::Stopped);

        Self {
            inner: Arc::new(Inner {
                config,
                backend_dir,
                prober,
                notifier,
                child: Mutex::new(None),
                endpoint: Mutex::new(None),
                op_lock: Mutex::new(()),
                health_task: Mutex::new(None),
                shutdown_requested: AtomicBool::new(false),
                state_tx,
                state_rx,
            }),
        }
    }

    /// Start the backend, discover its endpoint, and arm the health loop.
    pub async fn start(&self) -> SupervisorResult<ServiceEndpoint> {
        self.inner.shutdown_requested.store(false, Ordering::SeqCst);

        let _guard = self.inner.op_lock.lock().await;
        let endpoint = self.start_backend().await?;
        self.arm_health_loop().await;

        Ok(endpoint)
    }

    /// Stop the backend gracefully.
    ///
    /// Idempotent: stopping an already stopped supervisor is a no-op.
    pub async fn stop(&self) -> SupervisorResult<()> {
        self.inner.shutdown_requested.store(true, Ordering::SeqCst);

        // Cancel the health loop before touching the process so a pending
        // tick cannot race a restart against this shutdown.
        if let Some(task) = self.inner.health_task.lock().await.take() {
            task.abort();
        }

        let _guard = self.inner.op_lock.lock().await;

        if *self.inner.state_rx.borrow() == BackendState::Stopped {
            return Ok(());
        }

        self.set_state(BackendState::Stopping);
        self.stop_process().await;
        *self.inner.endpoint.lock().await = None;
        self.set_state(BackendState::Stopped);

        info!("backend stopped");
        Ok(())
    }

    /// One diagnostic probe against the current endpoint.
    ///
    /// Never spawns or restarts anything.
    pub async fn ensure_healthy(&self) -> SupervisorResult<ServiceEndpoint> {
        let endpoint =
            (*self.inner.endpoint.lock().await).ok_or_else(|| SupervisorError::NotRunning {
                location: ErrorLocation::from(Location::caller()),
            })?;

        match self.inner.prober.probe(endpoint.host, endpoint.port).await {
            Ok(()) => Ok(endpoint),
            Err(cause) => Err(SupervisorError::HealthCheckFailed {
                message: format!("{endpoint} did not answer: {cause}"),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<BackendState> {
        self.inner.state_rx.clone()
    }

    /// Get current state.
    pub async fn state(&self) -> BackendState {
        self.inner.state_rx.borrow().clone()
    }

    /// Get the discovered endpoint (if running).
    pub async fn endpoint(&self) -> Option<ServiceEndpoint> {
        *self.inner.endpoint.lock().await
    }

    /// Get the backend root URL for the frontend.
    pub async fn backend_url(&self) -> Option<String> {
        self.endpoint().await.map(|e| e.url())
    }

    /// Get backend process PID (if running).
    pub async fn pid(&self) -> Option<u32> {
        self.inner.child.lock().await.as_ref().and_then(|c| c.id())
    }

    fn set_state(&self, state: BackendState) {
        let _ = self.inner.state_tx.send(state);
    }

    /// Spawn + grace delay + discovery, without touching the health loop.
    /// Callers hold the op lock.
    async fn start_backend(&self) -> SupervisorResult<ServiceEndpoint> {
        self.set_state(BackendState::Starting);

        if let Err(e) = self.spawn_process().await {
            *self.inner.endpoint.lock().await = None;
            self.set_state(BackendState::Failed {
                error: e.to_string(),
            });
            return Err(e);
        }

        // Give the backend time to initialize before the first probe.
        tokio::time::sleep(self.inner.config.health.startup_grace()).await;

        let range = self.inner.config.backend.search_range();
        let host = self.inner.config.backend.host_addr();

        match discover(self.inner.prober.as_ref(), host, &range).await {
            Some(endpoint) => {
                *self.inner.endpoint.lock().await = Some(endpoint);
                self.set_state(BackendState::Running { endpoint });
                self.inner.notifier.endpoint_known(endpoint);
                info!("backend ready on {endpoint}");
                Ok(endpoint)
            }
            None => {
                // Reap the unreachable child before reporting.
                self.stop_process().await;
                *self.inner.endpoint.lock().await = None;

                let err = SupervisorError::StartupFailed {
                    message: format!("no port in {range} answered"),
                    location: ErrorLocation::from(Location::caller()),
                };
                self.set_state(BackendState::Failed {
                    error: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Spawn the backend with piped stdio.
    ///
    /// Output is never inherited: backend lines would interleave with our
    /// own logs. Reader tasks forward each line to tracing and watch for
    /// the backend's port announcement as a diagnostic hint.
    async fn spawn_process(&self) -> SupervisorResult<()> {
        std::fs::create_dir_all(&self.inner.backend_dir).map_err(|e| {
            SupervisorError::DataDirCreation {
                path: self.inner.backend_dir.clone(),
                source: e,
                location: ErrorLocation::from(Location::caller()),
            }
        })?;

        let binary = self.find_backend_binary()?;
        info!("spawning backend: {}", binary.display());

        let settings = &self.inner.config.backend;

        let mut cmd = Command::new(&binary);
        cmd.args(&settings.args)
            .current_dir(
                settings
                    .working_dir
                    .as_deref()
                    .unwrap_or(&self.inner.backend_dir),
            )
            .env("MULTIPLELIVE_HOST", &settings.host)
            .env("MULTIPLELIVE_BASE_PORT", settings.base_port.to_string())
            .env("MULTIPLELIVE_LOG_LEVEL", &self.inner.config.logging.level);

        for (key, value) in &settings.env {
            cmd.env(key, value);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| SupervisorError::ProcessSpawn {
            source: e,
            location: ErrorLocation::from(Location::caller()),
        })?;

        if let Some(stdout) = child.stdout.take() {
            Self::drain_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            Self::drain_output(stderr, "stderr");
        }

        info!("spawned backend with PID: {:?}", child.id());
        *self.inner.child.lock().await = Some(child);

        Ok(())
    }

    fn drain_output<R>(reader: R, stream: &'static str)
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(port) = parse_port_hint(&line) {
                    info!("backend announced port {port} on {stream}");
                }
                debug!(target: "backend", "{stream}: {line}");
            }
        });
    }

    /// Find the backend binary.
    ///
    /// Search order:
    /// 1. Explicit path from config
    /// 2. Sibling to current exe (bundled production + dev builds)
    /// 3. Installed at <data dir>/bin/
    /// 4. System PATH
    fn find_backend_binary(&self) -> SupervisorResult<PathBuf> {
        let binary_name = format!("{BACKEND_BINARY}{}", std::env::consts::EXE_SUFFIX);

        if let Some(path) = &self.inner.config.backend.executable {
            if path.exists() {
                info!("Using backend (configured): {}", path.display());
                return Ok(path.clone());
            }
            return Err(SupervisorError::BinaryNotFound {
                path: path.clone(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if let Ok(exe) = std::env::current_exe()
            && let Some(exe_dir) = exe.parent()
        {
            let sibling = exe_dir.join(&binary_name);
            if sibling.exists() {
                info!("Using backend (sibling): {}", sibling.display());
                return Ok(sibling);
            }
        }

        let installed = self.inner.backend_dir.join("bin").join(&binary_name);
        if installed.exists() {
            info!("Using backend (installed): {}", installed.display());
            return Ok(installed);
        }

        if let Ok(output) = std::process::Command::new("which")
            .arg(BACKEND_BINARY)
            .output()
            && output.status.success()
        {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                info!("Using backend (PATH): {path}");
                return Ok(PathBuf::from(path));
            }
        }

        Err(SupervisorError::BinaryNotFound {
            path: installed,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Terminate the child: graceful signal, bounded wait, then kill.
    ///
    /// Returns once the OS confirmed exit or the kill was issued; never
    /// blocks indefinitely.
    async fn stop_process(&self) {
        let Some(mut child) = self.inner.child.lock().await.take() else {
            return;
        };

        let grace = self.inner.config.health.shutdown_grace();

        if let Some(pid) = child.id() {
            Self::signal_terminate(pid);

            match tokio::time::timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    info!("backend exited: {status}");
                    return;
                }
                Ok(Err(e)) => warn!("failed waiting for backend exit: {e}"),
                Err(_) => warn!(
                    "backend did not exit within {}s, killing",
                    grace.as_secs()
                ),
            }
        }

        if let Err(e) = child.kill().await {
            warn!("failed to kill backend: {e}");
        }
    }

    #[cfg(unix)]
    fn signal_terminate(pid: u32) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        info!("sending SIGTERM to pid {pid}");
        kill(Pid::from_raw(pid as i32), Signal::SIGTERM).ok();
    }

    #[cfg(windows)]
    fn signal_terminate(pid: u32) {
        use windows_sys::Win32::System::Console::{CTRL_BREAK_EVENT, GenerateConsoleCtrlEvent};

        info!("sending CTRL_BREAK to pid {pid}");
        unsafe {
            GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid);
        }
    }

    /// Arm the background health loop, replacing any previous one.
    async fn arm_health_loop(&self) {
        let supervisor = self.clone();
        let interval = self.inner.config.health.interval();

        let task = tokio::spawn(async move {
            let mut consecutive_failures = 0u32;
            loop {
                tokio::time::sleep(interval).await;

                if supervisor.inner.shutdown_requested.load(Ordering::SeqCst) {
                    break;
                }

                supervisor.health_tick(&mut consecutive_failures).await;
            }
        });

        if let Some(previous) = self.inner.health_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    /// One health-loop tick: full discovery sweep, restart on sustained
    /// failure. Exposed to the crate for deterministic tests.
    pub(crate) async fn health_tick(&self, consecutive_failures: &mut u32) {
        let _guard = self.inner.op_lock.lock().await;

        if self.inner.shutdown_requested.load(Ordering::SeqCst) {
            return;
        }

        let range = self.inner.config.backend.search_range();
        let host = self.inner.config.backend.host_addr();
        let threshold = self.inner.config.health.failure_threshold;

        // Always rescan from base: the backend may have been restarted
        // externally and landed on a different port.
        match discover(self.inner.prober.as_ref(), host, &range).await {
            Some(endpoint) => {
                *consecutive_failures = 0;

                let previous = self.inner.endpoint.lock().await.replace(endpoint);
                if previous != Some(endpoint) {
                    info!("backend endpoint is now {endpoint}");
                    self.set_state(BackendState::Running { endpoint });
                    self.inner.notifier.endpoint_known(endpoint);
                }
            }
            None => {
                *consecutive_failures += 1;
                warn!("health sweep found no answering port ({consecutive_failures}/{threshold})");

                if *consecutive_failures < threshold {
                    return;
                }

                info!("restarting backend after {consecutive_failures} failed sweeps");
                self.stop_process().await;

                match self.start_backend().await {
                    Ok(endpoint) => {
                        *consecutive_failures = 0;
                        info!("backend restarted on {endpoint}");
                    }
                    Err(e) => {
                        // State is already Failed; keep ticking so recovery
                        // is retried on the next interval, and surface the
                        // failure each time.
                        if e.is_transient() {
                            warn!("backend restart failed, retrying next tick: {e}");
                        } else {
                            error!("backend restart failed: {e}");
                        }
                        self.inner.notifier.backend_unreachable(&UnreachableNotice {
                            message: "The backend is not responding and could not be restarted."
                                .into(),
                            cause: e.to_string(),
                            suggestion: e.recovery_hint().into(),
                        });
                    }
                }
            }
        }
    }
}
