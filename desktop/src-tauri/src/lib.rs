mod commands;
mod logging;
mod supervisor;
mod tray;
mod window;

use logging::setup_logging;
use supervisor::{
    BackendSupervisor, HttpProbe, Notifier, ServiceEndpoint, SupervisorConfig, UnreachableNotice,
};
use tray::TrayManager;
use window::WindowUiState;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use tauri::{Emitter, Manager};
use tracing::{error, info};

pub(crate) const BACKEND_DATA_DIR: &str = ".backend";
pub(crate) const TAURI_DATA_DIR: &str = ".tauri";

// Tauri event names (must match frontend TauriService constants)
const EVENT_BACKEND_ENDPOINT_KNOWN: &str = "backend-endpoint-known";
const EVENT_BACKEND_UNREACHABLE: &str = "backend-unreachable";
const EVENT_BACKEND_STATE_CHANGED: &str = "backend-state-changed";

/// Forwards supervisor notifications to the webview as Tauri events.
/// Emission never blocks, so the supervisor task is never held up.
struct TauriNotifier {
    app: tauri::AppHandle,
}

impl Notifier for TauriNotifier {
    fn endpoint_known(&self, endpoint: ServiceEndpoint) {
        self.app.emit(EVENT_BACKEND_ENDPOINT_KNOWN, endpoint).ok();
    }

    fn backend_unreachable(&self, notice: &UnreachableNotice) {
        self.app
            .emit(EVENT_BACKEND_UNREACHABLE, notice.clone())
            .ok();
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, _argv, _cwd| {
            // Focus existing window on second instance attempt
            if let Some(window) = app.get_webview_window("main") {
                window.show().ok();
                window.set_focus().ok();
            }
        }))
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;

            // Backend working directory (.backend/) - stream artifacts, caches
            let backend_dir = app_data_dir.join(BACKEND_DATA_DIR);
            std::fs::create_dir_all(&backend_dir)?;

            // Tauri data directory (.tauri/) - shell config/logs
            let tauri_dir = app_data_dir.join(TAURI_DATA_DIR);
            std::fs::create_dir_all(&tauri_dir)?;

            setup_logging(&tauri_dir)?;

            info!("Starting MultipleLive v{}", env!("CARGO_PKG_VERSION"));
            info!("Backend directory: {:?}", backend_dir);
            info!("Tauri directory: {:?}", tauri_dir);

            // Setup signal handlers for graceful shutdown on Unix
            #[cfg(unix)]
            {
                let app_handle = app.handle().clone();
                std::thread::spawn(move || {
                    use signal_hook::consts::{SIGINT, SIGTERM};
                    use signal_hook::iterator::Signals;

                    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
                        Ok(s) => s,
                        Err(e) => {
                            error!("Failed to register signal handlers: {e}");
                            return;
                        }
                    };

                    if let Some(sig) = signals.forever().next() {
                        info!("Received signal {sig}, shutting down...");

                        if let Some(supervisor) = app_handle.try_state::<BackendSupervisor>() {
                            tauri::async_runtime::block_on(async {
                                match supervisor.stop().await {
                                    Ok(()) => {
                                        info!("Backend stopped due to signal {sig}")
                                    }
                                    Err(e) => {
                                        error!("Failed to stop backend on signal: {e}")
                                    }
                                }
                            });
                        }

                        std::process::exit(0);
                    }
                });
            }

            // Load or create config from .tauri/
            let config = SupervisorConfig::load_or_create(&tauri_dir)
                .map_err(|e| format!("Config error: {}", e))?;

            let prober = Arc::new(HttpProbe::new(config.health.probe_timeout()));
            let notifier = Arc::new(TauriNotifier {
                app: app.handle().clone(),
            });

            let supervisor = BackendSupervisor::new(backend_dir, config, prober, notifier);
            app.manage(supervisor.clone());
            app.manage(WindowUiState::default());

            // Setup system tray with TrayManager
            let tray_manager = TrayManager::setup(app)?;
            app.manage(tray_manager.clone());

            // Start backend in background
            let app_handle = app.handle().clone();
            let supervisor_clone = supervisor.clone();
            tauri::async_runtime::spawn(async move {
                match supervisor_clone.start().await {
                    Ok(endpoint) => {
                        info!("Backend started on {endpoint}");
                    }
                    Err(e) => {
                        error!("Failed to start backend: {e}");
                        let notice = UnreachableNotice {
                            message: "The backend failed to start.".into(),
                            cause: e.to_string(),
                            suggestion: e.recovery_hint().into(),
                        };
                        app_handle.emit(EVENT_BACKEND_UNREACHABLE, notice).ok();
                    }
                }
            });

            // Subscribe to state changes for tray and frontend updates
            let app_handle = app.handle().clone();
            let supervisor_for_events = supervisor.clone();
            let mut state_rx = supervisor.subscribe();
            tauri::async_runtime::spawn(async move {
                while state_rx.changed().await.is_ok() {
                    let state = state_rx.borrow().clone();

                    if let Some(tray_mgr) = app_handle.try_state::<Arc<TrayManager>>() {
                        tray_mgr.update_status(&app_handle, &state);
                    }

                    let pid = supervisor_for_events.pid().await;
                    let status = commands::build_backend_status(&state, pid);
                    app_handle.emit(EVENT_BACKEND_STATE_CHANGED, status).ok();
                }
            });

            Ok(())
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                // Hide to tray instead of closing
                window.hide().ok();
                api.prevent_close();
            }
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_backend_status,
            commands::get_backend_url,
            commands::ui_ready,
            commands::check_backend_health,
            commands::restart_backend,
            commands::export_diagnostics,
            commands::get_recent_logs,
            commands::quit_app,
            window::minimize_window,
            window::toggle_maximize_window,
            window::hide_window,
            window::toggle_always_on_top,
            window::toggle_fullscreen,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| {
            use tauri::RunEvent;

            if let RunEvent::ExitRequested { api, code, .. } = event {
                info!("Exit requested (code: {:?})", code);
                api.prevent_exit();

                let app_handle_clone = app_handle.clone();
                tauri::async_runtime::block_on(async move {
                    if let Some(supervisor) = app_handle_clone.try_state::<BackendSupervisor>() {
                        info!("Stopping backend before exit...");
                        match supervisor.stop().await {
                            Ok(()) => info!("Backend stopped successfully"),
                            Err(e) => error!("Failed to stop backend: {}", e),
                        }
                    }
                });

                std::process::exit(code.unwrap_or(0));
            }
        });
}
