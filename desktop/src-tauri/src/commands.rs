//! Tauri IPC commands for frontend communication.

use crate::logging::current_log_path;
use crate::supervisor::{BackendState, BackendStatus, BackendSupervisor};

use tauri::Manager;
use tauri::State;
use tracing::{error, info};

/// Get current backend status.
///
/// Called by the frontend to check backend state and get the player URL.
#[tauri::command]
pub async fn get_backend_status(
    supervisor: State<'_, BackendSupervisor>,
) -> Result<BackendStatus, String> {
    let state = supervisor.state().await;
    let pid = supervisor.pid().await;

    Ok(build_backend_status(&state, pid))
}

/// Get the backend root URL for the player frontend.
#[tauri::command]
pub async fn get_backend_url(supervisor: State<'_, BackendSupervisor>) -> Result<String, String> {
    supervisor
        .backend_url()
        .await
        .ok_or_else(|| "Backend not running".into())
}

/// Called by the player UI after it subscribes to events.
/// Returns current backend status - enables race-free startup handshake.
///
/// The handshake protocol:
/// 1. UI subscribes to backend-state-changed events
/// 2. UI calls ui_ready (this command)
/// 3. Shell responds with current BackendStatus
/// 4. If the backend is already running, the UI has the endpoint
/// 5. If the backend is still starting, the UI waits for the event
#[tauri::command]
pub async fn ui_ready(supervisor: State<'_, BackendSupervisor>) -> Result<BackendStatus, String> {
    info!("UI ready notification received");

    let state = supervisor.state().await;
    let pid = supervisor.pid().await;

    Ok(build_backend_status(&state, pid))
}

/// One diagnostic health probe against the current endpoint.
#[tauri::command]
pub async fn check_backend_health(
    supervisor: State<'_, BackendSupervisor>,
) -> Result<String, String> {
    supervisor
        .ensure_healthy()
        .await
        .map(|endpoint| endpoint.url())
        .map_err(|e| {
            error!("Health check failed: {e}");
            format!("{e}\n\nHint: {}", e.recovery_hint())
        })
}

/// Manually restart the backend.
#[tauri::command]
pub async fn restart_backend(supervisor: State<'_, BackendSupervisor>) -> Result<(), String> {
    supervisor.stop().await.map_err(|e| e.to_string())?;
    supervisor.start().await.map_err(|e| e.to_string())?;
    Ok(())
}

/// Export diagnostic information as a zip file.
#[tauri::command]
pub async fn export_diagnostics(
    supervisor: State<'_, BackendSupervisor>,
    app: tauri::AppHandle,
) -> Result<String, String> {
    use std::io::Write;

    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| e.to_string())?
        .join(crate::TAURI_DATA_DIR);

    let export_path = data_dir.join("diagnostics.zip");

    let file = std::fs::File::create(&export_path).map_err(|e| e.to_string())?;
    let mut zip = zip::ZipWriter::new(file);

    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated);

    // Add system info
    let system_info = format!(
        "OS: {}\nArch: {}\nVersion: {}\nTimestamp: {}",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION"),
        chrono::Utc::now().to_rfc3339(),
    );
    zip.start_file("system_info.txt", options)
        .map_err(|e| e.to_string())?;
    zip.write_all(system_info.as_bytes())
        .map_err(|e| e.to_string())?;

    // Add backend status
    let state = supervisor.state().await;
    let pid = supervisor.pid().await;
    let status = build_backend_status(&state, pid);

    let status_json = serde_json::to_string_pretty(&status).map_err(|e| e.to_string())?;
    zip.start_file("backend_status.json", options)
        .map_err(|e| e.to_string())?;
    zip.write_all(status_json.as_bytes())
        .map_err(|e| e.to_string())?;

    // Add log files
    let logs_dir = data_dir.join("logs");
    if logs_dir.exists() {
        for entry in (std::fs::read_dir(&logs_dir).map_err(|e| e.to_string())?).flatten() {
            let path = entry.path();
            if path.is_file() {
                let name = format!("logs/{}", path.file_name().unwrap().to_string_lossy());
                zip.start_file(&name, options).map_err(|e| e.to_string())?;
                let content = std::fs::read(&path).map_err(|e| e.to_string())?;
                zip.write_all(&content).map_err(|e| e.to_string())?;
            }
        }
    }

    // Add config
    let config_path = data_dir.join("config.toml");
    if config_path.exists() {
        let config_content = std::fs::read_to_string(&config_path).map_err(|e| e.to_string())?;
        zip.start_file("config.toml", options)
            .map_err(|e| e.to_string())?;
        zip.write_all(config_content.as_bytes())
            .map_err(|e| e.to_string())?;
    }

    zip.finish().map_err(|e| e.to_string())?;

    Ok(export_path.to_string_lossy().into())
}

/// Get recent log lines.
#[tauri::command]
pub async fn get_recent_logs(
    app: tauri::AppHandle,
    lines: Option<usize>,
) -> Result<Vec<String>, String> {
    let data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| e.to_string())?
        .join(crate::TAURI_DATA_DIR);

    let log_path = current_log_path(&data_dir);

    if !log_path.exists() {
        return Ok(vec!["No logs available yet.".into()]);
    }

    let content = std::fs::read_to_string(&log_path).map_err(|e| e.to_string())?;
    let lines_to_return = lines.unwrap_or(100);

    let log_lines: Vec<String> = content
        .lines()
        .rev()
        .take(lines_to_return)
        .map(String::from)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    Ok(log_lines)
}

/// Stop the backend, then exit.
#[tauri::command]
pub async fn quit_app(
    supervisor: State<'_, BackendSupervisor>,
    app: tauri::AppHandle,
) -> Result<(), String> {
    if let Err(e) = supervisor.stop().await {
        error!("Failed to stop backend on quit: {e}");
    }
    app.exit(0);
    Ok(())
}

/// Converts internal backend state to frontend-facing status.
///
/// Shared by `get_backend_status`, `ui_ready` and state change events.
pub fn build_backend_status(state: &BackendState, pid: Option<u32>) -> BackendStatus {
    let (state_str, endpoint, error, recovery_hint) = match state {
        BackendState::Stopped => ("stopped".to_string(), None, None, None),
        BackendState::Starting => ("starting".to_string(), None, None, None),
        BackendState::Running { endpoint } => ("running".to_string(), Some(*endpoint), None, None),
        BackendState::Stopping => ("stopping".to_string(), None, None, None),
        BackendState::Failed { error } => (
            "failed".to_string(),
            None,
            Some(error.clone()),
            Some("Please check the logs or restart the application.".to_string()),
        ),
    };

    BackendStatus {
        state: state_str,
        port: endpoint.map(|e| e.port),
        backend_url: endpoint.map(|e| e.url()),
        error,
        recovery_hint,
        pid,
    }
}
