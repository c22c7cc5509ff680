//! System tray with status indicator and menu.

use crate::supervisor::{BackendState, BackendSupervisor};
use crate::window::{WindowUiState, apply_always_on_top};

use std::sync::Arc;

use tauri::{
    AppHandle, Manager, Wry,
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
};

const TRAY_ID: &str = "main";

/// Manages the system tray and its state.
pub struct TrayManager {
    status_item: MenuItem<Wry>,
}

impl TrayManager {
    /// Create and setup the system tray.
    pub fn setup(app: &tauri::App) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        // Create menu items
        let show_item = MenuItem::with_id(app, "show", "Show Window", true, None::<&str>)?;
        let status_item =
            MenuItem::with_id(app, "status", "Status: Starting...", false, None::<&str>)?;

        let separator1 = PredefinedMenuItem::separator(app)?;
        let pin_item = MenuItem::with_id(app, "pin", "Always on Top", true, None::<&str>)?;
        let restart_item =
            MenuItem::with_id(app, "restart", "Restart Backend", true, None::<&str>)?;
        let logs_item = MenuItem::with_id(app, "logs", "View Logs...", true, None::<&str>)?;
        let separator2 = PredefinedMenuItem::separator(app)?;
        let quit_item = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;

        // Build menu
        let menu = Menu::with_items(
            app,
            &[
                &show_item,
                &status_item,
                &separator1,
                &pin_item,
                &restart_item,
                &logs_item,
                &separator2,
                &quit_item,
            ],
        )?;

        let pin_item_handle = pin_item.clone();

        // Create tray icon
        let _tray = TrayIconBuilder::with_id(TRAY_ID)
            .icon(app.default_window_icon().unwrap().clone())
            .menu(&menu)
            .tooltip("MultipleLive")
            .show_menu_on_left_click(false)
            .on_menu_event(move |app, event| match event.id.as_ref() {
                "show" => {
                    if let Some(window) = app.get_webview_window("main") {
                        window.show().ok();
                        window.set_focus().ok();
                    }
                }
                "pin" => {
                    if let Some(ui_state) = app.try_state::<WindowUiState>() {
                        let on_top = apply_always_on_top(app, &ui_state);
                        let label = if on_top {
                            "Always on Top \u{2713}"
                        } else {
                            "Always on Top"
                        };
                        pin_item_handle.set_text(label).ok();
                    }
                }
                "restart" => {
                    let app_handle = app.clone();
                    tauri::async_runtime::spawn(async move {
                        if let Some(supervisor) = app_handle.try_state::<BackendSupervisor>() {
                            if let Err(e) = supervisor.stop().await {
                                tracing::error!("Failed to stop backend: {}", e);
                            }
                            if let Err(e) = supervisor.start().await {
                                tracing::error!("Failed to restart backend: {}", e);
                            }
                        }
                    });
                }
                "logs" => {
                    if let Ok(data_dir) = app.path().app_data_dir() {
                        let logs_dir = data_dir.join(crate::TAURI_DATA_DIR).join("logs");
                        open_directory(&logs_dir);
                    }
                }
                "quit" => {
                    let app_handle = app.clone();
                    tauri::async_runtime::spawn(async move {
                        if let Some(supervisor) = app_handle.try_state::<BackendSupervisor>() {
                            let _ = supervisor.stop().await;
                        }
                        app_handle.exit(0);
                    });
                }
                _ => {}
            })
            .on_tray_icon_event(|tray, event| {
                // Show window on left click
                if let TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                } = event
                {
                    if let Some(window) = tray.app_handle().get_webview_window("main") {
                        window.show().ok();
                        window.set_focus().ok();
                    }
                }
            })
            .build(app.app_handle())?;

        Ok(Arc::new(Self { status_item }))
    }

    /// Update tray status text based on backend state.
    pub fn update_status(&self, app: &AppHandle, state: &BackendState) {
        let (status_text, tooltip) = match state {
            BackendState::Stopped => (
                "Status: Stopped".to_string(),
                "MultipleLive - Stopped".to_string(),
            ),
            BackendState::Starting => (
                "Status: Starting...".to_string(),
                "MultipleLive - Starting...".to_string(),
            ),
            BackendState::Running { endpoint } => (
                format!("Status: Running (port {})", endpoint.port),
                format!("MultipleLive - Running on port {}", endpoint.port),
            ),
            BackendState::Stopping => (
                "Status: Stopping...".to_string(),
                "MultipleLive - Stopping...".to_string(),
            ),
            BackendState::Failed { error } => (
                "Status: Failed".to_string(),
                format!("MultipleLive - Failed: {}", error),
            ),
        };

        let _ = self.status_item.set_text(&status_text);

        // Update tray tooltip
        if let Some(tray) = app.tray_by_id(TRAY_ID) {
            let _ = tray.set_tooltip(Some(&tooltip));
        }

        tracing::debug!("Tray status updated: {}", status_text);
    }
}

/// Open a directory in the system file manager.
fn open_directory(path: &std::path::Path) {
    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open").arg(path).spawn().ok();
    }
    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("explorer")
            .arg(path)
            .spawn()
            .ok();
    }
    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(path)
            .spawn()
            .ok();
    }
}
