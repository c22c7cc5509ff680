//! Window-control commands and explicit window UI state.
//!
//! The always-on-top flag lives here, owned by the window component and
//! shared between the IPC commands and the tray menu, rather than in a
//! mutable global.

use std::sync::atomic::{AtomicBool, Ordering};

use tauri::{Manager, State, WebviewWindow};

#[derive(Default)]
pub struct WindowUiState {
    always_on_top: AtomicBool,
}

impl WindowUiState {
    /// Flip the flag, returning the new value.
    pub fn toggle_always_on_top(&self) -> bool {
        !self.always_on_top.fetch_xor(true, Ordering::SeqCst)
    }
}

#[tauri::command]
pub fn minimize_window(window: WebviewWindow) -> Result<(), String> {
    window.minimize().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn toggle_maximize_window(window: WebviewWindow) -> Result<(), String> {
    if window.is_maximized().map_err(|e| e.to_string())? {
        window.unmaximize().map_err(|e| e.to_string())
    } else {
        window.maximize().map_err(|e| e.to_string())
    }
}

/// The frameless window's close button hides to tray instead of closing.
#[tauri::command]
pub fn hide_window(window: WebviewWindow) -> Result<(), String> {
    window.hide().map_err(|e| e.to_string())
}

#[tauri::command]
pub fn toggle_always_on_top(
    window: WebviewWindow,
    ui_state: State<'_, WindowUiState>,
) -> Result<bool, String> {
    let on_top = ui_state.toggle_always_on_top();
    window
        .set_always_on_top(on_top)
        .map_err(|e| e.to_string())?;
    Ok(on_top)
}

#[tauri::command]
pub fn toggle_fullscreen(window: WebviewWindow) -> Result<(), String> {
    let fullscreen = window.is_fullscreen().map_err(|e| e.to_string())?;
    window
        .set_fullscreen(!fullscreen)
        .map_err(|e| e.to_string())
}

/// Toggle from contexts without a window argument (tray menu).
/// Returns the new flag value.
pub fn apply_always_on_top(app: &tauri::AppHandle, ui_state: &WindowUiState) -> bool {
    let on_top = ui_state.toggle_always_on_top();
    if let Some(window) = app.get_webview_window("main") {
        window.set_always_on_top(on_top).ok();
    }
    on_top
}
