use serde::Serialize;

/// Backend status snapshot for frontend display.
#[derive(Debug, Clone, Serialize)]
pub struct BackendStatus {
    pub state: String,
    pub port: Option<u16>,
    pub backend_url: Option<String>,
    pub error: Option<String>,
    pub recovery_hint: Option<String>,
    pub pid: Option<u32>,
}
