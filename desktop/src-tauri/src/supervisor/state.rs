use crate::supervisor::ServiceEndpoint;

/// Current lifecycle state of the supervised backend process.
///
/// Transitions happen only inside the supervisor; everyone else reads
/// a copy through the watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendState {
    /// Backend is not running
    Stopped,
    /// Backend process spawned, endpoint not yet discovered
    Starting,
    /// Backend is running and answered a probe on `endpoint`
    Running { endpoint: ServiceEndpoint },
    /// Graceful shutdown in progress
    Stopping,
    /// Start or restart failed; the health loop keeps retrying
    Failed { error: String },
}
