//! Fire-and-forget notifications from the supervisor to the UI layer.

use crate::supervisor::ServiceEndpoint;

use serde::Serialize;

/// Payload for the terminal "backend cannot be reached" notification.
#[derive(Debug, Clone, Serialize)]
pub struct UnreachableNotice {
    /// Human-readable summary shown to the user
    pub message: String,
    /// The underlying error
    pub cause: String,
    /// Remediation hint
    pub suggestion: String,
}

/// Sink for supervisor notifications.
///
/// Implementations must not block: delivery is fire-and-forget and runs
/// on the supervisor's own task.
pub trait Notifier: Send + Sync {
    /// A discovery sweep found (or re-found) the backend endpoint.
    fn endpoint_known(&self, endpoint: ServiceEndpoint);

    /// A restart attempt failed; the supervisor keeps retrying on later
    /// ticks but the user should be told each time.
    fn backend_unreachable(&self, notice: &UnreachableNotice);
}
