mod config;
mod discovery;
mod endpoint;
mod error;
mod health;
mod lifecycle;
mod notify;
mod state;
mod status;

pub use config::{
    BackendSettings, CONFIG_VERSION, HealthSettings, LoggingSettings, SupervisorConfig,
};
pub use endpoint::{PortSearchRange, ServiceEndpoint};
pub use error::{Result as SupervisorResult, SupervisorError};
pub use health::{HttpProbe, ProbeError, Prober};
pub use lifecycle::BackendSupervisor;
pub use notify::{Notifier, UnreachableNotice};
pub use state::BackendState;
pub use status::BackendStatus;

pub(crate) use discovery::{discover, parse_port_hint};
