use crate::commands::build_backend_status;
use crate::supervisor::{BackendState, ServiceEndpoint};

use std::net::{IpAddr, Ipv4Addr};

const HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[test]
fn running_status_carries_port_and_url() {
    let endpoint = ServiceEndpoint::new(HOST, 8093);
    let status = build_backend_status(&BackendState::Running { endpoint }, Some(4242));

    assert_eq!(status.state, "running");
    assert_eq!(status.port, Some(8093));
    assert_eq!(status.backend_url.as_deref(), Some("http://127.0.0.1:8093/"));
    assert_eq!(status.pid, Some(4242));
    assert_eq!(status.error, None);
    assert_eq!(status.recovery_hint, None);
}

#[test]
fn starting_status_has_no_endpoint_yet() {
    let status = build_backend_status(&BackendState::Starting, Some(4242));

    assert_eq!(status.state, "starting");
    assert_eq!(status.port, None);
    assert_eq!(status.backend_url, None);
    assert_eq!(status.pid, Some(4242));
}

#[test]
fn failed_status_carries_error_and_hint() {
    let state = BackendState::Failed {
        error: "no port in 8090-8099 (base 8090) answered".into(),
    };
    let status = build_backend_status(&state, None);

    assert_eq!(status.state, "failed");
    assert_eq!(status.port, None);
    assert_eq!(
        status.error.as_deref(),
        Some("no port in 8090-8099 (base 8090) answered")
    );
    assert!(status.recovery_hint.is_some());
}

#[test]
fn stopped_and_stopping_statuses_are_bare() {
    let stopped = build_backend_status(&BackendState::Stopped, None);
    assert_eq!(stopped.state, "stopped");
    assert_eq!(stopped.pid, None);
    assert_eq!(stopped.backend_url, None);

    let stopping = build_backend_status(&BackendState::Stopping, Some(4242));
    assert_eq!(stopping.state, "stopping");
    assert_eq!(stopping.port, None);
}
