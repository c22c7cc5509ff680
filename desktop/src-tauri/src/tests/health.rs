use crate::supervisor::{HttpProbe, ProbeError, Prober};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

async fn mock_root(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn probe_succeeds_on_http_200() {
    let server = mock_root(200).await;
    let probe = HttpProbe::new(Duration::from_millis(500));

    assert!(probe.probe(HOST, server.address().port()).await.is_ok());
}

#[tokio::test]
async fn probe_fails_on_server_error() {
    let server = mock_root(500).await;
    let probe = HttpProbe::new(Duration::from_millis(500));

    let err = probe
        .probe(HOST, server.address().port())
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Status { status: 500 }));
}

#[tokio::test]
async fn probe_fails_on_not_found() {
    // Only status 200 counts as healthy.
    let server = mock_root(404).await;
    let probe = HttpProbe::new(Duration::from_millis(500));

    let err = probe
        .probe(HOST, server.address().port())
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Status { status: 404 }));
}

#[tokio::test]
async fn probe_fails_on_connection_refused() {
    // Bind and immediately release a port so nothing listens on it.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let probe = HttpProbe::new(Duration::from_millis(500));
    assert!(probe.probe(HOST, port).await.is_err());
}

#[tokio::test]
async fn probe_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let probe = HttpProbe::new(Duration::from_millis(50));
    let err = probe
        .probe(HOST, server.address().port())
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::Timeout));
}
