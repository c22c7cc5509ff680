//! Single-shot HTTP health probes.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a single probe failed.
///
/// The variants exist for log output only; control flow treats every
/// failure the same. Retry policy lives one layer up, in the health loop.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP {status}")]
    Status { status: u16 },
    #[error("request timed out")]
    Timeout,
    #[error("connect failed: {0}")]
    Connect(String),
}

/// One health-check request against a candidate endpoint.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: IpAddr, port: u16) -> Result<(), ProbeError>;
}

/// HTTP GET to the service root; healthy means status 200 within the
/// configured timeout, nothing else.
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(1)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[async_trait]
impl Prober for HttpProbe {
    async fn probe(&self, host: IpAddr, port: u16) -> Result<(), ProbeError> {
        let url = format!("http://{host}:{port}/");

        match self.client.get(&url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => Ok(()),
            Ok(resp) => Err(ProbeError::Status {
                status: resp.status().as_u16(),
            }),
            Err(e) if e.is_timeout() => Err(ProbeError::Timeout),
            Err(e) => Err(ProbeError::Connect(e.to_string())),
        }
    }
}
