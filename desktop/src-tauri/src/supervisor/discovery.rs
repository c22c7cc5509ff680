//! Port discovery: sequential sweep over the configured search range.

use crate::supervisor::{PortSearchRange, Prober, ServiceEndpoint};

use std::net::IpAddr;

use tracing::{debug, info};

/// Probe every port in the range in order, stopping at the first success.
///
/// Probes run sequentially, never in parallel: the attempt order stays
/// deterministic in the logs and a backend that is still initializing
/// is not hammered with concurrent requests.
pub async fn discover(
    prober: &dyn Prober,
    host: IpAddr,
    range: &PortSearchRange,
) -> Option<ServiceEndpoint> {
    for port in range.ports() {
        match prober.probe(host, port).await {
            Ok(()) => {
                info!("backend answered on port {port}");
                return Some(ServiceEndpoint::new(host, port));
            }
            Err(cause) => {
                debug!("probe {host}:{port} failed: {cause}");
            }
        }
    }

    debug!(
        "discovery sweep over {range} found no answering port ({} probed)",
        range.sweep_len()
    );
    None
}

/// Best-effort extraction of a port announcement from a backend log line.
///
/// The backend prints `... starting on http://127.0.0.1:<port>` on boot.
/// This is a diagnostic side-channel only; the probe sweep above is the
/// source of truth for the bound port.
pub fn parse_port_hint(line: &str) -> Option<u16> {
    let idx = line.find("http://")?;
    let rest = &line[idx + "http://".len()..];
    let colon = rest.find(':')?;

    let digits: &str = {
        let tail = &rest[colon + 1..];
        let end = tail
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map_or(tail.len(), |(i, _)| i);
        &tail[..end]
    };

    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}
