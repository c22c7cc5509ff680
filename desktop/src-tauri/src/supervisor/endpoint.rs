use std::fmt;
use std::net::IpAddr;

use serde::Serialize;

/// Address the running backend answers on.
///
/// `None` until the first successful probe. Recomputed on every successful
/// discovery sweep and handed to the UI layer by value, never by reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceEndpoint {
    pub host: IpAddr,
    pub port: u16,
}

impl ServiceEndpoint {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    /// Root URL the backend serves the player UI and API on.
    pub fn url(&self) -> String {
        format!("http://{}:{}/", self.host, self.port)
    }
}

impl fmt::Display for ServiceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Inclusive port window searched during discovery.
///
/// Invariant: `min <= base <= max` (checked by config validation).
/// Discovery probes `base, base+1, .., max` in order and never wraps
/// below `base`: the backend allocates upward from the same base, so
/// ports in `min..base` can only belong to something else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSearchRange {
    pub min: u16,
    pub max: u16,
    pub base: u16,
}

impl PortSearchRange {
    pub fn new(min: u16, max: u16, base: u16) -> Self {
        Self { min, max, base }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.base && self.base <= self.max
    }

    /// Ports in probe order.
    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.base..=self.max
    }

    /// Number of ports a full sweep will probe.
    pub fn sweep_len(&self) -> usize {
        usize::from(self.max - self.base) + 1
    }
}

impl fmt::Display for PortSearchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{} (base {})", self.min, self.max, self.base)
    }
}
