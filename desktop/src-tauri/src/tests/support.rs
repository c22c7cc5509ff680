//! Shared test doubles for supervisor tests.

use crate::supervisor::{Notifier, ProbeError, Prober, ServiceEndpoint, UnreachableNotice};

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Mutex;

use async_trait::async_trait;

/// Prober that answers on a scripted set of ports and records every
/// probe in order.
pub(crate) struct ScriptedProbe {
    answering: Mutex<HashSet<u16>>,
    probed: Mutex<Vec<u16>>,
}

impl ScriptedProbe {
    pub fn answering(ports: &[u16]) -> Self {
        Self {
            answering: Mutex::new(ports.iter().copied().collect()),
            probed: Mutex::new(Vec::new()),
        }
    }

    pub fn set_answering(&self, ports: &[u16]) {
        *self.answering.lock().unwrap() = ports.iter().copied().collect();
    }

    pub fn probed(&self) -> Vec<u16> {
        self.probed.lock().unwrap().clone()
    }

    pub fn clear_probed(&self) {
        self.probed.lock().unwrap().clear();
    }
}

#[async_trait]
impl Prober for ScriptedProbe {
    async fn probe(&self, _host: IpAddr, port: u16) -> Result<(), ProbeError> {
        self.probed.lock().unwrap().push(port);

        if self.answering.lock().unwrap().contains(&port) {
            Ok(())
        } else {
            Err(ProbeError::Connect("connection refused".into()))
        }
    }
}

/// Notifier that records every notification.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub endpoints: Mutex<Vec<ServiceEndpoint>>,
    pub notices: Mutex<Vec<UnreachableNotice>>,
}

impl Notifier for RecordingNotifier {
    fn endpoint_known(&self, endpoint: ServiceEndpoint) {
        self.endpoints.lock().unwrap().push(endpoint);
    }

    fn backend_unreachable(&self, notice: &UnreachableNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
