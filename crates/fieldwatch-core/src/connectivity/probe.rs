//! Platform connectivity signals.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

use super::Connectivity;

/// Source of online/offline readings.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> Connectivity;
}

/// Treats the remote as reachable when a TCP connection to it opens in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpProbe {
    address: String,
    timeout: Duration,
}

impl TcpProbe {
    /// `address` is a `host:port` pair.
    pub fn new(address: impl Into<String>, timeout: Duration) -> Self {
        Self {
            address: address.into(),
            timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn check(&self) -> Connectivity {
        match tokio::time::timeout(self.timeout, TcpStream::connect(self.address.as_str())).await {
            Ok(Ok(_stream)) => Connectivity::Online,
            Ok(Err(error)) => {
                tracing::debug!("Probe to {} failed: {error}", self.address);
                Connectivity::Offline
            }
            Err(_) => {
                tracing::debug!("Probe to {} timed out", self.address);
                Connectivity::Offline
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn reachable_listener_reads_online() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let probe = TcpProbe::new(address, Duration::from_secs(2));
        assert_eq!(probe.check().await, Connectivity::Online);
    }

    #[tokio::test]
    async fn closed_port_reads_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let probe = TcpProbe::new(address, Duration::from_secs(2));
        assert_eq!(probe.check().await, Connectivity::Offline);
    }
}
