//! TCP readiness probing
//!
//! Servers bind their listening socket an environment-dependent amount of
//! time after the process starts, so the prober keeps retrying on every
//! connect error until an overall deadline rather than failing fast.

use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep, timeout};

use crate::error::{TesterError, TesterResult};
use shared::{Component, component_debug, component_info};

/// Default delay between connection attempts
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

/// Endpoint and deadline for a readiness wait
#[derive(Debug, Clone)]
pub struct ReadinessTarget {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl ReadinessTarget {
    pub fn new<S: Into<String>>(host: S, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub struct ReadinessProber {
    backoff: Duration,
}

impl ReadinessProber {
    pub fn new() -> Self {
        Self {
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Block until `target` accepts a TCP connection.
    ///
    /// Returns the number of attempts made. Each attempt is bounded by the
    /// remaining deadline, so the wait never outlives `target.timeout` by more
    /// than scheduling jitter.
    pub async fn wait_ready(&self, target: &ReadinessTarget) -> TesterResult<u32> {
        let address = target.address();
        let deadline = Instant::now() + target.timeout;
        let mut attempts = 0u32;

        component_info!(
            Component::Tester,
            "🔌 Attempting to connect to {} (may take some time)",
            address
        );

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            attempts += 1;
            match timeout(remaining, TcpStream::connect(&address)).await {
                Ok(Ok(stream)) => {
                    // Liveness probe only; close straight away
                    drop(stream);
                    component_info!(
                        Component::Tester,
                        "🤝 Connection to {} established after {} attempt(s)",
                        address,
                        attempts
                    );
                    return Ok(attempts);
                }
                Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                    component_debug!(Component::Tester, "{} not listening yet", address);
                }
                Ok(Err(e)) => {
                    component_debug!(Component::Tester, "Transient connect error on {}: {}", address, e);
                }
                Err(_) => break,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            sleep(self.backoff.min(remaining)).await;
        }

        Err(TesterError::timeout(
            format!("{address} to accept connections"),
            target.timeout,
        ))
    }
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tokio::net::TcpListener;

    /// Reserve a port and release it so nothing is listening there
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_ready_when_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let target = ReadinessTarget::new("127.0.0.1", port, Duration::from_secs(2));
        let attempts = ReadinessProber::new().wait_ready(&target).await.unwrap();
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_deadline_enforced_on_closed_port() {
        let port = closed_port().await;
        let deadline = Duration::from_millis(600);
        let target = ReadinessTarget::new("127.0.0.1", port, deadline);

        let started = std::time::Instant::now();
        let result = ReadinessProber::new()
            .with_backoff(Duration::from_millis(50))
            .wait_ready(&target)
            .await;
        let elapsed = started.elapsed();

        assert_matches!(result, Err(TesterError::Timeout { .. }));
        assert!(elapsed >= deadline, "returned early after {elapsed:?}");
        assert!(elapsed < deadline + Duration::from_millis(500), "overran deadline: {elapsed:?}");
    }

    #[tokio::test]
    async fn test_becomes_ready_after_late_bind() {
        let port = closed_port().await;

        let binder = tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            // Keep the socket open long enough for the probe to connect
            sleep(Duration::from_secs(2)).await;
            drop(listener);
        });

        let target = ReadinessTarget::new("127.0.0.1", port, Duration::from_secs(5));
        let attempts = ReadinessProber::new()
            .with_backoff(Duration::from_millis(50))
            .wait_ready(&target)
            .await
            .unwrap();
        assert!(attempts > 1);

        binder.abort();
    }
}
