use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::time::Duration;

use anyhow::bail;
use thiserror::Error;
use tracing::{info, warn};

use garage_common::{ConnectionState, NetworkConfig};

pub const CONNECT_ATTEMPTS: u32 = 5;
const ASSOCIATED_SETTLE: Duration = Duration::from_secs(2);
const CONNECTION_ERROR_BACKOFF: Duration = Duration::from_secs(5);
const OTHER_ERROR_BACKOFF: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("association failed: {0}")]
    Connection(String),
    #[error("link fault: {0}")]
    Other(String),
}

/// One network attachment. The station radio on the device target; a plain
/// route probe on hosted runs.
pub trait NetworkLink: Send {
    /// A single association attempt. Success does not guarantee the
    /// interface is usable yet; the supervisor re-probes after a settle.
    fn associate(&mut self) -> Result<(), LinkError>;

    fn is_up(&self) -> bool;

    fn ip_address(&self) -> Option<IpAddr>;
}

/// Brings the link up with a bounded retry budget and answers liveness
/// probes for the serve loop. Terminal failure here has exactly one recovery
/// path: the device supervisor restarts the whole process.
pub struct ConnectionSupervisor {
    link: Box<dyn NetworkLink>,
    state: ConnectionState,
}

impl ConnectionSupervisor {
    pub fn new(link: Box<dyn NetworkLink>) -> Self {
        Self {
            link,
            state: ConnectionState::Disconnected,
        }
    }

    pub async fn connect(&mut self) -> anyhow::Result<IpAddr> {
        self.state = ConnectionState::Connecting;

        for attempt in 1..=CONNECT_ATTEMPTS {
            info!("connecting to WiFi (attempt {attempt}/{CONNECT_ATTEMPTS})");
            match self.link.associate() {
                Ok(()) => {
                    tokio::time::sleep(ASSOCIATED_SETTLE).await;
                    if self.link.is_up() {
                        self.state = ConnectionState::Connected;
                        let ip = self
                            .link
                            .ip_address()
                            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
                        info!("WiFi connected, device IP {ip}");
                        return Ok(ip);
                    }
                    warn!("association reported success but link is not up");
                }
                Err(err @ LinkError::Connection(_)) => {
                    warn!("WiFi connection error: {err}");
                    if attempt < CONNECT_ATTEMPTS {
                        tokio::time::sleep(CONNECTION_ERROR_BACKOFF).await;
                    }
                }
                Err(err) => {
                    warn!("WiFi connect error: {err}");
                    if attempt < CONNECT_ATTEMPTS {
                        tokio::time::sleep(OTHER_ERROR_BACKOFF).await;
                    }
                }
            }
        }

        self.state = ConnectionState::Failed;
        bail!("failed to connect to WiFi after {CONNECT_ATTEMPTS} attempts");
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_up()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }
}

/// Hosted stand-in for the station radio: association is delegated to the
/// operating system, so this only verifies that a default route exists and
/// reports the address the kernel would source from. `connect` on a UDP
/// socket transmits nothing.
pub struct WlanInterface {
    config: NetworkConfig,
}

impl WlanInterface {
    pub fn new(config: NetworkConfig) -> Self {
        Self { config }
    }

    fn route_probe() -> Option<IpAddr> {
        let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
        socket.connect("8.8.8.8:53").ok()?;
        socket.local_addr().ok().map(|addr| addr.ip())
    }
}

impl NetworkLink for WlanInterface {
    fn associate(&mut self) -> Result<(), LinkError> {
        info!("joining network `{}`", self.config.wifi_ssid);
        match Self::route_probe() {
            Some(_) => Ok(()),
            None => Err(LinkError::Connection("no route to network".to_string())),
        }
    }

    fn is_up(&self) -> bool {
        Self::route_probe().is_some()
    }

    fn ip_address(&self) -> Option<IpAddr> {
        Self::route_probe()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };
    use std::time::Duration;

    use super::*;

    struct ScriptedLink {
        script: VecDeque<Result<(), LinkError>>,
        attempts: Arc<AtomicU32>,
        up: bool,
    }

    impl ScriptedLink {
        fn new(script: Vec<Result<(), LinkError>>, up: bool) -> (Self, Arc<AtomicU32>) {
            let attempts = Arc::new(AtomicU32::new(0));
            (
                Self {
                    script: script.into(),
                    attempts: attempts.clone(),
                    up,
                },
                attempts,
            )
        }
    }

    impl NetworkLink for ScriptedLink {
        fn associate(&mut self) -> Result<(), LinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.script
                .pop_front()
                .unwrap_or_else(|| Err(LinkError::Other("script exhausted".to_string())))
        }

        fn is_up(&self) -> bool {
            self.up
        }

        fn ip_address(&self) -> Option<IpAddr> {
            Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn connects_on_first_attempt_after_settle() {
        let (link, attempts) = ScriptedLink::new(vec![Ok(())], true);
        let mut supervisor = ConnectionSupervisor::new(Box::new(link));

        let started = tokio::time::Instant::now();
        let ip = supervisor.connect().await.unwrap();

        assert_eq!(ip, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(supervisor.state(), ConnectionState::Connected);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_stop_as_soon_as_association_sticks() {
        let (link, attempts) = ScriptedLink::new(
            vec![
                Err(LinkError::Connection("busy".to_string())),
                Err(LinkError::Other("firmware hiccup".to_string())),
                Ok(()),
            ],
            true,
        );
        let mut supervisor = ConnectionSupervisor::new(Box::new(link));

        let started = tokio::time::Instant::now();
        supervisor.connect().await.unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        // 5s connection-class backoff + 3s other-class backoff + 2s settle.
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausting_the_budget_is_terminal() {
        let script = (0..CONNECT_ATTEMPTS)
            .map(|_| Err(LinkError::Connection("no ap".to_string())))
            .collect();
        let (link, attempts) = ScriptedLink::new(script, false);
        let mut supervisor = ConnectionSupervisor::new(Box::new(link));

        let started = tokio::time::Instant::now();
        let err = supervisor.connect().await.unwrap_err();

        assert_eq!(attempts.load(Ordering::SeqCst), CONNECT_ATTEMPTS);
        assert_eq!(supervisor.state(), ConnectionState::Failed);
        assert!(err.to_string().contains("after 5 attempts"));
        // Four backoffs between the five attempts; the terminal error is
        // surfaced immediately after the final failure so the restart fires
        // on schedule.
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn association_without_link_up_keeps_retrying() {
        let script = (0..CONNECT_ATTEMPTS).map(|_| Ok(())).collect();
        let (link, attempts) = ScriptedLink::new(script, false);
        let mut supervisor = ConnectionSupervisor::new(Box::new(link));

        supervisor.connect().await.unwrap_err();
        assert_eq!(attempts.load(Ordering::SeqCst), CONNECT_ATTEMPTS);
    }
}
