use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default wait for the vehicle's first heartbeat and for every ack.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(6);

/// Environment variable overriding the bind host.
pub const HOST_ENV: &str = "FLIGHT_LINK_HOST";

/// Environment variable overriding both timeouts (milliseconds).
pub const TIMEOUT_ENV: &str = "FLIGHT_LINK_TIMEOUT_MS";

/// Link settings shared by every operation of a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// Local address the session listens on; the vehicle address is the port.
    pub host: IpAddr,
    /// Maximum wait for the first heartbeat.
    pub heartbeat_timeout: Duration,
    /// Maximum wait for each acknowledgment.
    pub ack_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            heartbeat_timeout: DEFAULT_TIMEOUT,
            ack_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl LinkConfig {
    /// Defaults overridden by `FLIGHT_LINK_HOST` and `FLIGHT_LINK_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(HOST_ENV) {
            match raw.trim().parse() {
                Ok(host) => config.host = host,
                Err(_) => crate::log_warn!("Ignoring invalid {}: {}", HOST_ENV, raw),
            }
        }

        if let Some(raw) = lookup(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => config = config.with_timeout(Duration::from_millis(ms)),
                _ => crate::log_warn!("Ignoring invalid {}: {}", TIMEOUT_ENV, raw),
            }
        }

        config
    }

    /// Loopback host, handy for a vehicle on the same machine.
    pub fn loopback() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            ..Self::default()
        }
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set both the heartbeat and the ack timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self.ack_timeout = timeout;
        self
    }
}

/// Whole seconds used in user-facing timeout messages (rounded up).
pub(crate) fn timeout_secs(timeout: Duration) -> u64 {
    let secs = timeout.as_secs();
    if timeout.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(6));
        assert_eq!(config.ack_timeout, Duration::from_secs(6));
    }

    #[test]
    fn test_env_overrides() {
        let config = LinkConfig::from_lookup(|key| match key {
            HOST_ENV => Some("127.0.0.1".to_string()),
            TIMEOUT_ENV => Some("1500".to_string()),
            _ => None,
        });
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.heartbeat_timeout, Duration::from_millis(1500));
        assert_eq!(config.ack_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn test_invalid_env_falls_back() {
        let config = LinkConfig::from_lookup(|key| match key {
            HOST_ENV => Some("not-an-ip".to_string()),
            TIMEOUT_ENV => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config, LinkConfig::default());
    }

    #[test]
    fn test_timeout_secs_rounds_up() {
        assert_eq!(timeout_secs(Duration::from_secs(6)), 6);
        assert_eq!(timeout_secs(Duration::from_millis(1500)), 2);
    }
}
