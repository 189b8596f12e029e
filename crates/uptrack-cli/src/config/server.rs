//! Listener address, drain period and TLS material.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
#[cfg(feature = "tls")]
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Where the API listens and how long it drains on shutdown.
///
/// ```bash
/// uptrack --host 0.0.0.0 --port 8080
/// HOST=0.0.0.0 PORT=8080 uptrack
/// ```
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value_t = DEFAULT_HOST)]
    pub host: IpAddr,

    /// Port to listen on, 1024 or above
    #[arg(short = 'p', long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds in-flight requests get to finish after SIGINT or SIGTERM (1-300)
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECS", default_value_t = DEFAULT_SHUTDOWN_TIMEOUT_SECS)]
    pub shutdown_timeout_secs: u64,

    /// PEM certificate chain; serving switches to HTTPS when set with the key
    #[cfg(feature = "tls")]
    #[arg(long, env = "TLS_CERT_PATH", requires = "tls_key_path")]
    pub tls_cert_path: Option<PathBuf>,

    /// PEM private key matching the certificate
    #[cfg(feature = "tls")]
    #[arg(long, env = "TLS_KEY_PATH", requires = "tls_cert_path")]
    pub tls_key_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            #[cfg(feature = "tls")]
            tls_cert_path: None,
            #[cfg(feature = "tls")]
            tls_key_path: None,
        }
    }
}

impl ServerConfig {
    #[inline]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    #[inline]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Certificate and key, when both are configured.
    #[cfg(feature = "tls")]
    pub fn tls_paths(&self) -> Option<(&Path, &Path)> {
        Some((self.tls_cert_path.as_deref()?, self.tls_key_path.as_deref()?))
    }

    pub fn is_tls_enabled(&self) -> bool {
        #[cfg(feature = "tls")]
        {
            self.tls_paths().is_some()
        }
        #[cfg(not(feature = "tls"))]
        {
            false
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.port < 1024 {
            return Err(format!("port {} needs root; pick 1024 or above", self.port));
        }

        if !(1..=300).contains(&self.shutdown_timeout_secs) {
            return Err(format!(
                "shutdown timeout of {}s is outside 1-300",
                self.shutdown_timeout_secs
            ));
        }

        #[cfg(feature = "tls")]
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("TLS needs both a certificate and a key".to_owned());
        }

        Ok(())
    }

    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            addr = %self.server_addr(),
            all_interfaces = self.host.is_unspecified(),
            shutdown_timeout_secs = self.shutdown_timeout_secs,
            tls = self.is_tls_enabled(),
            "Server configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_listen_on_loopback() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_tls_enabled());
        assert_eq!(config.server_addr(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn privileged_ports_are_rejected() {
        let config = ServerConfig {
            port: 443,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err_and(|e| e.contains("443")));
    }

    #[test]
    fn shutdown_timeout_is_bounded() {
        for (secs, ok) in [(0, false), (1, true), (300, true), (301, false)] {
            let config = ServerConfig {
                shutdown_timeout_secs: secs,
                ..ServerConfig::default()
            };
            assert_eq!(config.validate().is_ok(), ok, "{secs}s");
        }
    }

    #[cfg(feature = "tls")]
    #[test]
    fn tls_needs_both_files() {
        let config = ServerConfig {
            tls_cert_path: Some(PathBuf::from("cert.pem")),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
        assert!(config.tls_paths().is_none());
    }
}
