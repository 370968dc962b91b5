//! Node configuration, loaded from `CHORD_*` environment variables.
//!
//! Invalid values are configuration errors and abort startup; a missing
//! variable falls back to its default.

use anyhow::{bail, Result};
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::chord::hashing::DEFAULT_M_BITS;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_STORAGE_PATH: &str = "/app/storage";
const DEFAULT_STABILIZE_SECS: f64 = 2.0;
const DEFAULT_RPC_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Advertised hostname of this node; together with `port` it is hashed
    /// into the node id, so it must be the address peers can reach.
    pub host: String,
    pub port: u16,
    pub bootstrap_host: Option<String>,
    pub bootstrap_port: Option<u16>,
    /// Identifier-space width in bits. Every node of a ring must agree.
    pub m_bits: u8,
    pub stabilize_period: Duration,
    pub rpc_timeout: Duration,
    pub storage_path: PathBuf,
    pub max_body_bytes: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let host = env_or("CHORD_HOST", DEFAULT_HOST.to_string())?;
        let port = env_or("CHORD_PORT", DEFAULT_PORT)?;
        let bootstrap_host: Option<String> = env_opt("CHORD_BOOTSTRAP_HOST")?;
        let bootstrap_port: Option<u16> = env_opt("CHORD_BOOTSTRAP_PORT")?;

        if bootstrap_host.is_some() != bootstrap_port.is_some() {
            bail!("CHORD_BOOTSTRAP_HOST and CHORD_BOOTSTRAP_PORT must be set together");
        }

        let m_bits: u8 = env_or("CHORD_M", DEFAULT_M_BITS)?;
        if !(1..=32).contains(&m_bits) {
            bail!("CHORD_M must be between 1 and 32, got {}", m_bits);
        }

        let stabilize_secs: f64 = env_or("CHORD_STABILIZE_PERIOD", DEFAULT_STABILIZE_SECS)?;
        if !stabilize_secs.is_finite() || stabilize_secs <= 0.0 {
            bail!("CHORD_STABILIZE_PERIOD must be positive, got {}", stabilize_secs);
        }

        let rpc_timeout_secs: f64 = env_or("CHORD_RPC_TIMEOUT", DEFAULT_RPC_TIMEOUT_SECS)?;
        if !rpc_timeout_secs.is_finite() || rpc_timeout_secs <= 0.0 {
            bail!("CHORD_RPC_TIMEOUT must be positive, got {}", rpc_timeout_secs);
        }

        Ok(Self {
            host,
            port,
            bootstrap_host,
            bootstrap_port,
            m_bits,
            stabilize_period: Duration::from_secs_f64(stabilize_secs),
            rpc_timeout: Duration::from_secs_f64(rpc_timeout_secs),
            storage_path: PathBuf::from(env_or(
                "CHORD_STORAGE_PATH",
                DEFAULT_STORAGE_PATH.to_string(),
            )?),
            max_body_bytes: env_or("CHORD_MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?,
        })
    }

    /// Advertised `host:port` of this node.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address of the node to join through, if any.
    pub fn bootstrap_address(&self) -> Option<String> {
        match (&self.bootstrap_host, self.bootstrap_port) {
            (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
            _ => None,
        }
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(value),
            Err(e) => bail!("invalid {}={:?}: {}", key, raw, e),
        },
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(e) => bail!("cannot read {}: {}", key, e),
    }
}

fn env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Ok(Some(value)),
            Err(e) => bail!("invalid {}={:?}: {}", key, raw, e),
        },
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => bail!("cannot read {}: {}", key, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            host: "node-1".to_string(),
            port: 5000,
            bootstrap_host: None,
            bootstrap_port: None,
            m_bits: 10,
            stabilize_period: Duration::from_secs(2),
            rpc_timeout: Duration::from_secs(5),
            storage_path: PathBuf::from("/tmp/chord"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    #[test]
    fn test_address_formatting() {
        assert_eq!(settings().address(), "node-1:5000");
    }

    #[test]
    fn test_bootstrap_requires_both_parts() {
        let mut s = settings();
        assert_eq!(s.bootstrap_address(), None);

        s.bootstrap_host = Some("seed".to_string());
        s.bootstrap_port = Some(5000);
        assert_eq!(s.bootstrap_address(), Some("seed:5000".to_string()));
    }
}
