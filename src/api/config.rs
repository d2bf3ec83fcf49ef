//! Purpose: Connection and per-call settings for the client facade.
//! Exports: `ClientConfig`, `CallOptions`, default timeout constants.
//! Role: Replaces hidden timeout constants with explicit, defaulted configuration.
//! Invariants: Defaults are 5s to establish the channel and 3s per call.
//! Invariants: Each call derives its own deadline; nothing here is shared mutable state.
#![allow(clippy::result_large_err)]

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    pub ca_cert_path: PathBuf,
    pub connect_timeout: Duration,
    pub call_timeout: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16, ca_cert_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port,
            ca_cert_path: ca_cert_path.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn ca_cert_path(&self) -> &Path {
        &self.ca_cert_path
    }

    /// `https://host:port`, bracketing IPv6 literals.
    pub fn endpoint_uri(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(addr)) => format!("https://[{addr}]:{}", self.port),
            _ => format!("https://{}:{}", self.host, self.port),
        }
    }

    pub(crate) fn validate(&self) -> Result<(), Error> {
        if self.host.is_empty() {
            return Err(Error::new(ErrorKind::Usage).with_message("host must not be empty"));
        }
        if self.port == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message("port must be non-zero"));
        }
        ensure_nonzero(self.connect_timeout, "connect timeout")?;
        ensure_nonzero(self.call_timeout, "call timeout")
    }
}

/// Per-call overrides. The default uses the client's call timeout and no cancellation.
#[derive(Clone, Debug, Default)]
pub struct CallOptions {
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn effective_timeout(&self, default: Duration) -> Result<Duration, Error> {
        let timeout = self.timeout.unwrap_or(default);
        ensure_nonzero(timeout, "call timeout")?;
        Ok(timeout)
    }
}

fn ensure_nonzero(timeout: Duration, what: &str) -> Result<(), Error> {
    if timeout.is_zero() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{what} must be non-zero")));
    }
    Ok(())
}
