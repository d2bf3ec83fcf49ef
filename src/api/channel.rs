//! Purpose: Establish the single authenticated channel a client owns.
//! Exports: `establish`, `load_trust_root`.
//! Role: Loads the trust root, configures TLS for the target host, and connects eagerly.
//! Invariants: Fails with a typed error; never exits the process or returns a half-open channel.
//! Invariants: The server name verified during the handshake is the host being dialed.
//! Invariants: Establishment is bounded by the configured connect timeout.
#![allow(clippy::result_large_err)]

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};

use super::config::ClientConfig;
use super::executor::saturating_millis;
use crate::core::error::{Error, ErrorKind, map_io_error_kind};

pub async fn establish(config: &ClientConfig) -> Result<Channel, Error> {
    config.validate()?;
    let pem = load_trust_root(config.ca_cert_path())?;
    let endpoint = build_endpoint(config, pem)?;

    let uri = config.endpoint_uri();
    let started = Instant::now();
    match tokio::time::timeout(config.connect_timeout, endpoint.connect()).await {
        Ok(Ok(channel)) => {
            tracing::info!(
                endpoint = %uri,
                elapsed_ms = saturating_millis(started.elapsed()),
                "channel established"
            );
            Ok(channel)
        }
        Ok(Err(err)) => {
            tracing::warn!(endpoint = %uri, error = %err, "channel establishment failed");
            Err(Error::new(ErrorKind::Connect)
                .with_message(format!("failed to connect to {uri}"))
                .with_source(err))
        }
        Err(_) => {
            tracing::warn!(
                endpoint = %uri,
                timeout_ms = saturating_millis(config.connect_timeout),
                "channel establishment timed out"
            );
            Err(Error::new(ErrorKind::Connect).with_message(format!(
                "timed out connecting to {uri} after {:?}",
                config.connect_timeout
            )))
        }
    }
}

/// Reads a PEM trust root and checks it holds at least one usable certificate.
pub fn load_trust_root(path: &Path) -> Result<Vec<u8>, Error> {
    let pem = std::fs::read(path).map_err(|err| {
        Error::new(map_io_error_kind(&err))
            .with_message("failed to read trust root certificate")
            .with_path(path)
            .with_source(err)
    })?;

    let certs = rustls_pemfile::certs(&mut Cursor::new(&pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| {
            Error::new(ErrorKind::Tls)
                .with_message("failed to parse trust root certificate")
                .with_path(path)
                .with_source(err)
        })?;
    if certs.is_empty() {
        return Err(Error::new(ErrorKind::Tls)
            .with_message("trust root file contains no certificates")
            .with_path(path));
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, _) = roots.add_parsable_certificates(certs);
    if added == 0 {
        return Err(Error::new(ErrorKind::Tls)
            .with_message("trust root file contains no parsable certificates")
            .with_path(path));
    }
    Ok(pem)
}

fn build_endpoint(config: &ClientConfig, pem: Vec<u8>) -> Result<Endpoint, Error> {
    let tls = ClientTlsConfig::new()
        .ca_certificate(Certificate::from_pem(pem))
        .domain_name(config.host.clone());
    let endpoint = Endpoint::from_shared(config.endpoint_uri()).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message(format!("invalid endpoint {}", config.endpoint_uri()))
            .with_source(err)
    })?;
    let endpoint = endpoint.tls_config(tls).map_err(|err| {
        Error::new(ErrorKind::Tls)
            .with_message("failed to configure TLS")
            .with_path(config.ca_cert_path())
            .with_source(err)
    })?;
    Ok(endpoint.connect_timeout(config.connect_timeout))
}
