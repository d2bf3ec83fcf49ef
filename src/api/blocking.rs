//! Purpose: Synchronous facade for callers without an async runtime.
//! Exports: `BlockingClient`.
//! Role: Owns a small tokio runtime and blocks on the async `Client` per call.
//! Invariants: Construction blocks until the channel is ready or the connect timeout elapses.
//! Invariants: Safe to share across threads; each caller blocks only on its own call.
//! Invariants: Must not be created or dropped from inside an async context.
#![allow(clippy::result_large_err)]

use std::path::PathBuf;
use std::time::Duration;

use tokio::runtime::Runtime;

use super::client::{ApiResult, Client};
use super::config::{CallOptions, ClientConfig};
use super::transport::{DbService, GrpcTransport};
use crate::core::error::{Error, ErrorKind};
use crate::core::tuple::{TableStats, TimeRange, Tuple};

const RUNTIME_THREADS: usize = 2;

pub struct BlockingClient<T = GrpcTransport> {
    // Dropped before the runtime that drives its connection.
    client: Client<T>,
    runtime: Runtime,
}

impl BlockingClient<GrpcTransport> {
    /// Connects to `host:port`, verifying the server against the PEM trust root at
    /// `ca_cert_path`, with the default connect and call timeouts.
    pub fn connect(
        host: impl Into<String>,
        ca_cert_path: impl Into<PathBuf>,
        port: u16,
    ) -> ApiResult<Self> {
        Self::connect_with(ClientConfig::new(host, port, ca_cert_path))
    }

    pub fn connect_with(config: ClientConfig) -> ApiResult<Self> {
        let runtime = build_runtime()?;
        let client = runtime.block_on(Client::connect(config))?;
        Ok(Self { client, runtime })
    }
}

impl<T: DbService> BlockingClient<T> {
    pub fn with_transport(transport: T, call_timeout: Duration) -> ApiResult<Self> {
        let runtime = build_runtime()?;
        let client = Client::with_transport(transport, call_timeout);
        Ok(Self { client, runtime })
    }

    pub fn client(&self) -> &Client<T> {
        &self.client
    }

    pub fn append(&self, table: &str, tuple: Tuple) -> ApiResult<()> {
        self.runtime.block_on(self.client.append(table, tuple))
    }

    pub fn append_with(&self, table: &str, tuple: Tuple, options: &CallOptions) -> ApiResult<()> {
        self.runtime
            .block_on(self.client.append_with(table, tuple, options))
    }

    pub fn query(&self, table: &str, range: impl Into<TimeRange>) -> ApiResult<Vec<Tuple>> {
        self.runtime.block_on(self.client.query(table, range))
    }

    pub fn query_with(
        &self,
        table: &str,
        range: impl Into<TimeRange>,
        options: &CallOptions,
    ) -> ApiResult<Vec<Tuple>> {
        self.runtime
            .block_on(self.client.query_with(table, range, options))
    }

    pub fn stats(&self, table: &str) -> ApiResult<TableStats> {
        self.runtime.block_on(self.client.stats(table))
    }

    pub fn stats_with(&self, table: &str, options: &CallOptions) -> ApiResult<TableStats> {
        self.runtime.block_on(self.client.stats_with(table, options))
    }

    pub fn list_tables(&self) -> ApiResult<Vec<String>> {
        self.runtime.block_on(self.client.list_tables())
    }

    pub fn list_tables_with(&self, options: &CallOptions) -> ApiResult<Vec<String>> {
        self.runtime.block_on(self.client.list_tables_with(options))
    }

    pub fn purge(&self, table: &str) -> ApiResult<()> {
        self.runtime.block_on(self.client.purge(table))
    }

    pub fn purge_with(&self, table: &str, options: &CallOptions) -> ApiResult<()> {
        self.runtime.block_on(self.client.purge_with(table, options))
    }
}

fn build_runtime() -> Result<Runtime, Error> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(RUNTIME_THREADS)
        .thread_name("appenddb-client")
        .enable_all()
        .build()
        .map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to start client runtime")
                .with_source(err)
        })
}
