//! Purpose: Async client facade over one established channel.
//! Exports: `Client`.
//! Role: The object callers hold; every method drives exactly one executor call.
//! Invariants: The channel is established once, eagerly, and never re-established.
//! Invariants: Clones share the channel; concurrent calls need no client-side locking.
//! Invariants: No retry, caching, or batching; compose those on top if needed.
#![allow(clippy::result_large_err)]

use std::time::Duration;

use super::channel::establish;
use super::config::{CallOptions, ClientConfig};
use super::executor::Executor;
use super::transport::{DbService, GrpcTransport};
use crate::core::error::Error;
use crate::core::tuple::{TableStats, TimeRange, Tuple};

pub type ApiResult<T> = Result<T, Error>;

pub struct Client<T = GrpcTransport> {
    executor: Executor<T>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            executor: self.executor.clone(),
        }
    }
}

impl Client<GrpcTransport> {
    /// Establishes the TLS channel described by `config`, waiting up to its connect timeout.
    pub async fn connect(config: ClientConfig) -> ApiResult<Self> {
        let channel = establish(&config).await?;
        Ok(Self::with_transport(
            GrpcTransport::new(channel),
            config.call_timeout,
        ))
    }
}

impl<T: DbService> Client<T> {
    pub fn with_transport(transport: T, call_timeout: Duration) -> Self {
        Self {
            executor: Executor::new(transport, call_timeout),
        }
    }

    pub fn call_timeout(&self) -> Duration {
        self.executor.call_timeout()
    }

    pub fn transport(&self) -> &T {
        self.executor.service()
    }

    /// Appends `tuple` to `table`; the server creates the table on first write.
    pub async fn append(&self, table: &str, tuple: Tuple) -> ApiResult<()> {
        self.append_with(table, tuple, &CallOptions::default()).await
    }

    pub async fn append_with(
        &self,
        table: &str,
        tuple: Tuple,
        options: &CallOptions,
    ) -> ApiResult<()> {
        self.executor.append(table, tuple, options).await
    }

    /// Rows with `range.start <= ts <= range.stop`, in the order the server sent them.
    pub async fn query(&self, table: &str, range: impl Into<TimeRange>) -> ApiResult<Vec<Tuple>> {
        self.query_with(table, range, &CallOptions::default()).await
    }

    pub async fn query_with(
        &self,
        table: &str,
        range: impl Into<TimeRange>,
        options: &CallOptions,
    ) -> ApiResult<Vec<Tuple>> {
        self.executor.query(table, range.into(), options).await
    }

    pub async fn stats(&self, table: &str) -> ApiResult<TableStats> {
        self.stats_with(table, &CallOptions::default()).await
    }

    pub async fn stats_with(&self, table: &str, options: &CallOptions) -> ApiResult<TableStats> {
        self.executor.stats(table, options).await
    }

    pub async fn list_tables(&self) -> ApiResult<Vec<String>> {
        self.list_tables_with(&CallOptions::default()).await
    }

    pub async fn list_tables_with(&self, options: &CallOptions) -> ApiResult<Vec<String>> {
        self.executor.list_tables(options).await
    }

    /// Deletes `table` and all of its rows. Purging a missing table reports whatever the
    /// server reports.
    pub async fn purge(&self, table: &str) -> ApiResult<()> {
        self.purge_with(table, &CallOptions::default()).await
    }

    pub async fn purge_with(&self, table: &str, options: &CallOptions) -> ApiResult<()> {
        self.executor.purge(table, options).await
    }
}
