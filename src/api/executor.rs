//! Purpose: Run one logical operation against the transport under a fresh deadline.
//! Exports: `Executor` (Append/Query/Stats/ListTables/Purge).
//! Role: Shapes requests, bounds each call, and normalizes results into `Result<T, Error>`.
//! Invariants: Deadlines are computed per call and never shared or accumulated.
//! Invariants: Failures surface immediately; there is no retry, batching, caching, or reordering.
//! Invariants: Query rows are returned in server order, unfiltered and undeduplicated.
#![allow(clippy::result_large_err)]

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status};

use super::config::CallOptions;
use super::transport::DbService;
use crate::core::error::{Error, ErrorKind};
use crate::core::tuple::{TableStats, TimeRange, Tuple};
use crate::core::wire;

pub(crate) struct Executor<T> {
    service: Arc<T>,
    call_timeout: Duration,
}

impl<T> Clone for Executor<T> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            call_timeout: self.call_timeout,
        }
    }
}

impl<T: DbService> Executor<T> {
    pub(crate) fn new(service: T, call_timeout: Duration) -> Self {
        Self {
            service: Arc::new(service),
            call_timeout,
        }
    }

    pub(crate) fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    pub(crate) fn service(&self) -> &T {
        &self.service
    }

    pub(crate) async fn append(
        &self,
        table: &str,
        tuple: Tuple,
        options: &CallOptions,
    ) -> Result<(), Error> {
        let timeout = self.timeout_for(options, "Append", Some(table))?;
        let request = deadline_request(wire::append_request(table, tuple), timeout);
        let call = self.service.append(request);
        run("Append", Some(table), timeout, options.cancel.as_ref(), call)
            .await
            .map(|_| ())
    }

    pub(crate) async fn query(
        &self,
        table: &str,
        range: TimeRange,
        options: &CallOptions,
    ) -> Result<Vec<Tuple>, Error> {
        let timeout = self.timeout_for(options, "Query", Some(table))?;
        let request = deadline_request(wire::query_request(table, range), timeout);
        let call = self.service.query(request);
        let response = run("Query", Some(table), timeout, options.cancel.as_ref(), call).await?;
        let rows = wire::tuples_from_wire(response);
        tracing::debug!(table, rows = rows.len(), "query returned rows");
        Ok(rows)
    }

    pub(crate) async fn stats(
        &self,
        table: &str,
        options: &CallOptions,
    ) -> Result<TableStats, Error> {
        let timeout = self.timeout_for(options, "Stats", Some(table))?;
        let request = deadline_request(wire::table_request(table), timeout);
        let call = self.service.stats(request);
        let response = run("Stats", Some(table), timeout, options.cancel.as_ref(), call).await?;
        wire::stats_from_wire(response)
            .map_err(|err| err.with_operation("Stats").with_table(table))
    }

    pub(crate) async fn list_tables(&self, options: &CallOptions) -> Result<Vec<String>, Error> {
        let timeout = self.timeout_for(options, "ListTables", None)?;
        let request = deadline_request(wire::Empty {}, timeout);
        let call = self.service.list_tables(request);
        let response = run("ListTables", None, timeout, options.cancel.as_ref(), call).await?;
        Ok(response.tables)
    }

    pub(crate) async fn purge(&self, table: &str, options: &CallOptions) -> Result<(), Error> {
        let timeout = self.timeout_for(options, "Purge", Some(table))?;
        let request = deadline_request(wire::table_request(table), timeout);
        let call = self.service.purge(request);
        run("Purge", Some(table), timeout, options.cancel.as_ref(), call)
            .await
            .map(|_| ())
    }

    fn timeout_for(
        &self,
        options: &CallOptions,
        operation: &'static str,
        table: Option<&str>,
    ) -> Result<Duration, Error> {
        options
            .effective_timeout(self.call_timeout)
            .map_err(|err| with_context(err, operation, table))
    }
}

/// Attaches a `grpc-timeout` header equal to the call deadline.
fn deadline_request<M>(message: M, timeout: Duration) -> Request<M> {
    let mut request = Request::new(message);
    request.set_timeout(timeout);
    request
}

async fn run<R, F>(
    operation: &'static str,
    table: Option<&str>,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
    call: F,
) -> Result<R, Error>
where
    F: Future<Output = Result<Response<R>, Status>>,
{
    let started = Instant::now();
    let bounded = tokio::time::timeout(timeout, call);
    let outcome = match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => None,
                result = bounded => Some(result),
            }
        }
        None => Some(bounded.await),
    };

    let result = match outcome {
        None => Err(Error::new(ErrorKind::Cancelled).with_message("call cancelled by caller")),
        Some(Ok(Ok(response))) => Ok(response.into_inner()),
        Some(Ok(Err(status))) => Err(Error::from_status(status)),
        Some(Err(_)) => Err(Error::new(ErrorKind::DeadlineExceeded)
            .with_message(format!("no response within {timeout:?}"))),
    };

    let elapsed_ms = saturating_millis(started.elapsed());
    match result {
        Ok(value) => {
            tracing::debug!(operation, table, elapsed_ms, "call completed");
            Ok(value)
        }
        Err(err) => {
            tracing::debug!(
                operation,
                table,
                elapsed_ms,
                kind = ?err.kind(),
                "call failed"
            );
            Err(with_context(err, operation, table))
        }
    }
}

/// Whole milliseconds for log fields, pinned at `u64::MAX` instead of wrapping.
pub(super) fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn with_context(err: Error, operation: &'static str, table: Option<&str>) -> Error {
    let err = err.with_operation(operation);
    match table {
        Some(table) => err.with_table(table),
        None => err,
    }
}
