//! Purpose: Protobuf messages for the `main.DBService` protocol and their model conversions.
//! Exports: request/response messages, method paths, `to_wire`/`from_wire` helpers.
//! Role: The only place that knows field tags; everything above speaks `Tuple`/`TableStats`.
//! Invariants: Field names, types, and tags match the deployed server bit-for-bit.
//! Invariants: Tuple conversions are total and lossless in both directions.
use bytes::Bytes;

use crate::core::error::{Error, ErrorKind};
use crate::core::tuple::{TableStats, TimeRange, Tuple};

pub const SERVICE_NAME: &str = "main.DBService";
pub const APPEND_PATH: &str = "/main.DBService/Append";
pub const QUERY_PATH: &str = "/main.DBService/Query";
pub const STATS_PATH: &str = "/main.DBService/Stats";
pub const LIST_TABLES_PATH: &str = "/main.DBService/ListTables";
pub const PURGE_PATH: &str = "/main.DBService/Purge";

#[derive(Clone, PartialEq, prost::Message)]
pub struct DbTuple {
    #[prost(int64, tag = "1")]
    pub ts: i64,
    #[prost(bytes = "bytes", tag = "2")]
    pub data: Bytes,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct TableStatTuple {
    #[prost(int64, tag = "1")]
    pub row_count: i64,
    #[prost(int64, tag = "2")]
    pub oldest_ts: i64,
    #[prost(int64, tag = "3")]
    pub newest_ts: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AppendRequest {
    #[prost(string, tag = "1")]
    pub table: String,
    #[prost(message, optional, tag = "2")]
    pub data: Option<DbTuple>,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct AppendResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryRequest {
    #[prost(string, tag = "1")]
    pub table: String,
    #[prost(int64, tag = "2")]
    pub start: i64,
    #[prost(int64, tag = "3")]
    pub stop: i64,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct QueryResponse {
    #[prost(message, repeated, tag = "1")]
    pub data: Vec<DbTuple>,
}

/// Request for operations addressing a single table (Stats, Purge).
#[derive(Clone, PartialEq, prost::Message)]
pub struct TableRequest {
    #[prost(string, tag = "1")]
    pub table: String,
}

#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Empty {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListTablesResponse {
    #[prost(string, repeated, tag = "1")]
    pub tables: Vec<String>,
}

pub fn tuple_to_wire(tuple: Tuple) -> DbTuple {
    let (ts, data) = tuple.into_parts();
    DbTuple { ts, data }
}

pub fn tuple_from_wire(tuple: DbTuple) -> Tuple {
    Tuple::new(tuple.ts, tuple.data)
}

pub fn append_request(table: &str, tuple: Tuple) -> AppendRequest {
    AppendRequest {
        table: table.to_string(),
        data: Some(tuple_to_wire(tuple)),
    }
}

pub fn query_request(table: &str, range: TimeRange) -> QueryRequest {
    QueryRequest {
        table: table.to_string(),
        start: range.start,
        stop: range.stop,
    }
}

pub fn table_request(table: &str) -> TableRequest {
    TableRequest {
        table: table.to_string(),
    }
}

/// Server order is preserved; rows are neither sorted, deduplicated, nor filtered.
pub fn tuples_from_wire(response: QueryResponse) -> Vec<Tuple> {
    response.data.into_iter().map(tuple_from_wire).collect()
}

/// Converts server statistics into the model, normalizing empty tables to the `0` sentinel.
///
/// A negative row count, or `oldest_ts > newest_ts` on a non-empty table, is rejected as
/// `Protocol` so every returned `TableStats` keeps `oldest <= newest`.
pub fn stats_from_wire(stats: TableStatTuple) -> Result<TableStats, Error> {
    let row_count = u64::try_from(stats.row_count).map_err(|_| {
        Error::new(ErrorKind::Protocol)
            .with_message(format!("server reported negative row count {}", stats.row_count))
    })?;
    if row_count == 0 {
        return Ok(TableStats::empty());
    }
    if stats.oldest_ts > stats.newest_ts {
        return Err(Error::new(ErrorKind::Protocol).with_message(format!(
            "server reported oldest timestamp {} after newest {}",
            stats.oldest_ts, stats.newest_ts
        )));
    }
    Ok(TableStats {
        row_count,
        oldest: stats.oldest_ts,
        newest: stats.newest_ts,
    })
}
