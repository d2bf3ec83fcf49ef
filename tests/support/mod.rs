//! Purpose: In-memory stand-in for the remote DB service used by integration tests.
//! Exports: `MemoryService`, `self_signed_pem`.
//! Role: Implements the server contract (inclusive ranges, implicit create, purge) in memory.
//! Invariants: Missing tables answer NOT_FOUND for Query/Stats/Purge.
//! Invariants: Injected stalls and faults apply to the next matching call only when armed.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use appenddb::api::DbService;
use appenddb::core::wire::{
    AppendRequest, AppendResponse, DbTuple, Empty, ListTablesResponse, QueryRequest,
    QueryResponse, TableRequest, TableStatTuple,
};
use tonic::{Request, Response, Status};

#[derive(Default)]
pub struct MemoryService {
    tables: Mutex<BTreeMap<String, Vec<DbTuple>>>,
    stall: Mutex<Option<Duration>>,
    query_fault: Mutex<Option<Status>>,
    unimplemented_admin: bool,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server predating ListTables/Purge.
    pub fn without_admin_methods() -> Self {
        Self {
            unimplemented_admin: true,
            ..Self::default()
        }
    }

    pub fn stall_for(&self, duration: Duration) {
        *self.stall.lock().expect("lock") = Some(duration);
    }

    pub fn fail_next_query(&self, status: Status) {
        *self.query_fault.lock().expect("lock") = Some(status);
    }

    pub fn create_empty(&self, table: &str) {
        self.tables
            .lock()
            .expect("lock")
            .entry(table.to_string())
            .or_default();
    }

    pub fn rows(&self, table: &str) -> Vec<DbTuple> {
        self.tables
            .lock()
            .expect("lock")
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn maybe_stall(&self) {
        let stall = *self.stall.lock().expect("lock");
        if let Some(stall) = stall {
            tokio::time::sleep(stall).await;
        }
    }
}

impl DbService for MemoryService {
    async fn append(
        &self,
        request: Request<AppendRequest>,
    ) -> Result<Response<AppendResponse>, Status> {
        self.maybe_stall().await;
        let request = request.into_inner();
        let Some(tuple) = request.data else {
            return Err(Status::invalid_argument("append without data"));
        };
        self.tables
            .lock()
            .expect("lock")
            .entry(request.table)
            .or_default()
            .push(tuple);
        Ok(Response::new(AppendResponse {}))
    }

    async fn query(
        &self,
        request: Request<QueryRequest>,
    ) -> Result<Response<QueryResponse>, Status> {
        self.maybe_stall().await;
        if let Some(status) = self.query_fault.lock().expect("lock").take() {
            return Err(status);
        }
        let request = request.into_inner();
        let tables = self.tables.lock().expect("lock");
        let rows = tables
            .get(&request.table)
            .ok_or_else(|| Status::not_found(format!("table {} not found", request.table)))?;
        let data = rows
            .iter()
            .filter(|row| request.start <= row.ts && row.ts <= request.stop)
            .cloned()
            .collect();
        Ok(Response::new(QueryResponse { data }))
    }

    async fn stats(
        &self,
        request: Request<TableRequest>,
    ) -> Result<Response<TableStatTuple>, Status> {
        self.maybe_stall().await;
        let request = request.into_inner();
        let tables = self.tables.lock().expect("lock");
        let rows = tables
            .get(&request.table)
            .ok_or_else(|| Status::not_found(format!("table {} not found", request.table)))?;
        let stats = TableStatTuple {
            row_count: rows.len() as i64,
            oldest_ts: rows.iter().map(|row| row.ts).min().unwrap_or_default(),
            newest_ts: rows.iter().map(|row| row.ts).max().unwrap_or_default(),
        };
        Ok(Response::new(stats))
    }

    async fn list_tables(
        &self,
        _request: Request<Empty>,
    ) -> Result<Response<ListTablesResponse>, Status> {
        self.maybe_stall().await;
        if self.unimplemented_admin {
            return Err(Status::unimplemented("method ListTables not implemented"));
        }
        let tables = self.tables.lock().expect("lock").keys().cloned().collect();
        Ok(Response::new(ListTablesResponse { tables }))
    }

    async fn purge(&self, request: Request<TableRequest>) -> Result<Response<Empty>, Status> {
        self.maybe_stall().await;
        if self.unimplemented_admin {
            return Err(Status::unimplemented("method Purge not implemented"));
        }
        let request = request.into_inner();
        match self.tables.lock().expect("lock").remove(&request.table) {
            Some(_) => Ok(Response::new(Empty {})),
            None => Err(Status::not_found(format!("table {} not found", request.table))),
        }
    }
}

pub fn self_signed_pem(host: &str) -> String {
    let cert = rcgen::generate_simple_self_signed(vec![host.to_string()]).expect("cert");
    cert.serialize_pem().expect("pem")
}
