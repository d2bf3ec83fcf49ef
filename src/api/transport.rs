//! Purpose: The seam between the operation executor and the RPC transport.
//! Exports: `DbService` (one unary method per remote operation), `GrpcTransport`.
//! Role: `GrpcTransport` speaks gRPC over a shared tonic channel; tests plug in fakes.
//! Invariants: Every method is a single unary exchange; no streaming, no retries.
//! Invariants: Clones of `GrpcTransport` share one HTTP/2 connection without locking.
use std::future::Future;

use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

use crate::core::wire::{
    APPEND_PATH, AppendRequest, AppendResponse, Empty, LIST_TABLES_PATH, ListTablesResponse,
    PURGE_PATH, QUERY_PATH, QueryRequest, QueryResponse, STATS_PATH, TableRequest,
    TableStatTuple,
};

/// Remote operations of the append-only DB service.
///
/// Implementations must be safe to call concurrently; the executor never serializes calls.
pub trait DbService: Send + Sync + 'static {
    fn append(
        &self,
        request: Request<AppendRequest>,
    ) -> impl Future<Output = Result<Response<AppendResponse>, Status>> + Send;

    fn query(
        &self,
        request: Request<QueryRequest>,
    ) -> impl Future<Output = Result<Response<QueryResponse>, Status>> + Send;

    fn stats(
        &self,
        request: Request<TableRequest>,
    ) -> impl Future<Output = Result<Response<TableStatTuple>, Status>> + Send;

    fn list_tables(
        &self,
        request: Request<Empty>,
    ) -> impl Future<Output = Result<Response<ListTablesResponse>, Status>> + Send;

    fn purge(
        &self,
        request: Request<TableRequest>,
    ) -> impl Future<Output = Result<Response<Empty>, Status>> + Send;
}

#[derive(Clone, Debug)]
pub struct GrpcTransport {
    inner: tonic::client::Grpc<Channel>,
}

impl GrpcTransport {
    pub fn new(channel: Channel) -> Self {
        Self {
            inner: tonic::client::Grpc::new(channel),
        }
    }

    async fn unary<M1, M2>(
        &self,
        request: Request<M1>,
        path: &'static str,
    ) -> Result<Response<M2>, Status>
    where
        M1: prost::Message + Send + Sync + 'static,
        M2: prost::Message + Default + Send + Sync + 'static,
    {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|err| Status::unavailable(format!("channel was not ready: {err}")))?;
        let codec: ProstCodec<M1, M2> = ProstCodec::default();
        grpc.unary(request, PathAndQuery::from_static(path), codec).await
    }
}

impl DbService for GrpcTransport {
    async fn append(
        &self,
        request: Request<AppendRequest>,
    ) -> Result<Response<AppendResponse>, Status> {
        self.unary(request, APPEND_PATH).await
    }

    async fn query(
        &self,
        request: Request<QueryRequest>,
    ) -> Result<Response<QueryResponse>, Status> {
        self.unary(request, QUERY_PATH).await
    }

    async fn stats(
        &self,
        request: Request<TableRequest>,
    ) -> Result<Response<TableStatTuple>, Status> {
        self.unary(request, STATS_PATH).await
    }

    async fn list_tables(
        &self,
        request: Request<Empty>,
    ) -> Result<Response<ListTablesResponse>, Status> {
        self.unary(request, LIST_TABLES_PATH).await
    }

    async fn purge(&self, request: Request<TableRequest>) -> Result<Response<Empty>, Status> {
        self.unary(request, PURGE_PATH).await
    }
}
