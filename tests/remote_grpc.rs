//! Purpose: Drive the real gRPC transport against a loopback TLS server.
//! Exports: None (integration test module).
//! Role: Validate method paths, protobuf framing, deadlines on the wire, and host verification.
//! Invariants: The server routes only Append and Query; every other path is UNIMPLEMENTED.
//! Invariants: Certificates are generated per server and name `localhost` only.
//! Invariants: Bounded waits avoid test flakiness.

mod support;

use std::convert::Infallible;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use appenddb::api::{
    CancellationToken, Client, ClientConfig, DbService, ErrorKind, TimeRange, Tuple,
};
use appenddb::core::wire::{
    APPEND_PATH, AppendRequest, AppendResponse, QUERY_PATH, QueryRequest, QueryResponse,
    SERVICE_NAME,
};
use support::MemoryService;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codec::ProstCodec;
use tonic::codegen::{Body, BoxFuture, Service, StdError, empty_body, http};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::{Identity, Server, ServerTlsConfig};
use tonic::{Request, Response, Status};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Hand-routed `main.DBService` backed by the in-memory store.
#[derive(Clone)]
struct DbRouter {
    store: Arc<MemoryService>,
    query_timeouts: Arc<Mutex<Vec<Option<String>>>>,
}

impl NamedService for DbRouter {
    const NAME: &'static str = SERVICE_NAME;
}

struct AppendRoute(Arc<MemoryService>);

impl UnaryService<AppendRequest> for AppendRoute {
    type Response = AppendResponse;
    type Future = BoxFuture<Response<AppendResponse>, Status>;

    fn call(&mut self, request: Request<AppendRequest>) -> Self::Future {
        let store = Arc::clone(&self.0);
        Box::pin(async move { store.append(request).await })
    }
}

struct QueryRoute {
    store: Arc<MemoryService>,
    timeouts: Arc<Mutex<Vec<Option<String>>>>,
}

impl UnaryService<QueryRequest> for QueryRoute {
    type Response = QueryResponse;
    type Future = BoxFuture<Response<QueryResponse>, Status>;

    fn call(&mut self, request: Request<QueryRequest>) -> Self::Future {
        let timeout = request
            .metadata()
            .get("grpc-timeout")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.timeouts.lock().expect("lock").push(timeout);
        let store = Arc::clone(&self.store);
        Box::pin(async move { store.query(request).await })
    }
}

impl<B> Service<http::Request<B>> for DbRouter
where
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::BoxBody>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<B>) -> Self::Future {
        let store = Arc::clone(&self.store);
        match request.uri().path() {
            APPEND_PATH => Box::pin(async move {
                let mut grpc = Grpc::new(ProstCodec::default());
                Ok(grpc.unary(AppendRoute(store), request).await)
            }),
            QUERY_PATH => {
                let route = QueryRoute {
                    store,
                    timeouts: Arc::clone(&self.query_timeouts),
                };
                Box::pin(async move {
                    let mut grpc = Grpc::new(ProstCodec::default());
                    Ok(grpc.unary(route, request).await)
                })
            }
            _ => Box::pin(async move {
                let response = http::Response::builder()
                    .status(200)
                    .header("grpc-status", (tonic::Code::Unimplemented as i32).to_string())
                    .header(http::header::CONTENT_TYPE, "application/grpc")
                    .body(empty_body())
                    .expect("unimplemented response");
                Ok(response)
            }),
        }
    }
}

struct TestServer {
    port: u16,
    ca: tempfile::NamedTempFile,
    query_timeouts: Arc<Mutex<Vec<Option<String>>>>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl TestServer {
    async fn start() -> TestResult<Self> {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])?;
        let cert_pem = cert.serialize_pem()?;
        let key_pem = cert.serialize_private_key_pem();

        let mut ca = tempfile::NamedTempFile::new()?;
        ca.write_all(cert_pem.as_bytes())?;

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let router = DbRouter {
            store: Arc::new(MemoryService::new()),
            query_timeouts: Arc::new(Mutex::new(Vec::new())),
        };
        let query_timeouts = Arc::clone(&router.query_timeouts);

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let server = Server::builder()
            .tls_config(ServerTlsConfig::new().identity(Identity::from_pem(cert_pem, key_pem)))?
            .add_service(router);
        let handle = tokio::spawn(async move {
            let incoming = TcpListenerStream::new(listener);
            let stopped = async move { signal.cancelled().await };
            if let Err(err) = server.serve_with_incoming_shutdown(incoming, stopped).await {
                eprintln!("test server stopped: {err}");
            }
        });

        Ok(Self {
            port,
            ca,
            query_timeouts,
            shutdown,
            handle: Some(handle),
        })
    }

    fn config(&self, host: &str) -> ClientConfig {
        ClientConfig::new(host, self.port, self.ca.path())
            .with_connect_timeout(Duration::from_secs(5))
            .with_call_timeout(Duration::from_secs(5))
    }

    async fn client(&self) -> TestResult<Client> {
        Ok(Client::connect(self.config("localhost")).await?)
    }

    fn seen_query_timeouts(&self) -> Vec<Option<String>> {
        self.query_timeouts.lock().expect("lock").clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_append_then_point_query() -> TestResult<()> {
    let server = TestServer::start().await?;
    let client = server.client().await?;

    client.append("cpu", Tuple::new(5, vec![1u8, 2, 3])).await?;
    let rows = client.query("cpu", TimeRange::at(5)).await?;
    assert_eq!(rows, vec![Tuple::new(5, vec![1u8, 2, 3])]);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_round_trip_keeps_extreme_timestamps_and_empty_payloads() -> TestResult<()> {
    let server = TestServer::start().await?;
    let client = server.client().await?;

    client.append("edges", Tuple::new(i64::MIN, Vec::<u8>::new())).await?;
    client.append("edges", Tuple::new(i64::MAX, vec![0u8, 255])).await?;

    let rows = client.query("edges", TimeRange::all()).await?;
    assert_eq!(
        rows,
        vec![
            Tuple::new(i64::MIN, Vec::<u8>::new()),
            Tuple::new(i64::MAX, vec![0u8, 255]),
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_query_carries_deadline_header() -> TestResult<()> {
    let server = TestServer::start().await?;
    let client = server.client().await?;

    client.append("cpu", Tuple::new(1, "x")).await?;
    client.query("cpu", TimeRange::all()).await?;

    let seen = server.seen_query_timeouts();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].is_some());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_missing_table_is_not_found() -> TestResult<()> {
    let server = TestServer::start().await?;
    let client = server.client().await?;

    let err = client.query("missing", TimeRange::all()).await.expect_err("err");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.table(), Some("missing"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn remote_unrouted_method_is_unsupported() -> TestResult<()> {
    let server = TestServer::start().await?;
    let client = server.client().await?;

    let err = client.stats("cpu").await.expect_err("err");
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn certificate_must_name_the_dialed_host() -> TestResult<()> {
    let server = TestServer::start().await?;

    let err = Client::connect(server.config("127.0.0.1"))
        .await
        .err()
        .expect("err");
    assert_eq!(err.kind(), ErrorKind::Connect);

    server.client().await?;
    Ok(())
}
