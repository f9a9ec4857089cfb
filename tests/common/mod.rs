//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::{Bytes, Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::UnixListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use axum_server::tls_rustls::RustlsConfig;

use socket_proxy::health::BackendReady;
use socket_proxy::lifecycle::{Gateway, Shutdown, StartupError};
use socket_proxy::net::bind_listener;
use socket_proxy::GatewayConfig;

pub type MockBody = UnsyncBoxBody<Bytes, Infallible>;

/// A running mock backend on a Unix socket.
pub struct MockBackend {
    /// Connections accepted so far (availability probes included).
    pub accepted: Arc<AtomicUsize>,
    pub task: JoinHandle<()>,
}

impl MockBackend {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Serve HTTP/1.1 on a Unix socket at `path`, answering with `handler`.
pub fn start_backend<F, Fut>(path: &Path, handler: F) -> MockBackend
where
    F: Fn(Request<Incoming>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response<MockBody>> + Send + 'static,
{
    let listener = UnixListener::bind(path).unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let handler = Arc::new(handler);

    let task = tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            tokio::spawn(async move {
                let service = service_fn(move |request: Request<Incoming>| {
                    let handler = handler.clone();
                    async move { Ok::<_, Infallible>((*handler)(request).await) }
                });
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    MockBackend { accepted, task }
}

pub fn full_body(bytes: impl Into<Bytes>) -> MockBody {
    Full::new(bytes.into()).boxed_unsync()
}

/// A body fed chunk by chunk through the returned sender.
pub fn channel_body() -> (mpsc::Sender<Bytes>, MockBody) {
    let (tx, rx) = mpsc::channel::<Bytes>(8);
    let frames = stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<_, Infallible>(Frame::data(chunk)), rx))
    });
    (tx, StreamBody::new(frames).boxed_unsync())
}

/// Echo the request body; report every `x-test` value and the `host` seen.
pub async fn echo(request: Request<Incoming>) -> Response<MockBody> {
    let (parts, body) = request.into_parts();
    let mut response = Response::builder().status(200);
    for value in parts.headers.get_all("x-test") {
        response = response.header("x-seen-test", value);
    }
    if let Some(host) = parts.headers.get("host") {
        response = response.header("x-seen-host", host);
    }
    response = response.header("x-seen-path", parts.uri.to_string());

    let body = body.collect().await.unwrap().to_bytes();
    response.body(full_body(body)).unwrap()
}

/// A gateway served over plain HTTP on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub ready: Option<BackendReady>,
    pub task: JoinHandle<Result<(), StartupError>>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn start_gateway(socket: &Path) -> TestGateway {
    start_gateway_with_tls(socket, None)
}

/// Like [`start_gateway`], terminating TLS with `tls` when given.
pub fn start_gateway_with_tls(socket: &Path, tls: Option<RustlsConfig>) -> TestGateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1".into();
    config.listener.port = 0;
    config.listener.shutdown_grace_secs = 1;
    config.backend.socket_path = socket.to_path_buf();

    let listener = bind_listener(&config.listener).unwrap();
    let addr = listener.local_addr().unwrap();
    let (gateway, ready) = Gateway::new(&config).unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();
    let task = tokio::spawn(async move { gateway.serve(listener, tls, &server_shutdown).await });

    TestGateway {
        addr,
        shutdown,
        ready: Some(ready),
        task,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Poll `/readyz` until it answers 200, returning how long that took.
pub async fn wait_until_ready(gateway: &TestGateway, limit: Duration) -> Duration {
    let client = client();
    let start = std::time::Instant::now();
    loop {
        let res = client.get(gateway.url("/readyz")).send().await.unwrap();
        if res.status() == 200 {
            return start.elapsed();
        }
        assert!(start.elapsed() < limit, "gateway not ready after {:?}", limit);
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
