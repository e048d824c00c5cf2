//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server:
//! 1. stops accepting new connections,
//! 2. asks every open connection to close once its in-flight request (if
//!    any) is answered, so idle keep-alive clients do not hold it open,
//! 3. waits for those connection tasks, then returns from [`Server::serve`].

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http::header::ACCEPT;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::response::Response;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Accepts connections and dispatches them until SIGTERM or Ctrl-C, then
    /// drains in-flight connections.
    pub async fn serve(self, dispatcher: Dispatcher) -> Result<(), Error> {
        self.serve_with_shutdown(dispatcher, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        dispatcher: Dispatcher,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        run(listener, dispatcher, signal).await;
        Ok(())
    }
}

pub(crate) async fn run(
    listener: TcpListener,
    dispatcher: Dispatcher,
    signal: impl Future<Output = ()>,
) {
    let dispatcher = Arc::new(dispatcher);
    match listener.local_addr() {
        Ok(addr) => info!(%addr, "gantry listening"),
        Err(e) => warn!("listening on unknown address: {e}"),
    }

    // Flipped once on shutdown; every connection task watches it.
    let (closing_tx, closing_rx) = watch::channel(false);
    let mut tasks = tokio::task::JoinSet::new();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a signal stops accepting even when
            // more connections are queued.
            biased;

            () = &mut signal => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let dispatcher = Arc::clone(&dispatcher);
                let mut closing = closing_rx.clone();
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    // Called once per request on the connection.
                    let svc = service_fn(move |req| {
                        let dispatcher = Arc::clone(&dispatcher);
                        async move { handle(dispatcher, remote_addr, req).await }
                    });

                    let builder = ConnBuilder::new(TokioExecutor::new());
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    // On shutdown, finish the request in flight (if any) and
                    // close instead of waiting on an idle keep-alive client.
                    let result = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = closing.changed() => {
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };

                    if let Err(e) = result {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet stays bounded.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    let _ = closing_tx.send(true);
    while tasks.join_next().await.is_some() {}

    info!("gantry stopped");
}

/// Collects the body under the configured size limit, then hands the
/// request to the dispatcher. The peer address travels in the request
/// extensions.
async fn handle(
    dispatcher: Arc<Dispatcher>,
    remote_addr: SocketAddr,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (mut parts, body) = req.into_parts();
    parts.extensions.insert(remote_addr);

    match Limited::new(body, dispatcher.max_body_bytes()).collect().await {
        Ok(collected) => {
            let req = http::Request::from_parts(parts, collected.to_bytes());
            Ok(dispatcher.dispatch(req).await)
        }
        Err(e) => {
            let response = if e.downcast_ref::<LengthLimitError>().is_some() {
                Response::error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large.")
            } else {
                warn!(peer = %remote_addr, "request body not read: {e}");
                Response::error(StatusCode::BAD_REQUEST, "Unreadable request body.")
            };
            let accept = parts.headers.get(ACCEPT).and_then(|v| v.to_str().ok());
            Ok(dispatcher.reject(response, accept))
        }
    }
}

/// Resolves on the first SIGTERM or SIGINT the process receives. On
/// non-Unix platforms only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
