//! Accept loop and connection serving
//!
//! Owns the transport side of the engine: accepts TCP connections, enforces
//! the configured connection ceiling and serves each connection as HTTP/1.1
//! with the dispatcher as the request service. Every connection runs on its
//! own tokio task.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use crate::app::App;
use crate::config::Config;
use crate::dispatch;
use crate::logger;

/// Fixed transport parameters, shared by every connection task
struct ServeState {
    app: Arc<App>,
    keep_alive: bool,
    max_connections: Option<u64>,
    log_accepts: bool,
    active: AtomicUsize,
}

/// Accept connections forever, serving each through the app's dispatcher
///
/// # Errors
///
/// Individual accept failures are logged and do not end the loop; the
/// `Result` exists for the caller's signature and is never `Ok`.
pub async fn serve(listener: TcpListener, app: Arc<App>, config: &Config) -> std::io::Result<()> {
    let state = Arc::new(ServeState {
        app,
        keep_alive: config.performance.keep_alive,
        max_connections: config.performance.max_connections,
        log_accepts: config.logging.access_log,
        active: AtomicUsize::new(0),
    });

    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
            Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
        }
    }
}

/// Admit or reject one accepted connection
fn accept_connection(stream: TcpStream, peer_addr: SocketAddr, state: &Arc<ServeState>) {
    // Increment before checking so two racing accepts cannot both slip
    // past a nearly-full ceiling.
    let prev_count = state.active.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.max_connections {
        let limit = usize::try_from(max_conn).unwrap_or(usize::MAX);
        if prev_count >= limit {
            state.active.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if state.log_accepts {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Serve one connection on its own task until the peer hangs up
fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, state: Arc<ServeState>) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.keep_alive);

        let app = Arc::clone(&state.app);
        let service =
            service_fn(move |req| dispatch::handle_request(req, Arc::clone(&app), peer_addr));

        if let Err(err) = builder.serve_connection(io, service).await {
            logger::log_connection_error(&err);
        }

        state.active.fetch_sub(1, Ordering::SeqCst);
    });
}
