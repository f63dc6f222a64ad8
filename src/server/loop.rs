// Server loop module
// Accepts connections until shutdown, then waits for in-flight ones

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Poll interval while waiting for connections to finish
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Accept loop for the gateway listener.
///
/// Returns once `shutdown` fires and active connections have finished, or
/// the drain deadline (the connection timeout) has passed. Open connections
/// are told to close after their current request.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (drain_tx, drain_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &drain_rx,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    // Stop accepting before draining
    drop(listener);
    drain_tx.send_replace(true);
    logger::log_shutdown(active_connections.load(Ordering::SeqCst));

    let performance = &state.config.performance;
    let grace = Duration::from_secs(std::cmp::max(
        performance.read_timeout,
        performance.write_timeout,
    ));
    let drained = tokio::time::timeout(grace, wait_for_idle(&active_connections)).await;
    if drained.is_err() {
        logger::log_warning(&format!(
            "Shutdown grace period of {}s elapsed with {} connections still open",
            grace.as_secs(),
            active_connections.load(Ordering::SeqCst)
        ));
    } else {
        logger::write_info("[Shutdown] All connections closed");
    }

    Ok(())
}

async fn wait_for_idle(active_connections: &AtomicUsize) {
    while active_connections.load(Ordering::SeqCst) > 0 {
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}
