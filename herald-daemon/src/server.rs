//! Dual-port authority: one listener for enrollment, one for delivery.
//!
//! Every accepted connection is handed to its own task that runs a single
//! exchange and then closes the socket, so a slow or silent peer only ever
//! holds up its own task (until the idle timeout drops it).

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use herald_core::Reply;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};

use crate::bindings::BindingTable;
use crate::config::AuthorityConfig;
use crate::services::{DeliveryService, EnrollmentService};
use crate::shutdown::{ShutdownCoordinator, ShutdownSignal};

/// Pause after a failed accept (e.g. fd exhaustion) before retrying.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Errors that stop the authority as a whole.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    #[error("failed to bind {endpoint} listener on {addr}: {source}")]
    Bind {
        endpoint: &'static str,
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),
}

/// An authority whose listeners are bound but not yet accepting.
pub struct Authority {
    enrollment_listener: TcpListener,
    delivery_listener: TcpListener,
    enrollment_addr: SocketAddr,
    delivery_addr: SocketAddr,
    table: Arc<BindingTable>,
    enrollment: EnrollmentService,
    delivery: DeliveryService,
}

impl Authority {
    /// Bind both listeners with a fresh, empty binding table.
    pub async fn bind(config: &AuthorityConfig) -> Result<Self, ServeError> {
        let enrollment_listener = bind_listener("enrollment", config.enrollment_addr()).await?;
        let delivery_listener = bind_listener("delivery", config.delivery_addr()).await?;

        let enrollment_addr = enrollment_listener
            .local_addr()
            .map_err(ServeError::LocalAddr)?;
        let delivery_addr = delivery_listener
            .local_addr()
            .map_err(ServeError::LocalAddr)?;

        let table = Arc::new(BindingTable::with_capacity(config.max_bindings));
        let enrollment = EnrollmentService::new(table.clone(), config.idle_timeout);
        let delivery =
            DeliveryService::new(table.clone(), config.idle_timeout, config.malformed_policy);

        Ok(Self {
            enrollment_listener,
            delivery_listener,
            enrollment_addr,
            delivery_addr,
            table,
            enrollment,
            delivery,
        })
    }

    pub fn enrollment_addr(&self) -> SocketAddr {
        self.enrollment_addr
    }

    pub fn delivery_addr(&self) -> SocketAddr {
        self.delivery_addr
    }

    /// Shared handle on the binding table.
    pub fn bindings(&self) -> Arc<BindingTable> {
        self.table.clone()
    }

    /// Accept on both endpoints until `shutdown` completes.
    ///
    /// In-flight exchanges are not cancelled; they finish on their own tasks.
    pub async fn serve<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let coordinator = ShutdownCoordinator::new();

        let enrollment = self.enrollment.clone();
        let enrollment_loop = accept_loop(
            self.enrollment_listener,
            "enrollment",
            coordinator.signal(),
            move |stream, peer| serve_enrollment(enrollment.clone(), stream, peer),
        );

        let delivery = self.delivery.clone();
        let delivery_loop = accept_loop(
            self.delivery_listener,
            "delivery",
            coordinator.signal(),
            move |stream, peer| serve_delivery(delivery.clone(), stream, peer),
        );

        let trigger = async {
            shutdown.await;
            coordinator.shutdown();
        };

        tokio::join!(enrollment_loop, delivery_loop, trigger);
        tracing::info!("Authority stopped accepting connections");
    }
}

async fn bind_listener(endpoint: &'static str, addr: String) -> Result<TcpListener, ServeError> {
    match TcpListener::bind(&addr).await {
        Ok(listener) => {
            tracing::info!(port = endpoint, addr = %addr, "Listener bound");
            Ok(listener)
        }
        Err(source) => Err(ServeError::Bind {
            endpoint,
            addr,
            source,
        }),
    }
}

async fn accept_loop<H, Fut>(
    listener: TcpListener,
    endpoint: &'static str,
    mut shutdown: ShutdownSignal,
    handle: H,
) where
    H: Fn(TcpStream, SocketAddr) -> Fut,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        tracing::debug!(peer = %peer, port = endpoint, "Connection accepted");
                        tokio::spawn(handle(stream, peer));
                    }
                    Err(e) => {
                        tracing::warn!(port = endpoint, error = %e, "TCP accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                }
            }
            _ = shutdown.recv() => {
                tracing::info!(port = endpoint, "Shutdown signal received, stopping accept loop");
                break;
            }
        }
    }
}

async fn serve_enrollment(service: EnrollmentService, mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = service.handle(&mut stream).await {
        tracing::warn!(peer = %peer, error = %e, "Enrollment failed");
    }
    close(stream, peer).await;
}

async fn serve_delivery(service: DeliveryService, mut stream: TcpStream, peer: SocketAddr) {
    match service.handle(&mut stream).await {
        Ok(Reply::Abort) => abort(stream, peer),
        Ok(Reply::Empty | Reply::Text(_)) => close(stream, peer).await,
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Delivery failed");
            close(stream, peer).await;
        }
    }
}

/// Graceful close: FIN after any response bytes.
async fn close(mut stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.shutdown().await {
        tracing::debug!(peer = %peer, error = %e, "Shutdown on closed connection");
    }
}

/// Close with zero linger so the peer sees a reset instead of a clean EOF.
fn abort(stream: TcpStream, peer: SocketAddr) {
    #[allow(deprecated)]
    let result = stream.set_linger(Some(Duration::ZERO));
    if let Err(e) = result {
        tracing::debug!(peer = %peer, error = %e, "Failed to set zero linger");
    }
    drop(stream);
}
