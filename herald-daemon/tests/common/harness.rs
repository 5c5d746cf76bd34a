//! Test harness that runs a real authority on ephemeral loopback ports.
//!
//! Clients here speak the wire protocol by hand so tests can send bodies a
//! well-behaved participant never would.

use std::net::SocketAddr;
use std::sync::Arc;

use herald_daemon::{Authority, AuthorityConfig, BindingTable};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A running authority plus the means to stop it.
pub struct TestAuthority {
    pub enrollment_addr: SocketAddr,
    pub delivery_addr: SocketAddr,
    pub table: Arc<BindingTable>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

#[allow(dead_code)]
impl TestAuthority {
    /// Start an authority with default settings.
    pub async fn start() -> Self {
        Self::with_config(AuthorityConfig::ephemeral()).await
    }

    pub async fn with_config(config: AuthorityConfig) -> Self {
        let authority = Authority::bind(&config)
            .await
            .expect("Failed to bind test authority");

        let enrollment_addr = authority.enrollment_addr();
        let delivery_addr = authority.delivery_addr();
        let table = authority.bindings();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(authority.serve(async {
            let _ = shutdown_rx.await;
        }));

        Self {
            enrollment_addr,
            delivery_addr,
            table,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Enroll `identity` and return the issued token.
    pub async fn enroll(&self, identity: &str) -> String {
        let response = exchange(self.enrollment_addr, identity.as_bytes())
            .await
            .expect("Enrollment exchange failed");
        String::from_utf8(response).expect("Token is not UTF-8")
    }

    /// Deliver a well-formed envelope and return the response text.
    pub async fn deliver(&self, uid: Option<&str>, token: Option<&str>, msg: Option<&str>) -> String {
        let body = serde_json::to_vec(&serde_json::json!({"uid": uid, "token": token, "msg": msg}))
            .expect("Failed to encode envelope");
        let response = self
            .deliver_raw(&body)
            .await
            .expect("Delivery exchange failed");
        String::from_utf8(response).expect("Response is not UTF-8")
    }

    /// Send arbitrary bytes to the delivery endpoint.
    pub async fn deliver_raw(&self, body: &[u8]) -> std::io::Result<Vec<u8>> {
        exchange(self.delivery_addr, body).await
    }

    /// Stop accepting and wait for the accept loops to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await.expect("Authority task panicked");
        }
    }
}

impl Drop for TestAuthority {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// One request/response over a fresh connection, reading until the
/// authority closes it.
#[allow(dead_code)]
pub async fn exchange(addr: SocketAddr, request: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(request).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}
