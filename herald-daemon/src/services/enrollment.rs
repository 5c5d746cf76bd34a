//! Enrollment exchange: raw identity in, fresh token out.

use std::sync::Arc;
use std::time::Duration;

use herald_core::wire::ENROLLMENT_READ_LIMIT;
use herald_core::{AuditAction, AuditEvent, Identity, Token};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{read_once, ExchangeError};
use crate::audit;
use crate::bindings::BindingTable;

/// Issues tokens and binds them to whatever identity the peer sends.
#[derive(Clone)]
pub struct EnrollmentService {
    table: Arc<BindingTable>,
    idle_timeout: Duration,
}

impl EnrollmentService {
    pub fn new(table: Arc<BindingTable>, idle_timeout: Duration) -> Self {
        Self {
            table,
            idle_timeout,
        }
    }

    /// Run one enrollment exchange on `stream`.
    ///
    /// There is no rejection path: the bytes read are the identity, even when
    /// empty, and any earlier token for that identity is revoked.
    pub async fn handle<S>(&self, stream: &mut S) -> Result<Identity, ExchangeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let raw = read_once(stream, ENROLLMENT_READ_LIMIT, self.idle_timeout).await?;
        let identity = Identity::from_wire(&raw);
        let token = Token::generate();

        let report = self.table.bind(identity.clone(), token.clone()).await;

        let action = if report.replaced {
            AuditAction::Reenrolled
        } else {
            AuditAction::Enrolled
        };
        audit::record(&AuditEvent::new(Some(identity.clone()), action));
        if let Some(evicted) = report.evicted {
            tracing::info!(identity = %evicted, "Binding evicted at capacity");
            audit::record(&AuditEvent::new(Some(evicted), AuditAction::Evicted));
        }

        stream.write_all(token.as_bytes()).await?;
        stream.flush().await?;

        tracing::info!(identity = %identity, replaced = report.replaced, "Token issued");
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    async fn enroll(service: &EnrollmentService, request: &[u8]) -> (Identity, String) {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(request).await.unwrap();

        let identity = service.handle(&mut server).await.unwrap();
        drop(server);

        let mut response = String::new();
        client.read_to_string(&mut response).await.unwrap();
        (identity, response)
    }

    fn service() -> (EnrollmentService, Arc<BindingTable>) {
        let table = Arc::new(BindingTable::new());
        (
            EnrollmentService::new(table.clone(), Duration::from_secs(5)),
            table,
        )
    }

    #[tokio::test]
    async fn issues_and_binds_token() {
        let (service, table) = service();
        let (identity, token) = enroll(&service, b"alice").await;

        assert_eq!(identity, Identity::new("alice"));
        assert!(!token.is_empty());
        assert!(table.verify(&identity, &token).await);
    }

    #[tokio::test]
    async fn reenrollment_rotates_token() {
        let (service, table) = service();
        let (_, t1) = enroll(&service, b"alice").await;
        let (_, t2) = enroll(&service, b"alice").await;

        assert_ne!(t1, t2);
        assert!(!table.verify(&Identity::new("alice"), &t1).await);
        assert!(table.verify(&Identity::new("alice"), &t2).await);
    }

    #[tokio::test]
    async fn identity_is_truncated_at_read_ceiling() {
        let (service, _) = service();
        let long = vec![b'x'; 250];
        let (identity, _) = enroll(&service, &long).await;

        assert_eq!(identity.as_str().len(), ENROLLMENT_READ_LIMIT);
    }

    #[tokio::test]
    async fn empty_request_still_gets_a_token() {
        let (service, table) = service();
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.shutdown().await.unwrap();

        let identity = service.handle(&mut server).await.unwrap();
        drop(server);
        let mut token = String::new();
        client.read_to_string(&mut token).await.unwrap();

        assert!(identity.is_empty());
        assert!(table.verify(&identity, &token).await);
    }

    #[tokio::test(start_paused = true)]
    async fn silent_peer_times_out_without_binding() {
        let (service, table) = service();
        let (_client, mut server) = tokio::io::duplex(64);

        let result = service.handle(&mut server).await;

        assert!(matches!(result, Err(ExchangeError::IdleTimeout(_))));
        assert!(table.is_empty().await);
    }
}
