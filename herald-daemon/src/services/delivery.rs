//! Delivery exchange: authorize an envelope against the binding table.

use std::sync::Arc;
use std::time::Duration;

use herald_core::wire::DELIVERY_READ_LIMIT;
use herald_core::{
    AuditAction, AuditEvent, DeliveryOutcome, Envelope, Identity, MalformedPolicy, Reply,
};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use super::{read_once, ExchangeError};
use crate::audit;
use crate::bindings::BindingTable;

/// Accepts or rejects delivered messages.
#[derive(Clone)]
pub struct DeliveryService {
    table: Arc<BindingTable>,
    idle_timeout: Duration,
    malformed_policy: MalformedPolicy,
}

impl DeliveryService {
    pub fn new(
        table: Arc<BindingTable>,
        idle_timeout: Duration,
        malformed_policy: MalformedPolicy,
    ) -> Self {
        Self {
            table,
            idle_timeout,
            malformed_policy,
        }
    }

    /// Run one delivery exchange on `stream`.
    ///
    /// Error text is written here; [`Reply::Abort`] is returned to the caller,
    /// which owns the socket and must reset it instead of closing cleanly.
    pub async fn handle<S>(&self, stream: &mut S) -> Result<Reply, ExchangeError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let body = read_once(stream, DELIVERY_READ_LIMIT, self.idle_timeout).await?;
        let outcome = self.evaluate(&body).await;

        let reply = outcome.reply(self.malformed_policy);
        if let Reply::Text(text) = reply {
            stream.write_all(text.as_bytes()).await?;
            stream.flush().await?;
        }

        Ok(reply)
    }

    /// Decide the outcome for a raw delivery body.
    ///
    /// The format check runs before the token check, so a message without a
    /// payload is reported as a format error even when its token is valid.
    pub async fn evaluate(&self, body: &[u8]) -> DeliveryOutcome {
        let envelope = match Envelope::decode(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(bytes = body.len(), error = %e, "Unable to handle message");
                return DeliveryOutcome::MalformedEnvelope;
            }
        };

        let actor = envelope.actor();
        let request = match envelope.into_request() {
            Ok(request) => request,
            Err(outcome) => {
                self.reject(actor.as_ref(), outcome);
                return outcome;
            }
        };

        let authorized = match request.token.as_deref() {
            Some(token) => self.table.verify(&request.identity, token).await,
            None => false,
        };
        if !authorized {
            self.reject(Some(&request.identity), DeliveryOutcome::InvalidToken);
            return DeliveryOutcome::InvalidToken;
        }

        tracing::info!(
            identity = %request.identity,
            payload = %request.payload,
            "Message accepted"
        );
        audit::record(
            &AuditEvent::new(Some(request.identity), AuditAction::Delivered)
                .with_metadata("payload", request.payload),
        );

        DeliveryOutcome::Accepted
    }

    fn reject(&self, identity: Option<&Identity>, outcome: DeliveryOutcome) {
        let event = self.rejection_event(identity, outcome);
        tracing::warn!(
            identity = ?identity.map(|i| i.as_str()),
            reason = event.metadata.get("reason").map(String::as_str),
            "Unable to process a message"
        );
        audit::record(&event);
    }

    fn rejection_event(
        &self,
        identity: Option<&Identity>,
        outcome: DeliveryOutcome,
    ) -> AuditEvent {
        let reason = match outcome.reply(self.malformed_policy) {
            Reply::Text(text) => text,
            Reply::Empty | Reply::Abort => "",
        };
        AuditEvent::new(identity.cloned(), AuditAction::DeliveryRejected)
            .with_metadata("reason", reason)
    }
}
