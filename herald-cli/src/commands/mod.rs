//! CLI commands.

pub mod demo;
pub mod enroll;
pub mod send;

pub use demo::{run_demo, DemoReport};
pub use enroll::run_enroll;
pub use send::{run_send, SendReport};

use crate::participant::{DeliveryError, Participant};

/// Deliver `payload` and log the result the way every command reports it.
pub(crate) async fn deliver_logged(
    participant: &Participant,
    payload: &str,
) -> Result<(), DeliveryError> {
    match participant.deliver(payload).await {
        Ok(()) => {
            tracing::info!(
                identity = %participant.identity(),
                "Message '{payload}' has been delivered"
            );
            Ok(())
        }
        Err(e) => {
            tracing::warn!(identity = %participant.identity(), "{e}");
            Err(e)
        }
    }
}
