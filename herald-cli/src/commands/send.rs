//! Deliver messages from one participant.

use anyhow::{Context, Result};
use herald_core::Identity;

use super::deliver_logged;
use crate::participant::{DeliveryError, Endpoints, Participant};

/// What happened to each message of a `send` run.
#[derive(Debug, Default)]
pub struct SendReport {
    pub delivered: usize,
    pub failed: Vec<(String, DeliveryError)>,
}

impl SendReport {
    pub fn all_delivered(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Deliver `messages` in order, enrolling first unless `enroll` is false.
///
/// A failed enrollment aborts the run. A failed delivery does not: the
/// remaining messages are still attempted.
pub async fn run_send(
    endpoints: &Endpoints,
    identity: Option<Identity>,
    messages: &[String],
    enroll: bool,
) -> Result<SendReport> {
    let mut participant = match identity {
        Some(identity) => Participant::with_identity(identity, endpoints.clone()),
        None => Participant::new(endpoints.clone()),
    };

    if enroll {
        participant.enroll().await.context("Enrollment failed")?;
    }

    let mut report = SendReport::default();
    for message in messages {
        match deliver_logged(&participant, message).await {
            Ok(()) => report.delivered += 1,
            Err(e) => report.failed.push((message.clone(), e)),
        }
    }
    Ok(report)
}
