//! Scripted walkthrough of the protocol against a running authority.
//!
//! One participant sends before enrolling (rejected), enrolls, and sends
//! twice. Then `clients` fresh participants each enroll and send a random
//! payload.

use anyhow::{Context, Result};
use uuid::Uuid;

use super::deliver_logged;
use crate::participant::{Endpoints, Participant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    /// The pre-enrollment send was turned away by the authority.
    pub tokenless_rejected: bool,
    pub delivered: usize,
    pub attempted: usize,
}

pub async fn run_demo(endpoints: &Endpoints, clients: usize) -> Result<DemoReport> {
    let mut report = DemoReport::default();

    let mut participant = Participant::new(endpoints.clone());
    tracing::info!(identity = %participant.identity(), "Sending without a token");
    if let Err(e) = deliver_logged(&participant, "hello, world").await {
        report.tokenless_rejected = e.rejection().is_some();
    }

    participant
        .enroll()
        .await
        .context("Enrollment failed, is the authority running?")?;

    for payload in ["hello, world", "asda"] {
        report.attempted += 1;
        if deliver_logged(&participant, payload).await.is_ok() {
            report.delivered += 1;
        }
    }

    tracing::info!(clients, "Running fresh participants");
    for _ in 0..clients {
        let mut participant = Participant::new(endpoints.clone());
        report.attempted += 1;
        if let Err(e) = participant.enroll().await {
            tracing::warn!(identity = %participant.identity(), "{e}");
            continue;
        }
        if deliver_logged(&participant, &Uuid::new_v4().to_string())
            .await
            .is_ok()
        {
            report.delivered += 1;
        }
    }

    Ok(report)
}
