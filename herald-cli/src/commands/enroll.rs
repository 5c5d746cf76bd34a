//! Enroll once and hand the issued token to the caller.

use anyhow::{Context, Result};
use herald_core::{Identity, Token};

use crate::participant::{Endpoints, Participant};

/// Enroll `identity` (random when `None`) and return it with its token.
pub async fn run_enroll(
    endpoints: &Endpoints,
    identity: Option<Identity>,
) -> Result<(Identity, Token)> {
    let mut participant = match identity {
        Some(identity) => Participant::with_identity(identity, endpoints.clone()),
        None => Participant::new(endpoints.clone()),
    };

    let token = participant
        .enroll()
        .await
        .context("Enrollment failed")?
        .clone();

    Ok((participant.identity().clone(), token))
}
