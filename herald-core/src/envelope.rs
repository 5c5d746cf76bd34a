//! The delivery envelope and the outcome of checking it.
//!
//! Wire format: a flat JSON object with string fields `uid`, `token` and
//! `msg`. Missing fields and `null` are both treated as absent.

use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Token};
use crate::wire::{
    MalformedPolicy, INVALID_FORMAT_ERROR, INVALID_TOKEN_ERROR, MALFORMED_MESSAGE_ERROR,
};

/// Errors decoding or encoding an envelope.
#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// `{identity, token, payload}` as sent by a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "uid", default)]
    pub identity: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(rename = "msg", default)]
    pub payload: Option<String>,
}

impl Envelope {
    /// Build an envelope for `identity`. A participant that never enrolled
    /// sends a `null` token.
    pub fn new(identity: &Identity, token: Option<&Token>, payload: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.as_str().to_owned()),
            token: token.map(|t| t.as_str().to_owned()),
            payload: Some(payload.into()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Repeated keys (e.g. two `uid` fields) are a decode error, not last-wins.
    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Identity named by the envelope, if present and non-empty.
    ///
    /// Available before the format check so rejections can still be
    /// attributed.
    pub fn actor(&self) -> Option<Identity> {
        self.identity
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(Identity::new)
    }

    /// Check the format half of the acceptance rule.
    ///
    /// Identity and payload must both be present and non-empty; the token is
    /// carried through untouched for the authority to compare against its
    /// binding table.
    pub fn into_request(self) -> Result<DeliveryRequest, DeliveryOutcome> {
        match (self.identity, self.payload) {
            (Some(identity), Some(payload)) if !identity.is_empty() && !payload.is_empty() => {
                Ok(DeliveryRequest {
                    identity: Identity::new(identity),
                    token: self.token,
                    payload,
                })
            }
            _ => Err(DeliveryOutcome::InvalidFormat),
        }
    }
}

/// An envelope that passed the format check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    pub identity: Identity,
    pub token: Option<String>,
    pub payload: String,
}

/// Result of a delivery, before it is serialized onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Accepted,
    InvalidFormat,
    InvalidToken,
    MalformedEnvelope,
}

/// What the authority writes back for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Close cleanly without writing; this is how success is signalled.
    Empty,
    /// Write the error text, then close.
    Text(&'static str),
    /// Write nothing and reset the connection so the participant cannot
    /// mistake it for a clean empty success.
    Abort,
}

impl DeliveryOutcome {
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn reply(self, policy: MalformedPolicy) -> Reply {
        match self {
            Self::Accepted => Reply::Empty,
            Self::InvalidFormat => Reply::Text(INVALID_FORMAT_ERROR),
            Self::InvalidToken => Reply::Text(INVALID_TOKEN_ERROR),
            Self::MalformedEnvelope => match policy {
                MalformedPolicy::Silent => Reply::Abort,
                MalformedPolicy::Respond => Reply::Text(MALFORMED_MESSAGE_ERROR),
            },
        }
    }
}
