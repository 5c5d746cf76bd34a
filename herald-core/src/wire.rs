//! Constants of the wire contract shared by authority and participant.
//!
//! Both exchanges are a single unframed request/response per TCP connection,
//! so every read on either side is bounded by one of the ceilings below.

/// Default bind/connect host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port of the enrollment endpoint.
pub const ENROLLMENT_PORT: u16 = 8000;

/// Port of the delivery endpoint.
pub const DELIVERY_PORT: u16 = 8001;

/// Ceiling for the raw identity read by the authority and for the token read
/// by the participant.
pub const ENROLLMENT_READ_LIMIT: usize = 100;

/// Ceiling for the envelope read by the authority.
pub const DELIVERY_READ_LIMIT: usize = 10_000;

/// Ceiling for the delivery response read by the participant.
pub const RESPONSE_READ_LIMIT: usize = 1_000;

/// Returned when `uid` or `msg` is missing or empty.
pub const INVALID_FORMAT_ERROR: &str = "Invalid message format";

/// Returned when the token is missing or does not match the bound token.
pub const INVALID_TOKEN_ERROR: &str = "Invalid token error";

/// Returned for undecodable envelopes, only under [`MalformedPolicy::Respond`].
pub const MALFORMED_MESSAGE_ERROR: &str = "Malformed message";

/// What the authority does when a delivery body cannot be decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MalformedPolicy {
    /// Write nothing and abort the connection (compatible behaviour).
    #[default]
    Silent,
    /// Write [`MALFORMED_MESSAGE_ERROR`] before closing (strict mode).
    Respond,
}
