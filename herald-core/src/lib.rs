//! # Herald Core
//!
//! Pure domain types for the Herald enrollment/delivery protocol.
//!
//! ## Design Principles
//!
//! This crate is intentionally **IO-free**:
//! - No network calls
//! - No filesystem operations
//! - No logging
//!
//! The authority (`herald-daemon`) and the participant (`herald-cli`) both
//! depend on it, so the wire contract between them lives in exactly one place.
//!
//! ## Modules
//!
//! - [`identity`] - Participant identities and authority-issued tokens
//! - [`envelope`] - The delivery envelope and its validation outcome
//! - [`wire`] - Ports, read ceilings and error literals of the wire contract
//! - [`audit`] - Audit records for enrollments and deliveries

pub mod audit;
pub mod envelope;
pub mod identity;
pub mod wire;

pub use audit::{AuditAction, AuditEvent};
pub use envelope::{DeliveryOutcome, DeliveryRequest, Envelope, EnvelopeError, Reply};
pub use identity::{Identity, Token};
pub use wire::MalformedPolicy;
