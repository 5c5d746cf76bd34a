//! Herald participant.
//!
//! [`participant::Participant`] speaks the client half of the enrollment and
//! delivery exchanges; [`commands`] builds the `herald` subcommands on top.

pub mod commands;
pub mod participant;

pub use participant::{DeliveryError, EnrollError, Endpoints, Participant};
