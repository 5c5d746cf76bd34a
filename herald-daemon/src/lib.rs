//! Herald authority.
//!
//! Runs the enrollment and delivery listeners, owns the identity → token
//! binding table and authorizes every delivered message against it. The
//! `herald-daemon` binary wraps [`server::Authority`] with configuration,
//! logging and signal handling.

pub mod audit;
pub mod bindings;
pub mod config;
pub mod server;
pub mod services;
pub mod shutdown;

pub use bindings::{BindReport, BindingTable};
pub use config::{AuthorityConfig, ServeArgs};
pub use server::{Authority, ServeError};
