//! Authority configuration.
//!
//! Values come from command-line flags with `HERALD_*` environment fallbacks
//! (a `.env` file is honoured via dotenvy in `main`). Defaults reproduce the
//! fixed ports and read ceilings of the wire contract.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use herald_core::wire::{DEFAULT_HOST, DELIVERY_PORT, ENROLLMENT_PORT};
use herald_core::MalformedPolicy;

/// Default per-connection idle timeout.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default log file, mirrored next to the terminal output.
pub const DEFAULT_LOG_FILE: &str = "server_log.txt";

/// Runtime configuration of the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityConfig {
    /// Host both listeners bind to.
    pub host: String,
    pub enrollment_port: u16,
    pub delivery_port: u16,
    /// How long a connection may stay silent before it is dropped.
    pub idle_timeout: Duration,
    /// Bound on the binding table; `None` keeps every identity forever.
    pub max_bindings: Option<NonZeroUsize>,
    pub malformed_policy: MalformedPolicy,
}

impl AuthorityConfig {
    /// Config binding both endpoints to ephemeral loopback ports.
    pub fn ephemeral() -> Self {
        Self {
            enrollment_port: 0,
            delivery_port: 0,
            ..Self::default()
        }
    }

    pub fn enrollment_addr(&self) -> String {
        format!("{}:{}", self.host, self.enrollment_port)
    }

    pub fn delivery_addr(&self) -> String {
        format!("{}:{}", self.host, self.delivery_port)
    }
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            enrollment_port: ENROLLMENT_PORT,
            delivery_port: DELIVERY_PORT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            max_bindings: None,
            malformed_policy: MalformedPolicy::Silent,
        }
    }
}

/// Flags accepted by `herald-daemon serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Host to bind both listeners to
    #[arg(long, env = "HERALD_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Enrollment endpoint port
    #[arg(long, env = "HERALD_ENROLL_PORT", default_value_t = ENROLLMENT_PORT)]
    pub enroll_port: u16,

    /// Delivery endpoint port
    #[arg(long, env = "HERALD_DELIVER_PORT", default_value_t = DELIVERY_PORT)]
    pub deliver_port: u16,

    /// Seconds a connection may stay idle before it is dropped
    #[arg(long, env = "HERALD_IDLE_TIMEOUT", default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub idle_timeout: u64,

    /// Evict the oldest binding beyond this many identities (unbounded if unset)
    #[arg(long, env = "HERALD_MAX_BINDINGS")]
    pub max_bindings: Option<NonZeroUsize>,

    /// Answer undecodable messages with an error instead of resetting the connection
    #[arg(long, env = "HERALD_STRICT")]
    pub strict: bool,

    /// File that mirrors the log output
    #[arg(long, env = "HERALD_LOG_FILE", default_value = DEFAULT_LOG_FILE)]
    pub log_file: PathBuf,

    /// Log to the terminal only
    #[arg(long)]
    pub no_log_file: bool,
}

impl ServeArgs {
    /// Log file to open, if any.
    pub fn log_file(&self) -> Option<&PathBuf> {
        (!self.no_log_file).then_some(&self.log_file)
    }
}

impl From<&ServeArgs> for AuthorityConfig {
    fn from(args: &ServeArgs) -> Self {
        Self {
            host: args.host.clone(),
            enrollment_port: args.enroll_port,
            delivery_port: args.deliver_port,
            idle_timeout: Duration::from_secs(args.idle_timeout),
            max_bindings: args.max_bindings,
            malformed_policy: if args.strict {
                MalformedPolicy::Respond
            } else {
                MalformedPolicy::Silent
            },
        }
    }
}
