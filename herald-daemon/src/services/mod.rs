//! Per-connection exchange handlers.
//!
//! Each handler performs exactly one bounded read and at most one write on a
//! stream it borrows; closing (or resetting) the connection is left to the
//! accept loop that owns the socket.

mod delivery;
mod enrollment;

use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};

pub use delivery::DeliveryService;
pub use enrollment::EnrollmentService;

/// Errors that end an exchange without a protocol response.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("connection idle for {0:?}")]
    IdleTimeout(Duration),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Perform the single bounded read of an exchange.
///
/// Returns whatever the first read yields, up to `limit` bytes; an immediate
/// EOF yields an empty buffer.
async fn read_once<R: AsyncRead + Unpin>(
    reader: &mut R,
    limit: usize,
    idle_timeout: Duration,
) -> Result<BytesMut, ExchangeError> {
    let mut buf = BytesMut::with_capacity(limit);
    buf.resize(limit, 0);

    let n = tokio::time::timeout(idle_timeout, reader.read(&mut buf))
        .await
        .map_err(|_| ExchangeError::IdleTimeout(idle_timeout))??;
    buf.truncate(n);

    Ok(buf)
}
