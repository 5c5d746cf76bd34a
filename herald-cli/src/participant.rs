//! Client side of the enrollment and delivery exchanges.
//!
//! A [`Participant`] owns one identity for its whole life. It enrolls to get a
//! token and then delivers any number of payloads under that token, each over
//! a fresh connection.

use herald_core::wire::{
    DEFAULT_HOST, DELIVERY_PORT, ENROLLMENT_PORT, ENROLLMENT_READ_LIMIT, RESPONSE_READ_LIMIT,
};
use herald_core::{Envelope, EnvelopeError, Identity, Token};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Where the authority listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub host: String,
    pub enrollment_port: u16,
    pub delivery_port: u16,
}

impl Endpoints {
    pub fn enrollment(&self) -> (&str, u16) {
        (&self.host, self.enrollment_port)
    }

    pub fn delivery(&self) -> (&str, u16) {
        (&self.host, self.delivery_port)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            enrollment_port: ENROLLMENT_PORT,
            delivery_port: DELIVERY_PORT,
        }
    }
}

/// Enrollment failed locally; the participant keeps whatever token it had.
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("Unable to establish server connection: {0}")]
    Connect(#[source] std::io::Error),
    #[error("Unable to get token: {0}")]
    Io(#[source] std::io::Error),
}

/// Why a payload was not delivered.
///
/// [`DeliveryError::Rejected`] carries the authority's own error text; the
/// other variants are synthesized locally.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("{0}")]
    Rejected(String),
    #[error("Unable to establish server connection: {0}")]
    Connect(#[source] std::io::Error),
    #[error("Unable to send message: {0}")]
    Io(#[source] std::io::Error),
    #[error("Unable to send message: {0}")]
    Encode(#[from] EnvelopeError),
}

impl DeliveryError {
    /// The authority's error text, if the authority answered at all.
    pub fn rejection(&self) -> Option<&str> {
        match self {
            Self::Rejected(text) => Some(text),
            _ => None,
        }
    }
}

pub struct Participant {
    identity: Identity,
    token: Option<Token>,
    endpoints: Endpoints,
}

impl Participant {
    /// New participant with a random identity and no token.
    pub fn new(endpoints: Endpoints) -> Self {
        Self::with_identity(Identity::generate(), endpoints)
    }

    pub fn with_identity(identity: Identity, endpoints: Endpoints) -> Self {
        Self {
            identity,
            token: None,
            endpoints,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Enroll the identity and keep the issued token.
    ///
    /// Replaces any previous token on success. No retry on failure.
    pub async fn enroll(&mut self) -> Result<&Token, EnrollError> {
        let mut stream = TcpStream::connect(self.endpoints.enrollment())
            .await
            .map_err(EnrollError::Connect)?;

        let identity = self.identity.as_str().as_bytes();
        let response = request(&mut stream, identity, ENROLLMENT_READ_LIMIT)
            .await
            .map_err(EnrollError::Io)?;

        tracing::debug!(identity = %self.identity, "Enrolled");
        Ok(&*self.token.insert(Token::from_wire(&response)))
    }

    /// Deliver one payload under the current token.
    ///
    /// An empty response means the authority accepted it. Sending before
    /// enrolling is allowed; the authority rejects it.
    pub async fn deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        let body = Envelope::new(&self.identity, self.token.as_ref(), payload).encode()?;

        let mut stream = TcpStream::connect(self.endpoints.delivery())
            .await
            .map_err(DeliveryError::Connect)?;

        let response = request(&mut stream, &body, RESPONSE_READ_LIMIT)
            .await
            .map_err(DeliveryError::Io)?;

        if response.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError::Rejected(
                String::from_utf8_lossy(&response).into_owned(),
            ))
        }
    }
}

/// Write `body`, then take a single read of at most `limit` bytes.
async fn request(stream: &mut TcpStream, body: &[u8], limit: usize) -> std::io::Result<Vec<u8>> {
    stream.write_all(body).await?;
    stream.flush().await?;

    let mut buf = vec![0u8; limit];
    let n = stream.read(&mut buf).await?;
    buf.truncate(n);

    // Peer may already be gone; the response is what matters.
    let _ = stream.shutdown().await;
    Ok(buf)
}
