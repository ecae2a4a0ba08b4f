//! # Transaction Client
//!
//! Submits one order over a fresh mutually trusted channel and returns the
//! server's decision. One channel, one request, no retries.
//!
//! ## Failure Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  connect refused / timed out          → TrustError::Unreachable         │
//! │  handshake failed, or a TLS alert     → TrustError::UntrustedPeer       │
//! │  surfaces later in the exchange                                         │
//! │  HTTP framing failure                 → TransportError::Http            │
//! │  body is an outcome envelope          → Ok(outcome), whatever status    │
//! │  shortfall text without 402           → Rejected, not InsufficientFunds │
//! │  non-2xx and body is not an envelope  → TransportError::UnexpectedStatus│
//! │  2xx and body is not an envelope      → DecodeError                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{CONTENT_TYPE, HOST};
use hyper::{Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::time::timeout;
use tracing::debug;

use candy_core::codec::{decode_outcome, encode_order};
use candy_core::{insufficient_funds_reason, Order, TransactionOutcome};

use crate::config::ClientSettings;
use crate::credentials::CredentialSet;
use crate::error::{ClientError, ClientResult, TransportError, TrustError};
use crate::identity::{establish_client_channel_with_timeout, DEFAULT_CONNECT_TIMEOUT};
use crate::server::BUY_CANDY_PATH;

/// Submits orders to one server with one credential set.
#[derive(Debug, Clone)]
pub struct TransactionClient {
    credentials: Arc<CredentialSet>,
    server_address: String,
    timeout: Duration,
}

impl TransactionClient {
    pub fn new(credentials: Arc<CredentialSet>, server_address: impl Into<String>) -> Self {
        TransactionClient {
            credentials,
            server_address: server_address.into(),
            timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Loads the client credentials named in `settings`.
    pub fn from_settings(settings: &ClientSettings) -> ClientResult<Self> {
        let credentials = CredentialSet::load(&settings.credentials)?;
        Ok(Self::new(Arc::new(credentials), settings.server_addr.clone())
            .with_timeout(settings.connect_timeout()))
    }

    /// Bounds channel establishment and, separately, the request exchange.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    /// Sends `order` and waits for the outcome.
    pub async fn submit(&self, order: &Order) -> ClientResult<TransactionOutcome> {
        let channel =
            establish_client_channel_with_timeout(&self.credentials, &self.server_address, self.timeout)
                .await?;
        let peer = channel.peer_addr();

        let (status, body) = timeout(self.timeout, self.exchange(channel.into_stream(), order))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout.as_secs()))??;

        debug!(peer = %peer, status, bytes = body.len(), "Response received");

        match decode_outcome(&body) {
            Ok(outcome) => Ok(reconcile(status, outcome)),
            Err(_) if !(200..300).contains(&status) => Err(TransportError::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).trim().to_string(),
            }
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exchange<S>(&self, stream: S, order: &Order) -> ClientResult<(u16, Bytes)>
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Send + Unpin + 'static,
    {
        let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .map_err(classify)?;
        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                debug!(error = %e, "Connection ended with error");
            }
        });

        let request = Request::builder()
            .method(Method::POST)
            .uri(BUY_CANDY_PATH)
            .header(HOST, self.server_address.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(encode_order(order))))
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let response = sender.send_request(request).await.map_err(classify)?;
        let status = response.status().as_u16();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(classify)?
            .to_bytes();

        drop(sender);
        connection.abort();

        Ok((status, body))
    }
}

/// The server reports a shortfall only with 402. Under any other status the
/// same text is an ordinary rejection reason.
fn reconcile(status: u16, outcome: TransactionOutcome) -> TransactionOutcome {
    match outcome {
        TransactionOutcome::InsufficientFunds { shortfall }
            if status != StatusCode::PAYMENT_REQUIRED.as_u16() =>
        {
            TransactionOutcome::rejected(insufficient_funds_reason(shortfall))
        }
        other => other,
    }
}

/// Submits one order with a one-off client.
pub async fn submit(
    credentials: Arc<CredentialSet>,
    server_address: &str,
    order: &Order,
) -> ClientResult<TransactionOutcome> {
    TransactionClient::new(credentials, server_address)
        .submit(order)
        .await
}

// =============================================================================
// Error Classification
// =============================================================================

fn classify(err: hyper::Error) -> ClientError {
    match tls_failure(&err) {
        Some(reason) => TrustError::UntrustedPeer(reason).into(),
        None => TransportError::Http(err.to_string()).into(),
    }
}

/// Finds a TLS error anywhere in the source chain. `io::Error` hides its
/// payload from `source()`, so it is unwrapped explicitly.
fn tls_failure(err: &(dyn StdError + 'static)) -> Option<String> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(tls) = e.downcast_ref::<rustls::Error>() {
            return Some(tls.to_string());
        }
        if let Some(tls) = e
            .downcast_ref::<std::io::Error>()
            .and_then(|io| io.get_ref())
            .and_then(|inner| inner.downcast_ref::<rustls::Error>())
        {
            return Some(tls.to_string());
        }
        current = e.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustls::AlertDescription;
    use std::io;

    #[derive(Debug)]
    struct Wrapper(io::Error);

    impl std::fmt::Display for Wrapper {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "request failed")
        }
    }

    impl StdError for Wrapper {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_tls_alert_inside_io_error_is_found() {
        let io_err = io::Error::new(
            io::ErrorKind::InvalidData,
            rustls::Error::AlertReceived(AlertDescription::BadCertificate),
        );
        assert!(tls_failure(&io_err).is_some());
        assert!(tls_failure(&Wrapper(io_err)).is_some());
    }

    #[test]
    fn test_plain_io_error_is_not_tls() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(tls_failure(&Wrapper(io_err)).is_none());
    }

    #[test]
    fn test_shortfall_text_follows_status() {
        let decoded = decode_outcome(br#"{"error":"You need 5 more money!"}"#).unwrap();

        assert_eq!(
            reconcile(402, decoded.clone()),
            TransactionOutcome::InsufficientFunds { shortfall: 5 }
        );
        assert_eq!(
            reconcile(400, decoded),
            TransactionOutcome::rejected("You need 5 more money!")
        );

        let accepted = TransactionOutcome::Accepted {
            pleasantry: "Thank you!".into(),
            change: 0,
        };
        assert_eq!(reconcile(201, accepted.clone()), accepted);
    }

    #[test]
    fn test_client_builder() {
        let settings = ClientSettings {
            credentials: crate::config::CredentialPaths {
                ca_cert: "/nonexistent/ca.pem".into(),
                cert: "/nonexistent/cert.pem".into(),
                key: "/nonexistent/key.pem".into(),
            },
            ..ClientSettings::default()
        };
        let err = TransactionClient::from_settings(&settings).unwrap_err();
        assert!(matches!(err, ClientError::Credential(_)));
    }
}
