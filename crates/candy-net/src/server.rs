//! # Vending Server
//!
//! HTTP/1.1 over mutual TLS. One route, `POST /buy_candy`, hands the decoded
//! order to the [`TransactionProcessor`] and writes back the outcome.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vending Server                                   │
//! │                                                                         │
//! │  accept_connections() ──► Incoming ──► serve loop                       │
//! │                                           │  one task per channel       │
//! │                                           ▼                             │
//! │                              hyper http1 ◄─► axum Router                │
//! │                                                │                        │
//! │                     POST /buy_candy ───────────┤                        │
//! │                     anything else ──► 405      │                        │
//! │                                                ▼                        │
//! │                     decode_order ── fail ──► 400 "Bad Request"          │
//! │                          │                                              │
//! │                          ▼                                              │
//! │                 TransactionProcessor::process                           │
//! │                          │                                              │
//! │        Accepted ► 201   InsufficientFunds ► 402   Rejected ► 400        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use futures_util::StreamExt;
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, info_span, warn};
use uuid::Uuid;

use candy_core::codec::{decode_order, encode_outcome};
use candy_core::{TransactionOutcome, TransactionProcessor};

use crate::config::ServerSettings;
use crate::credentials::CredentialSet;
use crate::error::TransportResult;
use crate::identity::{accept_connections, Incoming, ServerChannel};

// =============================================================================
// Constants
// =============================================================================

/// The only route the server answers.
pub const BUY_CANDY_PATH: &str = "/buy_candy";

/// How long shutdown waits for open connections before cutting them off.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Router
// =============================================================================

/// Builds the HTTP router around a processor.
pub fn router(processor: TransactionProcessor) -> Router {
    Router::new()
        .route(BUY_CANDY_PATH, post(buy_candy).fallback(method_not_allowed))
        .fallback(method_not_allowed)
        .with_state(processor)
}

/// Maps an outcome to its HTTP status.
pub fn status_for(outcome: &TransactionOutcome) -> StatusCode {
    match outcome {
        TransactionOutcome::Accepted { .. } => StatusCode::CREATED,
        TransactionOutcome::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        TransactionOutcome::Rejected { .. } => StatusCode::BAD_REQUEST,
    }
}

async fn buy_candy(State(processor): State<TransactionProcessor>, body: Bytes) -> Response {
    let transaction_id = Uuid::new_v4();
    let span = info_span!("transaction", %transaction_id);

    span.in_scope(|| {
        let order = match decode_order(&body) {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Malformed order");
                return (StatusCode::BAD_REQUEST, "Bad Request").into_response();
            }
        };

        debug!(
            funds = order.funds,
            kind = %order.kind,
            quantity = order.quantity,
            "Order received"
        );

        let outcome = processor.process(&order);
        let status = status_for(&outcome);

        info!(
            outcome = outcome.kind_name(),
            status = status.as_u16(),
            "Transaction complete"
        );

        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            encode_outcome(&outcome),
        )
            .into_response()
    })
}

async fn method_not_allowed() -> impl IntoResponse {
    (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

/// Serves HTTP on one channel until the peer closes it.
async fn serve_channel(channel: ServerChannel, app: Router) {
    let peer = channel.peer_addr();
    let io = TokioIo::new(channel.into_stream());
    let service = TowerToHyperService::new(app);

    if let Err(e) = hyper::server::conn::http1::Builder::new()
        .serve_connection(io, service)
        .await
    {
        warn!(peer = %peer, error = %e, "Connection error");
    } else {
        debug!(peer = %peer, "Connection closed");
    }
}

// =============================================================================
// Vending Server
// =============================================================================

/// The vending server: settings, credentials and the processor it drives.
pub struct VendingServer {
    settings: ServerSettings,
    credentials: Arc<CredentialSet>,
    processor: TransactionProcessor,
}

/// Handle for a running server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stops accepting, then waits for open connections to finish.
    pub async fn shutdown(self) {
        // The loop may already be gone; joining below covers both cases
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(?e, "Server task ended abnormally");
        }
    }
}

impl VendingServer {
    pub fn new(
        settings: ServerSettings,
        credentials: Arc<CredentialSet>,
        processor: TransactionProcessor,
    ) -> Self {
        VendingServer {
            settings,
            credentials,
            processor,
        }
    }

    /// Binds and starts serving in the background.
    pub async fn start(self) -> TransportResult<ServerHandle> {
        let incoming = accept_connections(
            &self.credentials,
            &self.settings.bind_address(),
            self.settings.handshake_timeout(),
        )
        .await?;
        let local_addr = incoming.local_addr();

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let candies = self.processor.prices().len();
        let app = router(self.processor);

        info!(addr = %local_addr, candies, "Vending server started");

        let task = tokio::spawn(serve_loop(incoming, app, shutdown_rx));

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }
}

async fn serve_loop(
    mut incoming: Incoming,
    app: Router,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Vending server shutting down");
                break;
            }
            next = incoming.next() => match next {
                Some(channel) => {
                    connections.spawn(serve_channel(channel, app.clone()));
                }
                None => break,
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(incoming);

    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
        warn!(
            remaining = connections.len(),
            "Closing connections still open after drain timeout"
        );
    }

    info!("Vending server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use candy_core::pleasantry::Plain;
    use candy_core::PriceTable;
    use http_body_util::BodyExt;

    fn processor() -> TransactionProcessor {
        TransactionProcessor::new(PriceTable::default(), Arc::new(Plain))
    }

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&TransactionOutcome::Accepted {
                pleasantry: "hi".into(),
                change: 0
            }),
            StatusCode::CREATED
        );
        assert_eq!(
            status_for(&TransactionOutcome::InsufficientFunds { shortfall: 1 }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_for(&TransactionOutcome::rejected("Invalid candy type")),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_buy_candy_accepted() {
        let body = Bytes::from_static(br#"{"money": 50, "candyType": "CE", "candyCount": 3}"#);
        let response = buy_candy(State(processor()), body).await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        let value: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value, serde_json::json!({ "thanks": "Thank you!", "change": 20 }));
    }

    #[tokio::test]
    async fn test_buy_candy_insufficient_funds() {
        let body = Bytes::from_static(br#"{"money": 20, "candyType": "AA", "candyCount": 2}"#);
        let response = buy_candy(State(processor()), body).await;

        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(
            body_string(response).await,
            r#"{"error":"You need 10 more money!"}"#
        );
    }

    #[tokio::test]
    async fn test_buy_candy_malformed_body() {
        let body = Bytes::from_static(br#"{"money": 20, "candyType": "AA"}"#);
        let response = buy_candy(State(processor()), body).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Bad Request");
    }
}
