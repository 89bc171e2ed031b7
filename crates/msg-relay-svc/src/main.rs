//! Message Relay Service
//!
//! HTTP service that queues key-exchange frames between two parties.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use msg_relay::api::{NextRequest, NextResponse, PushRequest, PushResponse, NEXT_PATH, PUSH_PATH};
use msg_relay::{MailboxId, MessageStore, RelayError};
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, Level};

/// Relay service CLI arguments
#[derive(Parser, Debug)]
#[command(name = "msg-relay-svc")]
#[command(about = "Mailbox relay for key-exchange sessions")]
struct Config {
    /// Listen address
    #[arg(short, long, env = "RELAY_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// Seconds an undelivered frame is kept
    #[arg(long, env = "RELAY_TTL", default_value_t = 3600)]
    ttl: i64,

    /// Seconds between expiry sweeps
    #[arg(long, default_value_t = 60)]
    sweep_every: u64,
}

/// Handler failure mapped onto an HTTP status
#[derive(Debug)]
enum ApiError {
    BadPayload(String),
    Relay(RelayError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadPayload(reason) => (StatusCode::BAD_REQUEST, reason),
            ApiError::Relay(e @ RelayError::InvalidFormat(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Relay(e @ RelayError::MailboxFull(_)) => {
                (StatusCode::TOO_MANY_REQUESTS, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        ApiError::Relay(e)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(Level::INFO.into()),
        )
        .init();

    let config = Config::parse();
    info!(listen = %config.listen, ttl = config.ttl, "Starting relay");

    let store = MessageStore::new(config.ttl);
    spawn_sweeper(store.clone(), Duration::from_secs(config.sweep_every.max(1)));

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    info!(address = %config.listen, "Listening");
    axum::serve(listener, app(store)).await?;

    Ok(())
}

/// Periodically drop expired frames
fn spawn_sweeper(store: MessageStore, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            store.cleanup();
        }
    });
}

fn app(store: MessageStore) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(PUSH_PATH, post(push))
        .route(NEXT_PATH, post(next))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(store)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn push(
    State(store): State<MessageStore>,
    Json(req): Json<PushRequest>,
) -> Result<Json<PushResponse>, ApiError> {
    let payload = req
        .decode_payload()
        .map_err(|e| ApiError::BadPayload(format!("Invalid base64: {e}")))?;

    let id = store.push(&MailboxId::new(&req.session_id, req.to), req.from, payload)?;
    info!(session_id = %req.session_id, from = req.from, to = req.to, "Frame queued");

    Ok(Json(PushResponse { id }))
}

async fn next(State(store): State<MessageStore>, Json(req): Json<NextRequest>) -> Json<NextResponse> {
    let delivered = store.pop(&MailboxId::new(&req.session_id, req.to));
    Json(match delivered {
        Some(msg) => {
            debug!(session_id = %req.session_id, to = req.to, from = msg.from, "Frame delivered");
            NextResponse::delivered(msg.from, &msg.payload)
        }
        None => NextResponse::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_req(from: usize, to: usize, payload: &[u8]) -> Json<PushRequest> {
        Json(PushRequest::new("abcd".into(), from, to, payload))
    }

    #[tokio::test]
    async fn test_push_then_next() {
        let store = MessageStore::default();

        let Json(queued) = push(State(store.clone()), push_req(0, 1, b"1234,7359"))
            .await
            .unwrap();
        assert!(!queued.id.is_nil());

        let Json(reply) = next(
            State(store.clone()),
            Json(NextRequest {
                session_id: "abcd".into(),
                to: 1,
            }),
        )
        .await;
        assert_eq!(reply.from, Some(0));
        assert_eq!(reply.decode_payload().unwrap(), Some(b"1234,7359".to_vec()));

        let Json(empty) = next(
            State(store),
            Json(NextRequest {
                session_id: "abcd".into(),
                to: 1,
            }),
        )
        .await;
        assert!(empty.payload.is_none());
    }

    #[tokio::test]
    async fn test_bad_base64_is_bad_request() {
        let mut req = PushRequest::new("abcd".into(), 0, 1, b"");
        req.payload = "not base64!".into();
        let err = push(State(MessageStore::default()), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_self_addressed_is_bad_request() {
        let err = push(State(MessageStore::default()), push_req(1, 1, b"x"))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_mailbox_full_is_too_many_requests() {
        let err = ApiError::from(RelayError::MailboxFull("abcd".into()));
        assert_eq!(err.into_response().status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::try_parse_from(["msg-relay-svc"]).unwrap();
        assert_eq!(config.ttl, 3600);
        assert_eq!(config.listen, "0.0.0.0:8080");
    }

    /// Serve the relay on an ephemeral port and return its base URL
    async fn spawn_relay() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(MessageStore::default()))
                .await
                .unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_frames_cross_relay_in_order() {
        use ake_core::session::ACK_TEXT;
        use ake_core::transport::{Frame, Transport};
        use msg_relay_client::RelayTransport;
        use num_bigint::BigUint;

        let url = spawn_relay().await;
        let alice = RelayTransport::new(&url, 0);
        let bob = RelayTransport::new(&url, 1);
        let session_id = [9u8; 32];
        let timeout = Duration::from_secs(5);

        let hello = Frame::Integers(vec![
            BigUint::from(1234u32),
            BigUint::from(7359u32),
            BigUint::from(5u32),
            BigUint::from(10007u32),
        ]);
        let ack = Frame::Text(ACK_TEXT.to_string());
        alice.send(&session_id, 1, &hello).await.unwrap();
        alice.send(&session_id, 1, &ack).await.unwrap();

        assert_eq!(bob.receive(&session_id, 1, timeout).await.unwrap(), hello);
        assert_eq!(bob.receive(&session_id, 1, timeout).await.unwrap(), ack);
        assert!(matches!(
            bob.receive(&session_id, 1, Duration::from_millis(300)).await,
            Err(ake_core::Error::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_session_over_relay() {
        use ake_core::keygen::generate_keys;
        use ake_core::random::RngSource;
        use ake_core::session::run_session;
        use ake_core::{KeyGenConfig, Role, SessionConfig};
        use msg_relay_client::RelayTransport;
        use num_bigint::BigUint;
        use rand_chacha::rand_core::SeedableRng;
        use rand_chacha::ChaCha20Rng;

        let url = spawn_relay().await;
        let keys = generate_keys(
            &KeyGenConfig::with_modulus(BigUint::from(10007u32)),
            &mut RngSource::new(ChaCha20Rng::seed_from_u64(5)),
        )
        .unwrap();

        let timeout = Duration::from_secs(10);
        let initiator = SessionConfig::new(Role::Initiator, 0, 1)
            .with_timeout(timeout)
            .with_plaintext(BigUint::from(42u32));
        let responder = SessionConfig::new(Role::Responder, 1, 0)
            .with_session_id(initiator.session_id)
            .with_timeout(timeout);

        let alice = RelayTransport::new(&url, 0);
        let bob = RelayTransport::new(&url, 1);
        let mut alice_rng = RngSource::new(ChaCha20Rng::seed_from_u64(6));
        let mut bob_rng = RngSource::new(ChaCha20Rng::seed_from_u64(7));

        let (alice_report, bob_report) = tokio::join!(
            run_session(&initiator, &keys, &mut alice_rng, &alice),
            run_session(&responder, &keys, &mut bob_rng, &bob),
        );

        assert!(alice_report.is_success(), "{:?}", alice_report.error());
        assert!(bob_report.is_success(), "{:?}", bob_report.error());

        let alice_summary = alice_report.summary().unwrap();
        let bob_summary = bob_report.summary().unwrap();
        assert_eq!(alice_summary.session_key, bob_summary.session_key);
        assert_eq!(bob_summary.plaintext, BigUint::from(42u32));
    }
}
