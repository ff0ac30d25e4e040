//! HTTP surface
//!
//! Public routes cover the marketplace write paths (list an item, record a
//! deposit, open a dispute). Admin routes (the sweep trigger, dispute
//! resolution, and reconciliation) sit behind a shared-secret bearer
//! token. Both admin entry points run the exact same resolver code path as
//! internal tooling; there is only one.

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use holdfast_coordinator::{
    DepositRequest, DisputeResolver, EscrowCoordinator, ReconcileOutcome,
};
use holdfast_ledger::LedgerStore;
use holdfast_types::{
    EscrowStatus, HoldfastError, Item, ItemId, Resolution, SweepReport, Transaction,
    TransactionId, WalletAddress, DEFAULT_ESCROW_DURATION_SECS,
};

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub coordinator: Arc<EscrowCoordinator>,
    pub resolver: Arc<DisputeResolver>,
    pub admin_token: String,
    /// Chain assumed for deposits that do not name one
    pub default_chain_id: i64,
}

/// Build the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/admin/sweep", post(run_sweep))
        .route("/admin/transactions/:id/resolve", post(resolve_dispute))
        .route("/admin/transactions/:id/reconcile", post(reconcile_transaction))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .route("/health", get(health))
        .route("/items", post(create_item))
        .route("/transactions", post(record_deposit))
        .route("/transactions/:id", get(get_transaction))
        .route("/transactions/:id/dispute", post(open_dispute))
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Errors
// ============================================================================

/// JSON error body: `{code, message}`
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

struct ApiError(HoldfastError);

impl From<HoldfastError> for ApiError {
    fn from(e: HoldfastError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            HoldfastError::TransactionNotFound { .. }
            | HoldfastError::ItemNotFound { .. }
            | HoldfastError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            HoldfastError::ClaimLost { .. } => StatusCode::CONFLICT,
            HoldfastError::NotBuyer { .. } => StatusCode::FORBIDDEN,
            HoldfastError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            HoldfastError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            HoldfastError::ChainCall { .. }
            | HoldfastError::ChainTimeout { .. }
            | HoldfastError::Timer { .. } => StatusCode::BAD_GATEWAY,
            // Needs an operator; deliberately not the conflict status
            HoldfastError::LedgerInconsistent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            HoldfastError::Ledger { .. } | HoldfastError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorBody {
            code: self.0.error_code(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Auth
// ============================================================================

fn token_matches(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| HoldfastError::unauthorized("missing bearer token"))?;

    if !token_matches(provided, &state.admin_token) {
        return Err(HoldfastError::unauthorized("invalid bearer token").into());
    }
    Ok(next.run(request).await)
}

// ============================================================================
// Request/response bodies
// ============================================================================

#[derive(Debug, Deserialize)]
struct CreateItemRequest {
    title: String,
    price_usd: f64,
    escrow_duration_secs: Option<i64>,
    seller_wallet: String,
}

#[derive(Debug, Deserialize)]
struct RecordDepositRequest {
    item_id: String,
    buyer_wallet: String,
    escrow_registration: i64,
    chain_id: Option<i64>,
    deposit_tx_hash: String,
}

#[derive(Debug, Deserialize)]
struct DisputeRequest {
    wallet: String,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    resolution: Resolution,
}

#[derive(Debug, Serialize)]
struct ResolveResponse {
    status: EscrowStatus,
    tx_hash: String,
}

#[derive(Debug, Serialize)]
struct ReconcileResponse {
    action: &'static str,
    status: Option<EscrowStatus>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let database = state.store.ping().await;
    Json(HealthResponse {
        status: if database { "ok" } else { "degraded" },
        database,
    })
}

async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    if req.price_usd <= 0.0 {
        return Err(HoldfastError::invalid_input("price_usd", "must be positive").into());
    }
    if req.title.trim().is_empty() {
        return Err(HoldfastError::invalid_input("title", "must not be empty").into());
    }

    let seller = WalletAddress::new(req.seller_wallet);
    state.store.upsert_user(&seller).await?;

    let item = Item {
        id: ItemId::new(),
        title: req.title,
        price_usd: req.price_usd,
        escrow_duration_secs: req
            .escrow_duration_secs
            .unwrap_or(DEFAULT_ESCROW_DURATION_SECS),
        seller_wallet: seller,
        created_at: Utc::now(),
    };
    state.store.create_item(&item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn record_deposit(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecordDepositRequest>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    let item_id = ItemId::parse(&req.item_id)
        .map_err(|_| HoldfastError::invalid_input("item_id", "not a valid id"))?;

    let tx = state
        .coordinator
        .record_deposit(DepositRequest {
            item_id,
            buyer_wallet: WalletAddress::new(req.buyer_wallet),
            escrow_registration: req.escrow_registration,
            chain_id: req.chain_id.unwrap_or(state.default_chain_id),
            deposit_tx_hash: req.deposit_tx_hash,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(tx)))
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Transaction>, ApiError> {
    let id = parse_transaction_id(&id)?;
    Ok(Json(state.store.get_transaction(id).await?))
}

async fn open_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<DisputeRequest>,
) -> Result<Json<Transaction>, ApiError> {
    let id = parse_transaction_id(&id)?;
    let wallet = WalletAddress::new(req.wallet);
    Ok(Json(state.coordinator.open_dispute(id, &wallet).await?))
}

async fn resolve_dispute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, ApiError> {
    let id = parse_transaction_id(&id)?;
    let outcome = state.resolver.resolve(id, req.resolution).await?;
    Ok(Json(ResolveResponse {
        status: outcome.transaction.escrow_status,
        tx_hash: outcome.tx_hash,
    }))
}

async fn run_sweep(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SweepReport>>, ApiError> {
    Ok(Json(state.coordinator.sweep().await?))
}

async fn reconcile_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let id = parse_transaction_id(&id)?;
    let response = match state.coordinator.reconcile(id).await? {
        ReconcileOutcome::Finalized(status) => ReconcileResponse {
            action: "finalized",
            status: Some(status),
        },
        ReconcileOutcome::Reverted(status) => ReconcileResponse {
            action: "reverted",
            status: Some(status),
        },
        ReconcileOutcome::NoAction => ReconcileResponse {
            action: "no_action",
            status: None,
        },
    };
    Ok(Json(response))
}

fn parse_transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    TransactionId::parse(raw)
        .map_err(|_| HoldfastError::invalid_input("transaction_id", "not a valid id").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use holdfast_chain::MockChainGateway;
    use holdfast_coordinator::{CoordinatorConfig, TracingNotifier};
    use holdfast_ledger::MemoryLedgerStore;
    use holdfast_reputation::{ReputationRecorder, TracingTierLog};
    use holdfast_timer::MemoryTimerService;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const TOKEN: &str = "test-operator-token";

    struct TestServer {
        router: Router,
        chain: Arc<MockChainGateway>,
        timers: Arc<MemoryTimerService>,
        store: Arc<MemoryLedgerStore>,
    }

    fn test_server() -> TestServer {
        let store = Arc::new(MemoryLedgerStore::new());
        let chain = Arc::new(MockChainGateway::new());
        let timers = Arc::new(MemoryTimerService::new());
        let recorder = Arc::new(ReputationRecorder::new(
            store.clone(),
            Arc::new(TracingTierLog),
        ));

        let coordinator = Arc::new(EscrowCoordinator::new(
            store.clone(),
            chain.clone(),
            timers.clone(),
            recorder.clone(),
            CoordinatorConfig::default(),
        ));
        let resolver = Arc::new(DisputeResolver::new(
            store.clone(),
            chain.clone(),
            recorder,
            Arc::new(TracingNotifier),
        ));

        let state = Arc::new(AppState {
            store: store.clone(),
            coordinator,
            resolver,
            admin_token: TOKEN.to_string(),
            default_chain_id: 8453,
        });

        TestServer {
            router: create_router(state),
            chain,
            timers,
            store,
        }
    }

    async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_admin(uri: &str, body: Value, token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    /// List an item and record a funded deposit; returns (item_id, tx_id)
    async fn seed_purchase(server: &TestServer) -> (String, String) {
        let (status, item) = send(
            &server.router,
            post_json(
                "/items",
                json!({
                    "title": "vintage synth",
                    "price_usd": 100.0,
                    "seller_wallet": "0xSeller"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_str().unwrap().to_string();

        server
            .chain
            .fund(7, 8453, &WalletAddress::new("0xBuyer"), 1_000_000)
            .await;
        let (status, tx) = send(
            &server.router,
            post_json(
                "/transactions",
                json!({
                    "item_id": item_id,
                    "buyer_wallet": "0xBuyer",
                    "escrow_registration": 7,
                    "deposit_tx_hash": "0xdeposit"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{:?}", tx);
        (item_id, tx["id"].as_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = test_server();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&server.router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn admin_routes_require_bearer_token() {
        let server = test_server();

        let (status, body) = send(&server.router, post_json("/admin/sweep", json!({}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHORIZED");

        let (status, _) = send(
            &server.router,
            post_admin("/admin/sweep", json!({}), "wrong-token-entirely"),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&server.router, post_admin("/admin/sweep", json!({}), TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn deposit_then_sweep_releases_after_timer_fires() {
        let server = test_server();
        let (_, tx_id) = seed_purchase(&server).await;

        let (status, reports) =
            send(&server.router, post_admin("/admin/sweep", json!({}), TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports[0]["outcome"], "pending");

        let id = TransactionId::parse(&tx_id).unwrap();
        let handle = server
            .store
            .get_transaction(id)
            .await
            .unwrap()
            .timer_handle
            .unwrap();
        server.timers.fire(&handle).await;

        let (status, reports) =
            send(&server.router, post_admin("/admin/sweep", json!({}), TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports[0]["outcome"], "released");
        assert_eq!(server.chain.slot_value(7, 8453).await, Some(0));
    }

    #[tokio::test]
    async fn dispute_and_resolve_round_trip() {
        let server = test_server();
        let (_, tx_id) = seed_purchase(&server).await;

        let (status, body) = send(
            &server.router,
            post_json(
                &format!("/transactions/{}/dispute", tx_id),
                json!({"wallet": "0xBUYER"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{:?}", body);
        assert_eq!(body["escrow_status"], "disputed");

        let (status, body) = send(
            &server.router,
            post_admin(
                &format!("/admin/transactions/{}/resolve", tx_id),
                json!({"resolution": "refund"}),
                TOKEN,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{:?}", body);
        assert_eq!(body["status"], "refunded");
        assert!(body["tx_hash"].as_str().unwrap().starts_with("0xrefund"));
    }

    #[tokio::test]
    async fn second_resolution_conflicts() {
        let server = test_server();
        let (_, tx_id) = seed_purchase(&server).await;

        send(
            &server.router,
            post_json(
                &format!("/transactions/{}/dispute", tx_id),
                json!({"wallet": "0xbuyer"}),
            ),
        )
        .await;
        let resolve_uri = format!("/admin/transactions/{}/resolve", tx_id);
        let (status, _) = send(
            &server.router,
            post_admin(&resolve_uri, json!({"resolution": "release"}), TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &server.router,
            post_admin(&resolve_uri, json!({"resolution": "refund"}), TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CLAIM_LOST");
    }

    #[tokio::test]
    async fn dispute_by_non_buyer_is_forbidden() {
        let server = test_server();
        let (_, tx_id) = seed_purchase(&server).await;

        let (status, body) = send(
            &server.router,
            post_json(
                &format!("/transactions/{}/dispute", tx_id),
                json!({"wallet": "0xSomeoneElse"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "NOT_BUYER");
    }

    #[tokio::test]
    async fn unknown_transaction_is_404() {
        let server = test_server();
        let (status, body) = send(
            &server.router,
            post_admin(
                &format!("/admin/transactions/{}/resolve", TransactionId::new()),
                json!({"resolution": "refund"}),
                TOKEN,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "TRANSACTION_NOT_FOUND");
    }

    #[tokio::test]
    async fn invalid_item_is_rejected() {
        let server = test_server();
        let (status, body) = send(
            &server.router,
            post_json(
                "/items",
                json!({
                    "title": "free stuff",
                    "price_usd": 0.0,
                    "seller_wallet": "0xSeller"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_INPUT");
    }

    #[test]
    fn token_compare_is_length_guarded() {
        assert!(token_matches("abc", "abc"));
        assert!(!token_matches("abc", "abd"));
        assert!(!token_matches("abc", "abcd"));
        assert!(!token_matches("", "abc"));
    }
}
