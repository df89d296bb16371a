use axum::body::Bytes;
use axum::http::StatusCode;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use axum_extra::TypedHeader;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roulette_core::{
    color_of, verify, verify_commitment, ClientSeedPolicy, EntropySource, OsEntropy, RngConfig, RouletteRng,
    SpinResult,
};
use roulette_shared::{
    ApiError, CommitmentResponse, ErrorBody, RotationResponse, SpinRequest, SpinResponse, VerifyRequest,
    VerifyResponse,
};

type Rng = RouletteRng<Box<dyn EntropySource>>;

type BearerAuth = TypedHeader<axum_extra::headers::Authorization<axum_extra::headers::authorization::Bearer>>;

struct AppState {
    rng: Rng,
    api_key: String,
    // True after the first fatal RNG error. Spins and resets hold this lock for
    // their whole duration, so a spin never straddles a reset.
    halted: Mutex<bool>,
}

impl AppState {
    fn new(rng: Rng, api_key: String) -> Self {
        Self {
            rng,
            api_key,
            halted: Mutex::new(false),
        }
    }

    fn gate(&self) -> MutexGuard<'_, bool> {
        self.halted.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn authorize(&self, bearer: &axum_extra::headers::authorization::Bearer) -> Result<(), ApiFailure> {
        if bearer.token() != self.api_key {
            warn!("admin request rejected: bad token");
            return Err(failure(ApiError::Unauthorized));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct ServerConfig {
    bind: String,
    api_key: String,
    rng: RngConfig,
}

impl ServerConfig {
    fn from_env() -> anyhow::Result<Self> {
        let mut rng = RngConfig::default();
        if let Ok(policy) = std::env::var("CLIENT_SEED_POLICY") {
            rng.client_seed_policy = policy.parse::<ClientSeedPolicy>().map_err(anyhow::Error::msg)?;
        }
        Ok(Self {
            bind: std::env::var("BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            api_key: std::env::var("API_KEY").unwrap_or_else(|_| "dev-key".into()),
            rng,
        })
    }
}

type ApiFailure = (StatusCode, Json<ErrorBody>);

fn failure(err: ApiError) -> ApiFailure {
    let status = match err {
        ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
        ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(ErrorBody { error: err.to_string() }))
}

fn spin_response(res: SpinResult) -> SpinResponse {
    let color = color_of(res.winning_number)
        .map(|c| format!("{c:?}").to_lowercase())
        .unwrap_or_default();
    SpinResponse {
        winning_number: res.winning_number,
        color,
        server_seed: res.server_seed,
        server_seed_hash: res.server_seed_hash.into(),
        client_seed: res.client_seed,
        nonce: res.nonce,
    }
}

/// An empty body means "no client seed".
fn parse_spin_request(body: &[u8]) -> Result<SpinRequest, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(SpinRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::Invalid(e.to_string()))
}

async fn route_commitment(State(state): State<Arc<AppState>>) -> Json<CommitmentResponse> {
    let snap = state.rng.snapshot();
    Json(CommitmentResponse {
        server_seed_hash: snap.server_seed_hash.into(),
        nonce: snap.nonce,
    })
}

async fn route_spin(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<SpinResponse>, ApiFailure> {
    let req = parse_spin_request(&body).map_err(failure)?;

    let mut halted = state.gate();
    if *halted {
        return Err(failure(ApiError::Unavailable("halted after fatal RNG error".into())));
    }
    match state.rng.spin(req.client_seed.as_deref()) {
        Ok(res) => {
            info!(number = res.winning_number, hash = %res.server_seed_hash, "spin");
            Ok(Json(spin_response(res)))
        }
        Err(e) => {
            if e.is_fatal() {
                *halted = true;
                error!(error = %e, "fatal RNG error, refusing further spins");
            } else {
                warn!(error = %e, "spin failed");
            }
            Err(failure(ApiError::Unavailable(e.to_string())))
        }
    }
}

async fn route_verify(Json(req): Json<VerifyRequest>) -> Json<VerifyResponse> {
    let valid = match (req.nonce(), req.claimed()) {
        (Some(nonce), Some(claimed)) => verify(&req.server_seed, &req.client_seed, nonce, claimed),
        _ => false,
    };
    let commitment_valid = req
        .server_seed_hash
        .as_deref()
        .map(|hash| verify_commitment(&req.server_seed, hash));
    Json(VerifyResponse {
        valid,
        commitment_valid,
    })
}

async fn route_admin_reset(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): BearerAuth,
) -> Result<StatusCode, ApiFailure> {
    state.authorize(&bearer)?;

    let mut halted = state.gate();
    state.rng.reset().map_err(|e| {
        error!(error = %e, "reset failed");
        failure(ApiError::Unavailable(e.to_string()))
    })?;
    *halted = false;
    info!(commitment = %state.rng.commitment_hash(), "rng reset");
    Ok(StatusCode::NO_CONTENT)
}

async fn route_admin_rotate(
    State(state): State<Arc<AppState>>,
    TypedHeader(axum_extra::headers::Authorization(bearer)): BearerAuth,
) -> Result<Json<RotationResponse>, ApiFailure> {
    state.authorize(&bearer)?;

    let rotation = state.rng.rotate().map_err(|e| {
        error!(error = %e, "rotation failed");
        failure(ApiError::Unavailable(e.to_string()))
    })?;
    info!(retired = %rotation.old_hash, committed = %rotation.new_hash, "seed rotated");
    Ok(Json(RotationResponse {
        old_seed: rotation.old_seed,
        old_hash: rotation.old_hash.into(),
        new_hash: rotation.new_hash.into(),
    }))
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/commitment", get(route_commitment))
        .route("/spin", post(route_spin))
        .route("/verify", post(route_verify))
        .route("/admin/reset", post(route_admin_reset))
        .route("/admin/rotate", post(route_admin_rotate))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let config = ServerConfig::from_env()?;

    let entropy: Box<dyn EntropySource> = Box::new(OsEntropy);
    let rng = RouletteRng::with_config(config.rng.clone(), entropy)?;
    info!(commitment = %rng.commitment_hash(), policy = ?config.rng.client_seed_policy, "rng ready");

    let state = Arc::new(AppState::new(rng, config.api_key));

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    info!("listening on {}", config.bind);
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use roulette_core::{commit, RngError, RngResult};
    use tower::ServiceExt;

    use super::*;

    struct LimitedEntropy {
        left: AtomicUsize,
    }

    impl EntropySource for LimitedEntropy {
        fn fill(&self, dest: &mut [u8]) -> RngResult<()> {
            let ok = self
                .left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !ok {
                return Err(RngError::Entropy("exhausted".into()));
            }
            OsEntropy.fill(dest)
        }
    }

    fn state_with(entropy: Box<dyn EntropySource>) -> Arc<AppState> {
        let rng = RouletteRng::with_config(RngConfig::default(), entropy).unwrap();
        Arc::new(AppState::new(rng, "secret".into()))
    }

    fn state() -> Arc<AppState> {
        state_with(Box::new(OsEntropy))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn admin_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn verify_raw(body: String) -> VerifyResponse {
        let req = Request::builder()
            .method("POST")
            .uri("/verify")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let resp = app(state()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        json_body(resp).await
    }

    #[test]
    fn test_parse_spin_request() {
        assert!(parse_spin_request(b"").unwrap().client_seed.is_none());
        assert!(parse_spin_request(b" \n").unwrap().client_seed.is_none());
        assert_eq!(
            parse_spin_request(br#"{"client_seed":"x"}"#).unwrap().client_seed.as_deref(),
            Some("x")
        );
        assert!(matches!(parse_spin_request(b"{oops"), Err(ApiError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_commitment_then_spin_then_verify() {
        let state = state();
        let resp = app(state.clone())
            .oneshot(Request::builder().uri("/commitment").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let committed: CommitmentResponse = json_body(resp).await;
        assert_eq!(committed.nonce, 0);

        let resp = app(state.clone())
            .oneshot(post_json("/spin", serde_json::json!({ "client_seed": "player" })))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let spin: SpinResponse = json_body(resp).await;
        assert_eq!(spin.server_seed_hash, committed.server_seed_hash);
        assert_eq!(spin.client_seed, "player");
        assert_ne!(state.rng.commitment_hash().as_str(), spin.server_seed_hash);

        let resp = app(state)
            .oneshot(post_json(
                "/verify",
                serde_json::json!({
                    "server_seed": spin.server_seed,
                    "client_seed": spin.client_seed,
                    "nonce": spin.nonce,
                    "winning_number": spin.winning_number,
                    "server_seed_hash": spin.server_seed_hash,
                }),
            ))
            .await
            .unwrap();
        let verdict: VerifyResponse = json_body(resp).await;
        assert_eq!(verdict, VerifyResponse { valid: true, commitment_valid: Some(true) });
    }

    #[tokio::test]
    async fn test_spin_without_body() {
        let state = state();
        let stored = state.rng.client_seed();
        let req = Request::builder().method("POST").uri("/spin").body(Body::empty()).unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let spin: SpinResponse = json_body(resp).await;
        assert_eq!(spin.client_seed, stored);
        assert!(verify(&spin.server_seed, &spin.client_seed, spin.nonce, spin.winning_number));
    }

    #[tokio::test]
    async fn test_spin_with_broken_json_is_bad_request() {
        let state = state();
        let before = state.rng.commitment_hash();
        let req = Request::builder()
            .method("POST")
            .uri("/spin")
            .body(Body::from("{\"client_seed\":"))
            .unwrap();
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.rng.commitment_hash(), before);
    }

    #[tokio::test]
    async fn test_verify_large_nonce() {
        let zero = "00".repeat(32);
        let expected = roulette_core::compute_outcome(&zero, "test", u64::MAX).unwrap();
        let verdict = verify_raw(format!(
            r#"{{"server_seed":"{zero}","client_seed":"test","nonce":18446744073709551615,"winning_number":{expected}}}"#
        ))
        .await;
        assert!(verdict.valid);
    }

    #[tokio::test]
    async fn test_verify_malformed_claims_are_false() {
        let zero = "00".repeat(32);
        let numbers = [
            r#""nonce":-1,"winning_number":21"#,
            r#""nonce":0,"winning_number":-21"#,
            r#""nonce":0,"winning_number":37"#,
            r#""nonce":0,"winning_number":1000"#,
            r#""nonce":0,"winning_number":"21""#,
            r#""nonce":"0","winning_number":21"#,
            r#""nonce":0,"winning_number":2.5"#,
            r#""nonce":0.0,"winning_number":21"#,
            r#""nonce":0,"winning_number":null"#,
            r#""winning_number":21"#,
            r#""nonce":0,"winning_number":[21]"#,
        ];
        // Sanity: the well-formed claim is accepted.
        let verdict = verify_raw(format!(
            r#"{{"server_seed":"{zero}","client_seed":"test","nonce":0,"winning_number":21}}"#
        ))
        .await;
        assert!(verdict.valid);

        for fields in numbers {
            let verdict = verify_raw(format!(r#"{{"server_seed":"{zero}","client_seed":"test",{fields}}}"#)).await;
            assert!(!verdict.valid, "{fields}");
            assert_eq!(verdict.commitment_valid, None);
        }
    }

    #[tokio::test]
    async fn test_reset_requires_api_key() {
        let state = state();
        let before = state.rng.commitment_hash();

        let resp = app(state.clone()).oneshot(admin_request("/admin/reset", "wrong")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.rng.commitment_hash(), before);

        let resp = app(state.clone()).oneshot(admin_request("/admin/reset", "secret")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_ne!(state.rng.commitment_hash(), before);
    }

    #[tokio::test]
    async fn test_rotate_reveals_unused_seed() {
        let state = state();
        let before = state.rng.commitment_hash();

        let resp = app(state.clone()).oneshot(admin_request("/admin/rotate", "wrong")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.rng.commitment_hash(), before);

        let resp = app(state.clone()).oneshot(admin_request("/admin/rotate", "secret")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let rotation: RotationResponse = json_body(resp).await;
        assert_eq!(rotation.old_hash, before.as_str());
        assert_eq!(commit(&rotation.old_seed), before);
        assert_eq!(rotation.new_hash, state.rng.commitment_hash().as_str());
        assert_ne!(rotation.new_hash, rotation.old_hash);
        assert_eq!(state.rng.nonce(), 0);
    }

    #[tokio::test]
    async fn test_fatal_error_halts_spins() {
        // Seed and client seed at startup, then entropy runs dry.
        let state = state_with(Box::new(LimitedEntropy { left: AtomicUsize::new(2) }));

        let resp = app(state.clone())
            .oneshot(post_json("/spin", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(*state.gate());

        let resp = app(state.clone())
            .oneshot(post_json("/spin", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: ErrorBody = json_body(resp).await;
        assert!(body.error.contains("halted"));

        let resp = app(state.clone())
            .oneshot(Request::builder().uri("/commitment").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app(state.clone()).oneshot(admin_request("/admin/reset", "secret")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(*state.gate());
    }

    #[tokio::test]
    async fn test_reset_after_halt_resumes_spins() {
        let state = state();
        *state.gate() = true;

        let resp = app(state.clone()).oneshot(post_json("/spin", serde_json::json!({}))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let resp = app(state.clone()).oneshot(admin_request("/admin/reset", "secret")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(!*state.gate());

        let resp = app(state).oneshot(post_json("/spin", serde_json::json!({}))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
