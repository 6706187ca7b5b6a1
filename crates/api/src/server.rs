use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use keyreg_core::{CodecError, UserKey};
use keyreg_registry::{ContractRegistry, KeyRegistry, RegistryError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;

const MSG_MISSING_FIELDS: &str = "Missing required fields: userId, publicKey.n, publicKey.e";
const MSG_ALREADY_REGISTERED: &str = "User already registered";
const MSG_NOT_REGISTERED: &str = "User not registered";

#[derive(Clone)]
struct AppState {
    registry: Arc<dyn KeyRegistry>,
}

/// Build the gateway router over an explicitly constructed registry.
pub fn router(registry: Arc<dyn KeyRegistry>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/register", post(register_user))
        .route("/registerUser", post(register_user))
        .route("/user/:userId", get(get_user))
        .route("/getUser/:userId", get(get_user))
        .route("/updateUser", post(update_user))
        .route("/deleteUser/:userId", delete(delete_user))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { registry })
}

/// Connect to the configured contract and serve until shutdown.
pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    let signer = config.signer()?;
    let registry = ContractRegistry::connect(
        &config.network.rpc_url,
        config.contracts.key_registry,
        signer,
        Some(config.network.chain_id),
    )
    .await
    .context("Failed to connect to key registry")?;

    let app = router(Arc::new(registry));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("KeyReg gateway listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("KeyReg gateway shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, msg)
}

fn not_found(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, msg)
}

fn internal_error<E: std::fmt::Display>(err: E) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn registry_error(op: &str, user_id: &str, err: RegistryError) -> ApiError {
    warn!("{} failed for user {}: {}", op, user_id, err);
    internal_error(err)
}

// Request body for register and update. Every field is optional at the
// serde level so that absence maps to a 400 with our own message.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyRequest {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    public_key: Option<PublicKeyInput>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyInput {
    #[serde(default)]
    n: Option<Value>,
    #[serde(default)]
    e: Option<Value>,
}

/// A validated write request: the user id and the DER bytes to store.
#[derive(Debug)]
struct KeyWrite {
    user_id: String,
    der: Vec<u8>,
}

fn modulus_text(n: &Value) -> Result<String, CodecError> {
    match n {
        Value::String(s) => Ok(s.clone()),
        Value::Number(num) if num.is_u64() => Ok(num.to_string()),
        other => Err(CodecError::Encoding(format!(
            "modulus must be a base-10 integer string (got {})",
            other
        ))),
    }
}

fn validate_key_request(
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<KeyWrite, ApiError> {
    let Json(request) = payload.map_err(|rejection| bad_request(rejection.body_text()))?;

    let user_id = request.user_id.filter(|id| !id.is_empty());
    let (n, e) = match request.public_key {
        Some(PublicKeyInput {
            n: Some(n),
            e: Some(e),
        }) if !n.is_null() && !e.is_null() && n.as_str() != Some("") => (n, e),
        _ => return Err(bad_request(MSG_MISSING_FIELDS)),
    };
    let Some(user_id) = user_id else {
        return Err(bad_request(MSG_MISSING_FIELDS));
    };

    let der = modulus_text(&n)
        .and_then(|modulus| {
            let exponent = keyreg_core::parse_exponent(&e)?;
            keyreg_core::encode(&modulus, exponent)
        })
        .map_err(|err| bad_request(err.to_string()))?;

    Ok(KeyWrite { user_id, der })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MutationResponse {
    message: String,
    transaction_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    block_number: Option<u64>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

async fn register_user(
    State(state): State<AppState>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let KeyWrite { user_id, der } = validate_key_request(payload)?;

    let registered = state
        .registry
        .is_user_registered(&user_id)
        .await
        .map_err(|e| registry_error("isUserRegistered", &user_id, e))?;
    if registered {
        return Err(bad_request(MSG_ALREADY_REGISTERED));
    }

    let confirmation = state
        .registry
        .set_public_key(&user_id, &der)
        .await
        .map_err(|e| registry_error("setPublicKey", &user_id, e))?;

    info!(
        "Registered public key for {} (tx {})",
        user_id,
        confirmation.tx_hash_hex()
    );

    Ok(Json(MutationResponse {
        message: format!("User {} registered successfully", user_id),
        transaction_hash: confirmation.tx_hash_hex(),
        block_number: confirmation.block_number,
    }))
}

async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserKey>, ApiError> {
    let registered = state
        .registry
        .is_user_registered(&user_id)
        .await
        .map_err(|e| registry_error("isUserRegistered", &user_id, e))?;
    if !registered {
        return Err(not_found(MSG_NOT_REGISTERED));
    }

    let der = state
        .registry
        .get_public_key(&user_id)
        .await
        .map_err(|e| registry_error("getPublicKey", &user_id, e))?;

    let public_key = keyreg_core::decode(&der).map_err(|e| {
        warn!("Stored key for {} does not decode: {}", user_id, e);
        internal_error(e)
    })?;

    Ok(Json(UserKey {
        user_id,
        public_key,
    }))
}

async fn update_user(
    State(state): State<AppState>,
    payload: Result<Json<KeyRequest>, JsonRejection>,
) -> Result<Json<MutationResponse>, ApiError> {
    let KeyWrite { user_id, der } = validate_key_request(payload)?;

    let registered = state
        .registry
        .is_user_registered(&user_id)
        .await
        .map_err(|e| registry_error("isUserRegistered", &user_id, e))?;
    if !registered {
        return Err(not_found(MSG_NOT_REGISTERED));
    }

    let confirmation = state
        .registry
        .update_public_key(&user_id, &der)
        .await
        .map_err(|e| registry_error("updatePublicKey", &user_id, e))?;

    info!(
        "Updated public key for {} (tx {})",
        user_id,
        confirmation.tx_hash_hex()
    );

    Ok(Json(MutationResponse {
        message: format!("Public key for user {} updated successfully", user_id),
        transaction_hash: confirmation.tx_hash_hex(),
        block_number: confirmation.block_number,
    }))
}

async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let registered = state
        .registry
        .is_user_registered(&user_id)
        .await
        .map_err(|e| registry_error("isUserRegistered", &user_id, e))?;
    if !registered {
        return Err(not_found(MSG_NOT_REGISTERED));
    }

    let confirmation = state
        .registry
        .delete_public_key(&user_id)
        .await
        .map_err(|e| registry_error("deletePublicKey", &user_id, e))?;

    info!(
        "Deleted public key for {} (tx {})",
        user_id,
        confirmation.tx_hash_hex()
    );

    Ok(Json(MessageResponse {
        message: format!("User {} deleted successfully", user_id),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use keyreg_registry::MemoryRegistry;
    use serde_json::json;
    use tower::ServiceExt;

    const N: &str = "24778516772345216376837295702651284930758227106577041563837017386469461";

    fn app() -> (Router, MemoryRegistry) {
        let registry = MemoryRegistry::new();
        (router(Arc::new(registry.clone())), registry)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_register_stores_der() {
        let (app, registry) = app();
        let (status, body) = send(
            &app,
            post_json(
                "/register",
                json!({"userId": "alice", "publicKey": {"n": N, "e": 65537}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "User alice registered successfully");
        assert!(body["transactionHash"].as_str().unwrap().starts_with("0x"));
        assert_eq!(
            registry.get_raw("alice").await.unwrap(),
            keyreg_core::encode(N, 65537).unwrap()
        );
    }

    #[tokio::test]
    async fn test_register_alias_route() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            post_json(
                "/registerUser",
                json!({"userId": "bob", "publicKey": {"n": "3233", "e": "17"}}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(&app, get("/getUser/bob")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["publicKey"]["e"], 17);
    }

    #[tokio::test]
    async fn test_register_missing_fields_makes_no_registry_call() {
        let (app, registry) = app();
        let bodies = [
            json!({"publicKey": {"n": N, "e": 3}}),
            json!({"userId": "", "publicKey": {"n": N, "e": 3}}),
            json!({"userId": "alice"}),
            json!({"userId": "alice", "publicKey": {"e": 3}}),
            json!({"userId": "alice", "publicKey": {"n": N}}),
            json!({"userId": "alice", "publicKey": {"n": "", "e": 3}}),
            json!({"userId": "alice", "publicKey": {"n": N, "e": null}}),
        ];

        for body in bodies {
            let (status, json) = send(&app, post_json("/register", body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert_eq!(json["error"], MSG_MISSING_FIELDS);
        }

        assert_eq!(registry.read_count(), 0);
        assert_eq!(registry.write_count(), 0);
    }

    #[tokio::test]
    async fn test_register_malformed_key_makes_no_registry_call() {
        let (app, registry) = app();
        let bodies = [
            json!({"userId": "alice", "publicKey": {"n": "12ab", "e": 3}}),
            json!({"userId": "alice", "publicKey": {"n": N, "e": 3.5}}),
            json!({"userId": "alice", "publicKey": {"n": N, "e": -1}}),
            json!({"userId": "alice", "publicKey": {"n": [1, 2], "e": 3}}),
        ];

        for body in bodies {
            let (status, json) = send(&app, post_json("/register", body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
            assert!(json["error"]
                .as_str()
                .unwrap()
                .starts_with("Encoding error"));
        }

        assert_eq!(registry.read_count(), 0);
    }

    #[tokio::test]
    async fn test_register_invalid_json_is_json_error() {
        let (app, registry) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
        assert_eq!(registry.read_count(), 0);
    }

    #[tokio::test]
    async fn test_register_existing_user_makes_no_write() {
        let (app, registry) = app();
        registry
            .insert_raw("alice", keyreg_core::encode("3233", 17).unwrap())
            .await;

        let (status, json) = send(
            &app,
            post_json(
                "/register",
                json!({"userId": "alice", "publicKey": {"n": N, "e": 3}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], MSG_ALREADY_REGISTERED);
        assert_eq!(registry.write_count(), 0);
    }

    #[tokio::test]
    async fn test_register_collaborator_failure_is_500_with_message() {
        let (app, registry) = app();
        registry.fail_with("execution reverted: out of gas").await;

        let (status, json) = send(
            &app,
            post_json(
                "/register",
                json!({"userId": "alice", "publicKey": {"n": N, "e": 3}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "execution reverted: out of gas");
    }

    #[tokio::test]
    async fn test_get_unregistered_is_404() {
        let (app, _) = app();
        let (status, json) = send(&app, get("/user/nobody")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], MSG_NOT_REGISTERED);
    }

    #[tokio::test]
    async fn test_get_undecodable_key_is_500() {
        let (app, registry) = app();
        registry.insert_raw("mallory", vec![0xde, 0xad]).await;

        let (status, json) = send(&app, get("/user/mallory")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("Decoding error"));
    }

    #[tokio::test]
    async fn test_get_collaborator_failure_is_500() {
        let (app, registry) = app();
        registry.fail_with("connection refused").await;

        let (status, json) = send(&app, get("/user/alice")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "connection refused");
    }

    #[tokio::test]
    async fn test_update_unregistered_makes_no_write() {
        let (app, registry) = app();
        let (status, json) = send(
            &app,
            post_json(
                "/updateUser",
                json!({"userId": "ghost", "publicKey": {"n": N, "e": 3}}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], MSG_NOT_REGISTERED);
        assert_eq!(registry.write_count(), 0);
    }

    #[tokio::test]
    async fn test_update_missing_fields_is_400() {
        let (app, registry) = app();
        let (status, _) = send(&app, post_json("/updateUser", json!({"userId": "alice"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(registry.read_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_unregistered_makes_no_delete() {
        let (app, registry) = app();
        let request = Request::builder()
            .method("DELETE")
            .uri("/deleteUser/ghost")
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], MSG_NOT_REGISTERED);
        assert_eq!(registry.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_registered_user() {
        let (app, registry) = app();
        registry
            .insert_raw("alice", keyreg_core::encode("3233", 17).unwrap())
            .await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/deleteUser/alice")
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "User alice deleted successfully");
        assert!(registry.is_empty().await);
    }
}
