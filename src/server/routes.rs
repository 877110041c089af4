//! HTTP and WebSocket surface of taskmaster-server.
//!
//! # Endpoints
//!
//! Public:
//! - `GET /health`
//! - `POST /v1/auth/anonymous`
//! - `POST /v1/auth/sign-in`, `POST /v1/auth/sign-up` with `{email, password}`
//! - `GET /v1/listen?token=...` WebSocket listener
//!
//! Bearer token required:
//! - `POST /v1/auth/sign-out`
//! - `GET|POST /v1/users/{user_id}/{collection}` list or batch upsert
//! - `GET|PUT|DELETE /v1/users/{user_id}/{collection}/{id}`
//!
//! `collection` is `todos`, `reminders`, `notes` or `settings` (which holds
//! the `stats` document). Users can only touch their own documents.
//!
//! # Listener protocol
//!
//! The client sends one CBOR [`ProtocolMessage::Listen`] frame naming the
//! target. The server answers with a snapshot and pushes a fresh snapshot
//! after every write to that target. Failures are reported with
//! [`ProtocolMessage::Error`] before the socket closes.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast::error::RecvError, Mutex, RwLock};
use tower_http::trace::TraceLayer;

use taskmaster_core::identity::{AuthError, AuthResponse, CredentialsRequest};
use taskmaster_core::remote::{
    ApiError, BatchRequest, CollectionKind, Document, OrderBy, ProtocolMessage, RemoteTarget,
};

use super::accounts::AccountStore;
use super::hub::{HubEvent, SyncHub};
use super::storage::{DocFile, ServerStorage, ServerStorageError};
use super::tokens::TokenStore;

/// Shared handler state.
#[derive(Clone)]
pub struct ServerState {
    pub storage: Arc<RwLock<ServerStorage>>,
    pub accounts: Arc<Mutex<AccountStore>>,
    pub tokens: Arc<TokenStore>,
    pub hub: Arc<SyncHub>,
}

impl ServerState {
    pub fn new(storage: ServerStorage, accounts: AccountStore, tokens: TokenStore) -> Self {
        Self {
            storage: Arc::new(RwLock::new(storage)),
            accounts: Arc::new(Mutex::new(accounts)),
            tokens: Arc::new(tokens),
            hub: Arc::new(SyncHub::new()),
        }
    }

    fn session_for(&self, user_id: String, email: Option<String>, is_anonymous: bool) -> AuthResponse {
        let token = self
            .tokens
            .create_token(&user_id, email.as_deref(), is_anonymous);
        AuthResponse {
            user_id,
            email,
            is_anonymous,
            token,
        }
    }
}

/// Builds the application router.
pub fn router(state: ServerState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/v1/auth/anonymous", post(sign_in_anonymously))
        .route("/v1/auth/sign-in", post(sign_in))
        .route("/v1/auth/sign-up", post(sign_up))
        .route("/v1/listen", get(listen));

    let protected_routes = Router::new()
        .route("/v1/auth/sign-out", post(sign_out))
        .route(
            "/v1/users/{user_id}/{collection}",
            get(list_documents).post(batch_put),
        )
        .route(
            "/v1/users/{user_id}/{collection}/{id}",
            put(put_document).get(get_document).delete(delete_document),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ServerError {
    Auth(AuthError),
    Unauthorized(&'static str, &'static str),
    Forbidden,
    NotFound(String),
    BadRequest(String),
    Storage(ServerStorageError),
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        ServerError::Auth(e)
    }
}

impl From<ServerStorageError> for ServerError {
    fn from(e: ServerStorageError) -> Self {
        ServerError::Storage(e)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ServerError::Auth(e) => {
                let status = match e {
                    AuthError::MissingCredentials
                    | AuthError::InvalidEmail
                    | AuthError::WeakPassword => StatusCode::BAD_REQUEST,
                    AuthError::WrongPassword
                    | AuthError::UserNotFound
                    | AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
                    AuthError::EmailInUse => StatusCode::CONFLICT,
                    AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    AuthError::Network(_) | AuthError::Other(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, ApiError::new(e.code(), e.to_string()))
            }
            ServerError::Unauthorized(code, message) => {
                (StatusCode::UNAUTHORIZED, ApiError::new(code, message))
            }
            ServerError::Forbidden => (
                StatusCode::FORBIDDEN,
                ApiError::new("forbidden", "Cannot access another user's data"),
            ),
            ServerError::NotFound(message) => {
                (StatusCode::NOT_FOUND, ApiError::new("not-found", message))
            }
            ServerError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, ApiError::new("bad-request", message))
            }
            ServerError::Storage(e) => match e {
                ServerStorageError::InvalidUserId(_)
                | ServerStorageError::InvalidCollection(_)
                | ServerStorageError::InvalidDocument(_) => (
                    StatusCode::BAD_REQUEST,
                    ApiError::new("bad-request", e.to_string()),
                ),
                _ => {
                    tracing::error!("Storage failure: {}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiError::new("internal-error", "Storage failure"),
                    )
                }
            },
        };

        (status, Json(body)).into_response()
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Authenticated caller, added to request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub token: String,
}

impl AuthUser {
    fn check_owner(&self, user_id: &str) -> Result<(), ServerError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(ServerError::Forbidden)
        }
    }
}

async fn auth_middleware(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(h) => match h.strip_prefix("Bearer ") {
            Some(token) => token.to_string(),
            None => {
                return ServerError::Unauthorized(
                    "invalid-auth",
                    "Authorization header must use Bearer scheme",
                )
                .into_response()
            }
        },
        None => {
            return ServerError::Unauthorized("missing-auth", "Authorization header required")
                .into_response()
        }
    };

    match state.tokens.validate(&token) {
        Some(data) => {
            request.extensions_mut().insert(AuthUser {
                user_id: data.user_id,
                token,
            });
            next.run(request).await
        }
        None => ServerError::Unauthorized("invalid-token", "Invalid or expired token")
            .into_response(),
    }
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn sign_in_anonymously(State(state): State<ServerState>) -> Json<AuthResponse> {
    let user_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(%user_id, "anonymous sign-in");
    Json(state.session_for(user_id, None, true))
}

async fn sign_in(
    State(state): State<ServerState>,
    Json(credentials): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let account = state
        .accounts
        .lock()
        .await
        .sign_in(&credentials.email, &credentials.password)?;
    Ok(Json(state.session_for(
        account.user_id,
        Some(account.email),
        false,
    )))
}

async fn sign_up(
    State(state): State<ServerState>,
    Json(credentials): Json<CredentialsRequest>,
) -> Result<Json<AuthResponse>, ServerError> {
    let account = state
        .accounts
        .lock()
        .await
        .sign_up(&credentials.email, &credentials.password)?;
    Ok(Json(state.session_for(
        account.user_id,
        Some(account.email),
        false,
    )))
}

async fn sign_out(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
) -> StatusCode {
    state.tokens.revoke(&user.token);
    StatusCode::NO_CONTENT
}

fn parse_file(collection: &str) -> Result<DocFile, ServerError> {
    DocFile::parse(collection)
        .ok_or_else(|| ServerError::NotFound(format!("Unknown collection '{}'", collection)))
}

fn target_for(file: DocFile) -> RemoteTarget {
    match file {
        DocFile::Collection(kind) => RemoteTarget::Collection(kind),
        DocFile::Settings => RemoteTarget::Stats,
    }
}

async fn list_documents(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, collection)): Path<(String, String)>,
) -> Result<Json<Vec<Document>>, ServerError> {
    user.check_owner(&user_id)?;
    let kind: CollectionKind = collection.parse().map_err(ServerError::NotFound)?;

    let mut docs = state.storage.read().await.list(&user_id, kind)?;
    kind.default_order().sort(&mut docs);
    Ok(Json(docs))
}

async fn batch_put(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, collection)): Path<(String, String)>,
    Json(request): Json<BatchRequest>,
) -> Result<StatusCode, ServerError> {
    user.check_owner(&user_id)?;
    let file = parse_file(&collection)?;
    if request.documents.iter().any(|doc| doc.id.is_empty()) {
        return Err(ServerError::BadRequest("Document ids must not be empty".into()));
    }

    state
        .storage
        .write()
        .await
        .put_many(&user_id, file, &request.documents)?;
    tracing::debug!(%user_id, %collection, count = request.documents.len(), "batch write");
    state.hub.broadcast(&user_id, target_for(file)).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_document(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, collection, id)): Path<(String, String, String)>,
) -> Result<Json<Value>, ServerError> {
    user.check_owner(&user_id)?;
    let file = parse_file(&collection)?;

    state
        .storage
        .read()
        .await
        .get(&user_id, file, &id)?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("No document '{}' in {}", id, collection)))
}

async fn put_document(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, collection, id)): Path<(String, String, String)>,
    Json(data): Json<Value>,
) -> Result<StatusCode, ServerError> {
    user.check_owner(&user_id)?;
    let file = parse_file(&collection)?;
    if !data.is_object() {
        return Err(ServerError::BadRequest("Document body must be an object".into()));
    }

    state.storage.write().await.put(&user_id, file, &id, data)?;
    state.hub.broadcast(&user_id, target_for(file)).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_document(
    State(state): State<ServerState>,
    Extension(user): Extension<AuthUser>,
    Path((user_id, collection, id)): Path<(String, String, String)>,
) -> Result<StatusCode, ServerError> {
    user.check_owner(&user_id)?;
    let file = parse_file(&collection)?;

    state.storage.write().await.delete(&user_id, file, &id)?;
    state.hub.broadcast(&user_id, target_for(file)).await;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Listener
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListenQuery {
    token: String,
}

async fn listen(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    Query(query): Query<ListenQuery>,
) -> Result<Response, ServerError> {
    let data = state
        .tokens
        .validate(&query.token)
        .ok_or(ServerError::Unauthorized("invalid-token", "Invalid or expired token"))?;

    Ok(ws.on_upgrade(move |socket| handle_listener(socket, state, data.user_id)))
}

async fn handle_listener(mut socket: WebSocket, state: ServerState, user_id: String) {
    let (target, order) = match read_listen(&mut socket).await {
        Ok(Some(listen)) => listen,
        Ok(None) => return,
        Err(message) => {
            tracing::debug!(%user_id, "rejecting listener: {}", message);
            send_message(&mut socket, &ProtocolMessage::Error { message }).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };
    tracing::info!(%user_id, listener = %target, "listener connected");

    // Subscribe before the first read so no write slips between them.
    let mut updates = state.hub.subscribe(&user_id, target).await;
    let mut open = push_snapshot(&mut socket, &state, &user_id, target, order.as_ref()).await;

    while open {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(%user_id, "listener socket error: {}", e);
                    break;
                }
                Some(Ok(_)) => {}
            },
            event = updates.recv() => match event {
                Ok(HubEvent::Updated) | Err(RecvError::Lagged(_)) => {
                    open = push_snapshot(&mut socket, &state, &user_id, target, order.as_ref()).await;
                }
                Err(RecvError::Closed) => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
        }
    }

    drop(updates);
    state.hub.prune().await;
    tracing::info!(%user_id, listener = %target, "listener disconnected");
}

/// Waits for the opening `Listen` frame. `Ok(None)` means the client left.
async fn read_listen(
    socket: &mut WebSocket,
) -> Result<Option<(RemoteTarget, Option<OrderBy>)>, String> {
    loop {
        let bytes = match socket.recv().await {
            Some(Ok(Message::Binary(bytes))) => bytes,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return Ok(None),
            Some(Ok(Message::Text(_))) => return Err("Expected a binary listen frame".into()),
            Some(Ok(_)) => continue,
        };

        return match ProtocolMessage::decode(&bytes) {
            Ok(ProtocolMessage::Listen { target, order_by }) => {
                let target: RemoteTarget = target.parse()?;
                let order = order_by.or_else(|| target.default_order());
                Ok(Some((target, order)))
            }
            Ok(_) => Err("Expected a listen frame".into()),
            Err(e) => Err(format!("Invalid listen frame: {}", e)),
        };
    }
}

async fn snapshot(
    state: &ServerState,
    user_id: &str,
    target: RemoteTarget,
    order: Option<&OrderBy>,
) -> Result<ProtocolMessage, String> {
    let storage = state.storage.read().await;
    match target {
        RemoteTarget::Collection(kind) => {
            let mut docs = storage.list(user_id, kind).map_err(|e| e.to_string())?;
            if let Some(order) = order {
                order.sort(&mut docs);
            }
            ProtocolMessage::collection_snapshot(target, &docs).map_err(|e| e.to_string())
        }
        RemoteTarget::Stats => {
            let stats = storage.stats(user_id).map_err(|e| e.to_string())?;
            ProtocolMessage::document_snapshot(target, stats.as_ref()).map_err(|e| e.to_string())
        }
    }
}

/// Sends the current snapshot. Returns false once the socket is unusable.
async fn push_snapshot(
    socket: &mut WebSocket,
    state: &ServerState,
    user_id: &str,
    target: RemoteTarget,
    order: Option<&OrderBy>,
) -> bool {
    match snapshot(state, user_id, target, order).await {
        Ok(message) => send_message(socket, &message).await,
        Err(message) => {
            tracing::error!(%user_id, listener = %target, "snapshot failed: {}", message);
            send_message(socket, &ProtocolMessage::Error { message }).await;
            false
        }
    }
}

async fn send_message(socket: &mut WebSocket, message: &ProtocolMessage) -> bool {
    let bytes = match message.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!("Failed to encode listener frame: {}", e);
            return false;
        }
    };
    socket.send(Message::Binary(bytes.into())).await.is_ok()
}
