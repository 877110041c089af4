//! HTTP remote store client for taskmaster-server.
//!
//! Writes go over REST with a bearer token. Each subscription opens its own
//! WebSocket, sends a `listen` message and forwards every CBOR `snapshot`
//! frame to the event sink until cancelled. Dropped connections are reopened
//! with a capped backoff.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;

use super::protocol::{decode_snapshot, ApiError, BatchRequest, ProtocolMessage};
use super::{
    CollectionKind, Document, EventSink, OrderBy, RemoteError, RemotePayload, RemoteScope,
    RemoteStore, RemoteTarget, Subscription,
};
use crate::models::Stats;

/// Timeout for a single REST request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// First delay before reopening a dropped listener.
const RECONNECT_INITIAL: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    server_url: String,
    http: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Builds the WebSocket URL for the listen endpoint.
    fn build_ws_url(&self, token: &str) -> String {
        let base_url = if self.server_url.starts_with("http://") {
            self.server_url.replacen("http://", "ws://", 1)
        } else if self.server_url.starts_with("https://") {
            self.server_url.replacen("https://", "wss://", 1)
        } else if !self.server_url.starts_with("ws://") && !self.server_url.starts_with("wss://") {
            format!("ws://{}", self.server_url)
        } else {
            self.server_url.clone()
        };

        format!(
            "{}/v1/listen?token={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    fn build_http_url(&self, path: &str) -> String {
        build_http_url(&self.server_url, path)
    }

    fn collection_url(&self, scope: &RemoteScope, collection: &str) -> String {
        self.build_http_url(&format!(
            "/v1/users/{}/{}",
            urlencoding::encode(&scope.user_id),
            collection
        ))
    }

    fn document_url(&self, scope: &RemoteScope, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(scope, collection),
            urlencoding::encode(id)
        )
    }

    async fn send(
        &self,
        scope: &RemoteScope,
        request: reqwest::RequestBuilder,
    ) -> Result<(), RemoteError> {
        let response = request
            .bearer_auth(&scope.token)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

        check_response(response).await
    }
}

/// Builds an HTTP URL for a path, accepting ws(s) or scheme-less server URLs.
pub(crate) fn build_http_url(server_url: &str, path: &str) -> String {
    let base_url = if server_url.starts_with("ws://") {
        server_url.replacen("ws://", "http://", 1)
    } else if server_url.starts_with("wss://") {
        server_url.replacen("wss://", "https://", 1)
    } else if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// Probes the server's health endpoint.
pub async fn check_server(server_url: &str) -> Result<(), RemoteError> {
    let response = reqwest::Client::new()
        .get(build_http_url(server_url, "/health"))
        .timeout(Duration::from_secs(5))
        .send()
        .await
        .map_err(|e| RemoteError::Unavailable(e.to_string()))?;

    check_response(response).await
}

async fn check_response(response: reqwest::Response) -> Result<(), RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let message = match response.json::<ApiError>().await {
        Ok(body) => body.message,
        Err(_) => status.to_string(),
    };

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(RemoteError::Unauthorized(message))
    } else {
        Err(RemoteError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        doc: Document,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(scope, kind.as_str(), &doc.id);
        self.send(scope, self.http.put(url).json(&doc.data)).await
    }

    async fn delete(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        id: &str,
    ) -> Result<(), RemoteError> {
        let url = self.document_url(scope, kind.as_str(), id);
        self.send(scope, self.http.delete(url)).await
    }

    async fn batch_put(
        &self,
        scope: &RemoteScope,
        kind: CollectionKind,
        docs: Vec<Document>,
    ) -> Result<(), RemoteError> {
        let url = self.collection_url(scope, kind.as_str());
        let body = BatchRequest { documents: docs };
        self.send(scope, self.http.post(url).json(&body)).await
    }

    async fn put_stats(&self, scope: &RemoteScope, stats: &Stats) -> Result<(), RemoteError> {
        let url = self.document_url(scope, "settings", "stats");
        self.send(scope, self.http.put(url).json(stats)).await
    }

    fn subscribe(
        &self,
        scope: &RemoteScope,
        target: RemoteTarget,
        order: Option<OrderBy>,
        sink: EventSink,
    ) -> Subscription {
        let ws_url = self.build_ws_url(&scope.token);

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                sink.send(target, RemotePayload::Error(e.to_string()));
                return Subscription::inert(target);
            }
        };

        let task = handle.spawn(async move {
            let mut backoff = RECONNECT_INITIAL;
            loop {
                match run_listener(&ws_url, target, order.clone(), &sink, &mut backoff).await {
                    Ok(ListenerEnd::SinkClosed) => break,
                    Ok(ListenerEnd::Disconnected) => {
                        tracing::info!(%target, "listener disconnected, reconnecting");
                    }
                    Err(e) if e.is_permanent() => {
                        tracing::warn!(%target, error = %e, "listener rejected");
                        sink.send(target, RemotePayload::Error(e.to_string()));
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(%target, error = %e, retry_in = ?backoff, "listener failed");
                        if !sink.send(target, RemotePayload::Error(e.to_string())) {
                            break;
                        }
                    }
                }
                if sink.is_closed() {
                    break;
                }
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(RECONNECT_MAX);
            }
            tracing::debug!(%target, "listener stopped");
        });

        Subscription::new(target, move || task.abort())
    }
}

/// How a listener connection ended without an error.
#[derive(Debug, PartialEq)]
enum ListenerEnd {
    /// Nobody consumes the snapshots any more.
    SinkClosed,
    /// The server closed the socket.
    Disconnected,
}

/// Forwards snapshot frames until the socket closes or the sink goes away.
/// `backoff` is reset once the first snapshot arrives.
async fn run_listener(
    ws_url: &str,
    target: RemoteTarget,
    order: Option<OrderBy>,
    sink: &EventSink,
    backoff: &mut Duration,
) -> Result<ListenerEnd, RemoteError> {
    let (ws_stream, _) = connect_async(ws_url).await.map_err(|e| match e {
        tungstenite::Error::Http(response) if response.status().is_client_error() => {
            RemoteError::Unauthorized(format!("listen refused ({})", response.status()))
        }
        e => RemoteError::Unavailable(e.to_string()),
    })?;
    let (mut sender, mut receiver) = ws_stream.split();

    let listen = ProtocolMessage::Listen {
        target: target.to_string(),
        order_by: order,
    };
    let encoded = listen
        .encode()
        .map_err(|e| RemoteError::Cbor(e.to_string()))?;
    sender
        .send(Message::Binary(encoded.into()))
        .await
        .map_err(|e| RemoteError::WebSocket(e.to_string()))?;

    tracing::debug!(%target, "listener attached");

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Binary(data)) => {
                let msg =
                    ProtocolMessage::decode(&data).map_err(|e| RemoteError::Cbor(e.to_string()))?;
                match msg {
                    ProtocolMessage::Snapshot { data, .. } => {
                        let payload = decode_snapshot(target, &data)
                            .map_err(|e| RemoteError::InvalidDocument(e.to_string()))?;
                        if !sink.send(target, payload) {
                            let _ = sender.send(Message::Close(None)).await;
                            return Ok(ListenerEnd::SinkClosed);
                        }
                        *backoff = RECONNECT_INITIAL;
                    }
                    ProtocolMessage::Error { message } => {
                        return Err(RemoteError::Listener(message));
                    }
                    ProtocolMessage::Listen { .. } => {
                        // Only clients send listen
                    }
                }
            }
            Ok(Message::Ping(data)) => {
                sender
                    .send(Message::Pong(data))
                    .await
                    .map_err(|e| RemoteError::WebSocket(e.to_string()))?;
            }
            Ok(Message::Close(_)) => return Ok(ListenerEnd::Disconnected),
            Ok(_) => {}
            Err(e) => return Err(RemoteError::WebSocket(e.to_string())),
        }
    }

    Ok(ListenerEnd::Disconnected)
}
