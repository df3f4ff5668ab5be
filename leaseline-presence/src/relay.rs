//! WebSocket handling and direct-message relay.
//!
//! The service accepts WebSocket connections from the platform's web
//! clients, binds each one to a user id on `addUser`, and routes `sendMsg`
//! payloads to the recipient's connection as `receiveMsg` events. Delivery
//! is best-effort: a message to a user with no live registered connection is
//! dropped silently, never buffered and never broadcast.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use leaseline_proto::event::{self, ClientEvent, DirectMessage, ServerEvent};
use tokio::sync::mpsc;

use crate::registry::{ConnectionId, PresenceRegistry};

/// Default maximum allowed WebSocket message size in bytes (64 KB).
const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Shared service state holding the presence registry.
pub struct PresenceState {
    /// Who is online, and on which connection.
    pub registry: PresenceRegistry,
    /// Maximum WebSocket message size, enforced at the transport layer.
    max_message_size: usize,
}

impl Default for PresenceState {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceState {
    /// Creates service state with an empty registry and the default message
    /// size limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: PresenceRegistry::new(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Creates service state with a custom message size limit.
    #[must_use]
    pub fn with_config(max_message_size: usize) -> Self {
        Self {
            registry: PresenceRegistry::new(),
            max_message_size,
        }
    }
}

/// Handles one upgraded WebSocket connection for its whole lifetime.
///
/// Connection lifecycle:
/// 1. Mint a [`ConnectionId`] and attach the connection to the registry.
/// 2. Spawn a writer task draining the outbound channel into the socket.
/// 3. Read incoming events: `addUser` registers the user, `sendMsg` relays.
/// 4. On disconnect, detach the connection and purge its presence entries.
pub async fn handle_socket(socket: WebSocket, state: Arc<PresenceState>) {
    let conn_id = ConnectionId::new();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Channel feeding this connection's writer task. The registry holds a
    // clone so relays from other connections can reach it.
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    state.registry.attach(conn_id, tx.clone()).await;

    tracing::debug!(conn = %conn_id, "connection established");

    let writer_conn_id = conn_id;
    let mut write_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                tracing::warn!(conn = %writer_conn_id, "WebSocket write failed");
                break;
            }
        }
    });

    let reader_state = Arc::clone(&state);
    let mut read_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_event(conn_id, text.as_str(), &tx, &reader_state).await;
                }
                Message::Close(_) => {
                    tracing::debug!(conn = %conn_id, "received close frame");
                    break;
                }
                _ => {
                    // Ignore binary, ping, pong frames.
                }
            }
        }
    });

    // Wait for either task to finish, then abort the other.
    tokio::select! {
        _ = &mut read_task => {
            write_task.abort();
        }
        _ = &mut write_task => {
            read_task.abort();
        }
    }

    state.registry.detach(conn_id).await;
    tracing::debug!(conn = %conn_id, "connection closed and detached");
}

/// Handles one text frame from a client.
///
/// Malformed frames (bad JSON, unknown event, missing fields) are logged and
/// ignored — observationally the same as a relay to an unknown recipient.
async fn handle_event(
    conn_id: ConnectionId,
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &Arc<PresenceState>,
) {
    let parsed = match event::decode_client(text) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(conn = %conn_id, error = %e, "ignoring malformed event");
            return;
        }
    };

    match parsed {
        ClientEvent::AddUser(user_id) => {
            if let Some(replaced) = state.registry.register(&user_id, conn_id).await
                && replaced != conn_id
            {
                tracing::info!(user = %user_id, "user re-registered on a new connection");
            }
            tracing::info!(user = %user_id, conn = %conn_id, "user online");
            send_event(tx, &ServerEvent::UserAdded(user_id));
        }
        ClientEvent::SendMsg(dm) => {
            relay_message(state, conn_id, dm).await;
        }
    }
}

/// Routes a direct message to the recipient's connection, if any.
///
/// Fire-and-forget: an unavailable recipient (never registered, or whose
/// connection closed) means the message is dropped with no error to the
/// sender. The channel push is non-blocking; transport backpressure is the
/// transport's concern.
async fn relay_message(state: &Arc<PresenceState>, from: ConnectionId, dm: DirectMessage) {
    let Some(sender) = state.registry.resolve(&dm.to).await else {
        tracing::debug!(from = %from, to = %dm.to, "recipient unavailable, dropping message");
        return;
    };

    tracing::debug!(from = %from, to = %dm.to, "relaying message");
    send_event(&sender, &ServerEvent::ReceiveMsg(dm.message));
}

/// Encodes a server event and pushes it onto one connection's channel.
///
/// A closed channel means the recipient disconnected mid-relay; the message
/// is dropped, consistent with best-effort delivery.
fn send_event(tx: &mpsc::UnboundedSender<Message>, event: &ServerEvent) {
    match event::encode_server(event) {
        Ok(text) => {
            let _ = tx.send(Message::Text(text.into()));
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode server event");
        }
    }
}

/// Starts the presence server on the given address and returns the bound
/// address and a join handle.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server(
    addr: &str,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    start_server_with_state(addr, Arc::new(PresenceState::new())).await
}

/// Starts the presence server with a pre-configured [`PresenceState`].
///
/// Use [`PresenceState::with_config`] to apply limits from the resolved
/// [`crate::config::PresenceConfig`]. This is the entry point shared by
/// `main.rs` and test code.
///
/// # Errors
///
/// Returns an error if the TCP listener cannot bind to the given address.
pub async fn start_server_with_state(
    addr: &str,
    state: Arc<PresenceState>,
) -> Result<
    (std::net::SocketAddr, tokio::task::JoinHandle<()>),
    Box<dyn std::error::Error + Send + Sync>,
> {
    let app = axum::Router::new()
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "presence server error");
        }
    });

    Ok((bound_addr, handle))
}

/// axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: axum::extract::ws::WebSocketUpgrade,
    axum::extract::State(state): axum::extract::State<Arc<PresenceState>>,
) -> impl axum::response::IntoResponse {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}
