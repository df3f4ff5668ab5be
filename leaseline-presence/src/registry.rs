//! Presence registry: which user is live on which connection.
//!
//! The registry is the single shared piece of state in the service. It is
//! created once at server start and handed to every connection handler by
//! `Arc`; nothing here is a process global. Two maps live behind one lock:
//! user id to connection id, and connection id to the sender half of that
//! connection's outbound channel.

use std::collections::HashMap;

use axum::extract::ws::Message;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// Opaque identifier for one live WebSocket connection.
///
/// Minted server-side (UUID v7) when the socket is accepted and never
/// reused, so a recycled transport-level id can never misdirect a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Mints a fresh connection identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Default)]
struct Inner {
    /// User id to the connection that currently answers for it.
    ///
    /// At most one connection per user: a later registration for the same
    /// user overwrites the earlier one (last-writer-wins).
    users: HashMap<String, ConnectionId>,
    /// Connection id to the sender for that connection's writer task.
    connections: HashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
}

/// Shared user-to-connection mapping with per-connection outbound channels.
///
/// Thread-safe via [`RwLock`]; registration and relay run concurrently from
/// different connection tasks.
#[derive(Default)]
pub struct PresenceRegistry {
    inner: RwLock<Inner>,
}

impl PresenceRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a freshly accepted connection and its outbound sender.
    ///
    /// The connection starts unregistered: it can send messages but cannot
    /// receive any until a user id is bound to it via [`Self::register`].
    pub async fn attach(&self, conn_id: ConnectionId, sender: mpsc::UnboundedSender<Message>) {
        let mut inner = self.inner.write().await;
        inner.connections.insert(conn_id, sender);
    }

    /// Binds a user id to a connection, replacing any prior binding
    /// unconditionally.
    ///
    /// The user id comes from the platform's auth layer and is not validated
    /// here. Always succeeds; returns the connection that previously
    /// answered for this user, if any.
    pub async fn register(&self, user_id: &str, conn_id: ConnectionId) -> Option<ConnectionId> {
        let mut inner = self.inner.write().await;
        inner.users.insert(user_id.to_string(), conn_id)
    }

    /// Returns the outbound sender for the connection currently registered
    /// to `user_id`.
    ///
    /// `None` covers every flavor of "recipient unavailable": the user never
    /// registered, or its entry points at a connection that has already
    /// closed.
    pub async fn resolve(&self, user_id: &str) -> Option<mpsc::UnboundedSender<Message>> {
        let inner = self.inner.read().await;
        let conn_id = inner.users.get(user_id)?;
        inner.connections.get(conn_id).cloned()
    }

    /// Removes a closed connection and purges every user entry that maps to
    /// it, so presence never goes stale across reconnects.
    pub async fn detach(&self, conn_id: ConnectionId) {
        let mut inner = self.inner.write().await;
        inner.connections.remove(&conn_id);
        inner.users.retain(|_, c| *c != conn_id);
    }

    /// Whether `user_id` currently has a live, registered connection.
    pub async fn is_online(&self, user_id: &str) -> bool {
        self.resolve(user_id).await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (
        mpsc::UnboundedSender<Message>,
        mpsc::UnboundedReceiver<Message>,
    ) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn register_then_resolve() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = channel();

        registry.attach(conn, tx).await;
        registry.register("alice", conn).await;

        assert!(registry.resolve("alice").await.is_some());
        assert!(registry.is_online("alice").await);
    }

    #[tokio::test]
    async fn resolve_unknown_user_is_none() {
        let registry = PresenceRegistry::new();
        assert!(registry.resolve("nobody").await.is_none());
        assert!(!registry.is_online("nobody").await);
    }

    #[tokio::test]
    async fn last_registration_wins() {
        let registry = PresenceRegistry::new();
        let conn1 = ConnectionId::new();
        let conn3 = ConnectionId::new();
        let (tx1, _rx1) = channel();
        let (tx3, mut rx3) = channel();

        registry.attach(conn1, tx1).await;
        registry.attach(conn3, tx3).await;

        let replaced = registry.register("alice", conn1).await;
        assert!(replaced.is_none());

        let replaced = registry.register("alice", conn3).await;
        assert_eq!(replaced, Some(conn1));

        // Messages for alice now land on conn3's channel, never conn1's.
        let sender = registry.resolve("alice").await.unwrap();
        sender.send(Message::Text("x".into())).unwrap();
        assert!(rx3.recv().await.is_some());
    }

    #[tokio::test]
    async fn detach_purges_user_entries() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = channel();

        registry.attach(conn, tx).await;
        registry.register("alice", conn).await;
        registry.detach(conn).await;

        assert!(registry.resolve("alice").await.is_none());
    }

    #[tokio::test]
    async fn detach_leaves_other_users_alone() {
        let registry = PresenceRegistry::new();
        let conn_a = ConnectionId::new();
        let conn_b = ConnectionId::new();
        let (tx_a, _rx_a) = channel();
        let (tx_b, _rx_b) = channel();

        registry.attach(conn_a, tx_a).await;
        registry.attach(conn_b, tx_b).await;
        registry.register("alice", conn_a).await;
        registry.register("bob", conn_b).await;

        registry.detach(conn_a).await;

        assert!(registry.resolve("alice").await.is_none());
        assert!(registry.resolve("bob").await.is_some());
    }

    #[tokio::test]
    async fn stale_entry_resolves_to_none() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();

        // Entry points at a connection that was never attached — the same
        // shape as a mapping that outlived its connection.
        registry.register("alice", conn).await;

        assert!(registry.resolve("alice").await.is_none());
    }

    #[tokio::test]
    async fn one_connection_may_answer_for_several_users() {
        let registry = PresenceRegistry::new();
        let conn = ConnectionId::new();
        let (tx, _rx) = channel();

        registry.attach(conn, tx).await;
        registry.register("alice", conn).await;
        registry.register("alice-work", conn).await;

        assert!(registry.resolve("alice").await.is_some());
        assert!(registry.resolve("alice-work").await.is_some());

        registry.detach(conn).await;
        assert!(registry.resolve("alice").await.is_none());
        assert!(registry.resolve("alice-work").await.is_none());
    }

    #[tokio::test]
    async fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        assert_ne!(a, b);
    }
}
