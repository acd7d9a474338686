//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use crate::models::Identity;

/// A complete point-in-time materialization of a subscribed subtree.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    /// `None` when nothing is stored at `path`.
    pub value: Option<Value>,
}

/// Live feed of snapshots for one subtree.
///
/// Dropping the subscription (or calling `unsubscribe`) detaches it from the
/// store; no snapshot is delivered afterwards.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Snapshot>,
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new<F>(receiver: mpsc::UnboundedReceiver<Snapshot>, detach: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            receiver,
            detach: Some(Box::new(detach)),
        }
    }

    /// Waits for the next snapshot. `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Snapshot> {
        self.receiver.recv().await
    }

    /// Returns an already delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Snapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.detach.is_some())
            .finish()
    }
}

/// Hierarchical document store addressed by `/`-separated paths.
///
/// Writing `null` anywhere deletes. Conflicting writes are last-write-wins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribes to the subtree at `path`. The current value is delivered
    /// first, then one snapshot per change at, above, or below `path`.
    async fn subscribe(&self, path: &str) -> anyhow::Result<Subscription>;

    /// One-shot read.
    async fn get(&self, path: &str) -> anyhow::Result<Option<Value>>;

    /// Appends `value` under a freshly generated child key and returns it.
    /// Generated keys sort in insertion order.
    async fn push(&self, path: &str, value: Value) -> anyhow::Result<String>;

    /// Replaces whatever is at `path`.
    async fn set(&self, path: &str, value: Value) -> anyhow::Result<()>;

    /// Merges `fields` into the object at `path`, leaving other fields untouched.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> anyhow::Result<()>;

    async fn remove(&self, path: &str) -> anyhow::Result<()>;
}

/// Opens sessions and resolves a session token to the acting user.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies credentials and returns a fresh session token.
    async fn sign_in(&self, email: &str, password: &str) -> crate::error::Result<(String, Identity)>;

    /// Returns false when the token was not signed in.
    async fn sign_out(&self, token: &str) -> bool;

    /// `None` for unknown or signed-out tokens.
    async fn identify(&self, token: &str) -> Option<Identity>;
}

/// Store paths used by the site.
pub mod paths {
    pub const BLOGS: &str = "blogs";
    pub const APPOINTMENTS: &str = "appointments";

    pub fn post(post_id: &str) -> String {
        format!("{BLOGS}/{post_id}")
    }

    pub fn comments(post_id: &str) -> String {
        format!("{BLOGS}/{post_id}/comments")
    }

    pub fn comment(post_id: &str, comment_id: &str) -> String {
        format!("{BLOGS}/{post_id}/comments/{comment_id}")
    }

    pub fn notifications(uid: &str) -> String {
        format!("notifications/{uid}")
    }
}
