//! # sb-store-memory
//!
//! In-process implementation of `DocumentStore`.
//! Holds the whole tree as one JSON value; object keys enumerate in sorted
//! order, and generated keys are UUIDv7 so that order is insertion order.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use sb_core::traits::{DocumentStore, Snapshot, Subscription};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct MemoryDocumentStore {
    state: Arc<Mutex<State>>,
    online: AtomicBool,
}

struct State {
    root: Value,
    subscribers: Vec<Subscriber>,
    next_subscriber: u64,
}

struct Subscriber {
    id: u64,
    path: String,
    sender: mpsc::UnboundedSender<Snapshot>,
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// True when one path is an ancestor of (or equal to) the other.
fn overlaps(a: &[&str], b: &[&str]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(children) => children.is_empty(),
        _ => false,
    }
}

fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let node = segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(*segment))?;
    (!is_empty_node(node)).then_some(node)
}

/// Writes `value` at `segments`, creating parents on the way down and
/// pruning parents left empty on the way back up. `null` deletes.
fn write_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = if value.is_null() {
            Value::Object(Map::new())
        } else {
            value
        };
        return;
    };

    if !node.is_object() {
        if is_empty_node(&value) {
            return;
        }
        *node = Value::Object(Map::new());
    }
    let Value::Object(children) = node else {
        return;
    };

    if rest.is_empty() {
        if is_empty_node(&value) {
            children.remove(*head);
        } else {
            children.insert(head.to_string(), value);
        }
        return;
    }

    let child = children.entry(head.to_string()).or_insert(Value::Null);
    write_at(child, rest, value);
    if is_empty_node(child) {
        children.remove(*head);
    }
}

impl State {
    fn notify(&mut self, written: &str) {
        let written = segments(written);
        let root = &self.root;
        self.subscribers.retain(|subscriber| {
            let watched = segments(&subscriber.path);
            if !overlaps(&watched, &written) {
                return true;
            }
            let snapshot = Snapshot {
                path: subscriber.path.clone(),
                value: lookup(root, &watched).cloned(),
            };
            // A closed receiver means the subscription is gone.
            subscriber.sender.send(snapshot).is_ok()
        });
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    pub fn from_value(root: Value) -> Self {
        let mut tree = Value::Object(Map::new());
        write_at(&mut tree, &[], root);
        Self {
            state: Arc::new(Mutex::new(State {
                root: tree,
                subscribers: Vec::new(),
                next_subscriber: 1,
            })),
            online: AtomicBool::new(true),
        }
    }

    /// Seeds the store from a JSON file holding the whole tree.
    pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading seed file {}", path.display()))?;
        let root: Value = serde_json::from_str(&raw)
            .with_context(|| format!("parsing seed file {}", path.display()))?;
        log::info!("seeded document store from {}", path.display());
        Ok(Self::from_value(root))
    }

    /// While offline every write fails, as with a dropped connection.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().map(|state| state.subscribers.len()).unwrap_or(0)
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("document store lock poisoned"))
    }

    fn ensure_online(&self) -> anyhow::Result<()> {
        if !self.online.load(Ordering::SeqCst) {
            bail!("document store is offline");
        }
        Ok(())
    }

    fn write(&self, path: &str, value: Value) -> anyhow::Result<()> {
        self.ensure_online()?;
        let mut state = self.lock()?;
        write_at(&mut state.root, &segments(path), value);
        state.notify(path);
        Ok(())
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn detach(state: Weak<Mutex<State>>, id: u64) -> impl FnOnce() + Send + 'static {
    move || {
        if let Some(state) = state.upgrade() {
            if let Ok(mut state) = state.lock() {
                state.subscribers.retain(|subscriber| subscriber.id != id);
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe(&self, path: &str) -> anyhow::Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.lock()?;

        let id = state.next_subscriber;
        state.next_subscriber += 1;
        sender
            .send(Snapshot {
                path: path.to_string(),
                value: lookup(&state.root, &segments(path)).cloned(),
            })
            .map_err(|_| anyhow!("subscriber went away"))?;
        state.subscribers.push(Subscriber {
            id,
            path: path.to_string(),
            sender,
        });
        log::debug!("subscription {id} attached to {path}");

        Ok(Subscription::new(receiver, detach(Arc::downgrade(&self.state), id)))
    }

    async fn get(&self, path: &str) -> anyhow::Result<Option<Value>> {
        let state = self.lock()?;
        Ok(lookup(&state.root, &segments(path)).cloned())
    }

    async fn push(&self, path: &str, value: Value) -> anyhow::Result<String> {
        let key = Uuid::now_v7().to_string();
        self.write(&format!("{path}/{key}"), value)?;
        log::debug!("pushed {key} under {path}");
        Ok(key)
    }

    async fn set(&self, path: &str, value: Value) -> anyhow::Result<()> {
        self.write(path, value)
    }

    async fn update(&self, path: &str, fields: Map<String, Value>) -> anyhow::Result<()> {
        self.ensure_online()?;
        let mut state = self.lock()?;
        let base = segments(path);
        for (field, value) in fields {
            let mut target = base.clone();
            target.push(field.as_str());
            write_at(&mut state.root, &target, value);
        }
        state.notify(path);
        Ok(())
    }

    async fn remove(&self, path: &str) -> anyhow::Result<()> {
        self.write(path, Value::Null)
    }
}
