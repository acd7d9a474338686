//! # Comment Synchronizer
//!
//! Turns the live `blogs` subtree into `ViewSnapshot`s for one post page.
//! Every store notification produces a complete snapshot; nothing is patched
//! in place, so a view never mixes fields from two store states.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::{Comment, Post, ViewSnapshot};
use crate::navigator::navigate;
use crate::traits::{paths, DocumentStore, Subscription};

/// Order in which posts are listed and navigated.
///
/// `StoreKey` keeps the store's key enumeration order, which follows
/// insertion rather than publication date. `Chronological` sorts by the
/// post's `date`, oldest first; posts whose date cannot be read go last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostOrder {
    #[default]
    StoreKey,
    Chronological,
}

/// Reads every post record under `blogs`, in store key order.
pub fn materialize_posts(blogs: Option<&Value>) -> Vec<Post> {
    let Some(Value::Object(records)) = blogs else {
        return Vec::new();
    };

    records
        .iter()
        .filter_map(|(key, record)| match Post::from_record(key, record) {
            Ok(post) => Some(post),
            Err(err) => {
                log::warn!("skipping malformed post {key}: {err}");
                None
            }
        })
        .collect()
}

pub fn order_posts(posts: &mut [Post], order: PostOrder) {
    if order == PostOrder::Chronological {
        posts.sort_by_cached_key(|post| {
            let date = parse_post_date(&post.date);
            (date.is_none(), date)
        });
    }
}

fn parse_post_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.date_naive());
    }
    ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Derives the full page state for `post_id` from the `blogs` subtree.
pub fn derive_view(blogs: Option<&Value>, post_id: &str, order: PostOrder) -> ViewSnapshot {
    let mut all_posts = materialize_posts(blogs);
    order_posts(&mut all_posts, order);

    let Some(current) = all_posts.iter().find(|post| post.id == post_id).cloned() else {
        return ViewSnapshot {
            all_posts,
            ..Default::default()
        };
    };

    let mut comments: Vec<Comment> = current.comments.values().cloned().collect();
    comments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let navigation = navigate(&all_posts, post_id);

    ViewSnapshot {
        current_post: Some(current),
        comments,
        prev_post_id: navigation.prev_id,
        next_post_id: navigation.next_id,
        related_posts: navigation.related,
        all_posts,
    }
}

pub struct CommentSynchronizer {
    store: Arc<dyn DocumentStore>,
    order: PostOrder,
}

impl CommentSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, order: PostOrder) -> Self {
        Self { store, order }
    }

    /// Starts a live view of `post_id`. Calling it again starts a fresh,
    /// independent stream.
    pub async fn subscribe(&self, post_id: &str) -> Result<ViewStream> {
        let subscription = self.store.subscribe(paths::BLOGS).await.map_err(|err| {
            log::error!("subscribing to {} failed: {err:#}", paths::BLOGS);
            AppError::Internal("posts are unavailable right now".into())
        })?;

        Ok(ViewStream {
            subscription,
            post_id: post_id.to_string(),
            order: self.order,
        })
    }

    /// One-shot view of `post_id` from the current store state.
    pub async fn snapshot(&self, post_id: &str) -> Result<ViewSnapshot> {
        let blogs = self.read_blogs().await?;
        Ok(derive_view(blogs.as_ref(), post_id, self.order))
    }

    /// All posts in navigation order.
    pub async fn posts(&self) -> Result<Vec<Post>> {
        let blogs = self.read_blogs().await?;
        let mut posts = materialize_posts(blogs.as_ref());
        order_posts(&mut posts, self.order);
        Ok(posts)
    }

    async fn read_blogs(&self) -> Result<Option<Value>> {
        self.store.get(paths::BLOGS).await.map_err(|err| {
            log::error!("reading {} failed: {err:#}", paths::BLOGS);
            AppError::Internal("posts are unavailable right now".into())
        })
    }
}

/// Live sequence of views for one post.
#[derive(Debug)]
pub struct ViewStream {
    subscription: Subscription,
    post_id: String,
    order: PostOrder,
}

impl ViewStream {
    /// Waits for the next store change and derives the view from it.
    pub async fn next(&mut self) -> Option<ViewSnapshot> {
        let snapshot = self.subscription.next().await?;
        Some(derive_view(snapshot.value.as_ref(), &self.post_id, self.order))
    }

    /// Like `next`, but only returns a view that has already arrived.
    pub fn try_next(&mut self) -> Option<ViewSnapshot> {
        let snapshot = self.subscription.try_next()?;
        Some(derive_view(snapshot.value.as_ref(), &self.post_id, self.order))
    }

    pub fn unsubscribe(self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockDocumentStore, Snapshot};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    fn blogs() -> Value {
        json!({
            "a": { "title": "Deep tissue", "date": "2024-03-01" },
            "b": {
                "title": "Hot stones",
                "date": "2024-01-15",
                "comments": {
                    "c1": { "userId": "u1", "name": "Ana", "comment": "first", "timestamp": 100, "date": "d" },
                    "c2": { "userId": "u2", "name": "Ben", "comment": "third", "timestamp": 300, "date": "d" },
                    "c3": { "userId": "u1", "name": "Ana", "comment": "second", "timestamp": 200, "date": "d" }
                }
            },
            "c": { "title": "Reflexology", "date": "2023-12-24" },
            "d": { "title": "Aromatherapy", "date": "not a date" }
        })
    }

    #[test]
    fn view_sorts_comments_newest_first() {
        let view = derive_view(Some(&blogs()), "b", PostOrder::StoreKey);

        let texts: Vec<&str> = view.comments.iter().map(|c| c.comment.as_str()).collect();
        assert_eq!(texts, vec!["third", "second", "first"]);
        assert!(view
            .comments
            .windows(2)
            .all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[test]
    fn view_navigates_in_store_key_order() {
        let view = derive_view(Some(&blogs()), "b", PostOrder::StoreKey);

        assert_eq!(view.current_post.as_ref().map(|p| p.id.as_str()), Some("b"));
        assert_eq!(view.prev_post_id.as_deref(), Some("a"));
        assert_eq!(view.next_post_id.as_deref(), Some("c"));
        let related: Vec<&str> = view.related_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(related, vec!["c", "d", "a"]);
    }

    #[test]
    fn chronological_order_puts_undated_posts_last() {
        let view = derive_view(Some(&blogs()), "b", PostOrder::Chronological);

        let order: Vec<&str> = view.all_posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a", "d"]);
        assert_eq!(view.prev_post_id.as_deref(), Some("c"));
        assert_eq!(view.next_post_id.as_deref(), Some("a"));
    }

    #[test]
    fn missing_post_yields_empty_view() {
        let view = derive_view(Some(&blogs()), "zzz", PostOrder::StoreKey);

        assert_eq!(view.all_posts.len(), 4);
        assert!(view.current_post.is_none());
        assert!(view.comments.is_empty());
        assert!(view.prev_post_id.is_none());
        assert!(view.next_post_id.is_none());
        assert!(view.related_posts.is_empty());

        assert_eq!(derive_view(None, "a", PostOrder::StoreKey), ViewSnapshot::default());
    }

    #[test]
    fn malformed_posts_are_skipped() {
        let raw = json!({ "a": { "title": "ok" }, "b": "garbage", "c": { "title": 7 } });
        let posts = materialize_posts(Some(&raw));
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "a");
    }

    #[test]
    fn posts_with_both_title_spellings_stay_navigable() {
        let raw = json!({
            "a": { "title": "Card title", "heading": "Page heading", "date": "2024-01-01" },
            "b": { "title": "Hot stones", "date": "2024-02-01" }
        });
        let ids: Vec<String> = materialize_posts(Some(&raw)).into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["a", "b"]);

        let view = derive_view(Some(&raw), "a", PostOrder::StoreKey);
        assert_eq!(view.current_post.map(|p| p.title).as_deref(), Some("Card title"));
        assert_eq!(view.next_post_id.as_deref(), Some("b"));
    }

    #[test]
    fn parses_common_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_post_date("2024-03-05"), expected);
        assert_eq!(parse_post_date("March 5, 2024"), expected);
        assert_eq!(parse_post_date("Mar 5, 2024"), expected);
        assert_eq!(parse_post_date("2024-03-05T10:00:00Z"), expected);
        assert_eq!(parse_post_date("soon"), None);
    }

    #[tokio::test]
    async fn stream_emits_one_view_per_snapshot_until_unsubscribed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let detached = Arc::new(AtomicBool::new(false));
        let flag = detached.clone();
        let subscription = Subscription::new(rx, move || flag.store(true, Ordering::SeqCst));

        let mut store = MockDocumentStore::new();
        store
            .expect_subscribe()
            .withf(|path| path == "blogs")
            .return_once(move |_| Ok(subscription));

        let sync = CommentSynchronizer::new(Arc::new(store), PostOrder::StoreKey);
        let mut stream = sync.subscribe("b").await.unwrap();

        tx.send(Snapshot { path: "blogs".into(), value: Some(blogs()) }).unwrap();
        let first = stream.next().await.unwrap();
        assert_eq!(first.comments.len(), 3);

        tx.send(Snapshot { path: "blogs".into(), value: None }).unwrap();
        let second = stream.next().await.unwrap();
        assert!(second.current_post.is_none());

        stream.unsubscribe();
        assert!(detached.load(Ordering::SeqCst));
        assert!(tx.send(Snapshot { path: "blogs".into(), value: None }).is_err());
    }

    #[tokio::test]
    async fn subscribe_failure_is_internal_error() {
        let mut store = MockDocumentStore::new();
        store
            .expect_subscribe()
            .returning(|_| Err(anyhow::anyhow!("connection refused")));

        let sync = CommentSynchronizer::new(Arc::new(store), PostOrder::StoreKey);
        assert!(matches!(sync.subscribe("b").await, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn snapshot_reads_once() {
        let mut store = MockDocumentStore::new();
        store
            .expect_get()
            .times(1)
            .returning(|_| Ok(Some(blogs())));

        let sync = CommentSynchronizer::new(Arc::new(store), PostOrder::StoreKey);
        let view = sync.snapshot("a").await.unwrap();
        assert_eq!(view.current_post.unwrap().title, "Deep tissue");
    }
}
