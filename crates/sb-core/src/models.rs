//! # Domain Models
//!
//! These structs mirror the records kept in the document store. Wire names
//! follow the store's camelCase convention; record ids are the store keys.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// A blog post under `blogs/{id}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Filled from the store key when materialized.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub comments: BTreeMap<String, Comment>,
}

impl Post {
    /// Builds a post from the record stored under `key`.
    ///
    /// Older records name the title `heading` and the body `contentBlocks`.
    /// When both spellings are present the canonical one wins unless it is
    /// empty. Comments are parsed one by one so that a single malformed
    /// comment does not hide the whole post; the bad entry is skipped with a
    /// warning.
    pub fn from_record(key: &str, record: &Value) -> Result<Self, serde_json::Error> {
        let mut record = record.clone();
        let raw_comments = match record.as_object_mut() {
            Some(fields) => {
                fold_legacy_field(fields, "title", "heading");
                fold_legacy_field(fields, "content", "contentBlocks");
                fields.remove("comments")
            }
            None => None,
        };

        let mut post: Post = serde_json::from_value(record)?;
        post.id = key.to_string();

        if let Some(Value::Object(entries)) = raw_comments {
            for (comment_id, raw) in entries {
                match serde_json::from_value::<Comment>(raw) {
                    Ok(mut comment) => {
                        comment.id = comment_id.clone();
                        post.comments.insert(comment_id, comment);
                    }
                    Err(err) => {
                        log::warn!("skipping malformed comment {key}/{comment_id}: {err}");
                    }
                }
            }
        }
        Ok(post)
    }
}

fn fold_legacy_field(fields: &mut Map<String, Value>, canonical: &str, legacy: &str) {
    let Some(fallback) = fields.remove(legacy) else {
        return;
    };
    let missing = match fields.get(canonical) {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    };
    if missing {
        fields.insert(canonical.to_string(), fallback);
    }
}

/// One block of a post body.
///
/// Stored as `{ "type": "<tag>", "value": ... }`. Tags this build does not
/// know, and known tags whose value has the wrong shape, land in `Unknown`
/// and are kept verbatim so they survive a read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBlock", into = "RawBlock")]
pub enum ContentBlock {
    H1(String),
    H2(String),
    H3(String),
    Paragraph(String),
    List(Vec<String>),
    DescList(Vec<DescItem>),
    Image(ImageBlock),
    Unknown { kind: String, value: Value },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescItem {
    pub term: String,
    #[serde(alias = "description", alias = "definition")]
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageBlock {
    /// Accepts either a bare URL or `{ "url" | "src", "caption" }`.
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(url) => Some(Self {
                url: url.clone(),
                caption: None,
            }),
            Value::Object(fields) => {
                let url = fields
                    .get("url")
                    .or_else(|| fields.get("src"))
                    .and_then(Value::as_str)?;
                let caption = fields
                    .get("caption")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Some(Self {
                    url: url.to_string(),
                    caption,
                })
            }
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    value: Value,
}

impl From<RawBlock> for ContentBlock {
    fn from(raw: RawBlock) -> Self {
        let text = || raw.value.as_str().map(str::to_string);
        let parsed = match raw.kind.as_str() {
            "h1" => text().map(ContentBlock::H1),
            "h2" => text().map(ContentBlock::H2),
            "h3" => text().map(ContentBlock::H3),
            "p" => text().map(ContentBlock::Paragraph),
            "list" => serde_json::from_value(raw.value.clone())
                .ok()
                .map(ContentBlock::List),
            "descList" => serde_json::from_value(raw.value.clone())
                .ok()
                .map(ContentBlock::DescList),
            "image" => ImageBlock::from_value(&raw.value).map(ContentBlock::Image),
            _ => None,
        };
        parsed.unwrap_or(ContentBlock::Unknown {
            kind: raw.kind,
            value: raw.value,
        })
    }
}

impl From<ContentBlock> for RawBlock {
    fn from(block: ContentBlock) -> Self {
        let (kind, value) = match block {
            ContentBlock::H1(text) => ("h1".to_string(), Value::from(text)),
            ContentBlock::H2(text) => ("h2".to_string(), Value::from(text)),
            ContentBlock::H3(text) => ("h3".to_string(), Value::from(text)),
            ContentBlock::Paragraph(text) => ("p".to_string(), Value::from(text)),
            ContentBlock::List(items) => ("list".to_string(), Value::from(items)),
            ContentBlock::DescList(items) => (
                "descList".to_string(),
                items
                    .into_iter()
                    .map(|item| json!({ "term": item.term, "details": item.details }))
                    .collect(),
            ),
            ContentBlock::Image(image) => {
                let mut fields = serde_json::Map::new();
                fields.insert("url".into(), Value::from(image.url));
                if let Some(caption) = image.caption {
                    fields.insert("caption".into(), Value::from(caption));
                }
                ("image".to_string(), Value::Object(fields))
            }
            ContentBlock::Unknown { kind, value } => (kind, value),
        };
        RawBlock { kind, value }
    }
}

/// A reader comment under `blogs/{postId}/comments/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Filled from the store key when materialized.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub comment: String,
    /// Creation instant in milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

impl Comment {
    pub fn is_edited(&self) -> bool {
        self.edited.unwrap_or(false)
    }
}

/// The acting user, as supplied by an `IdentityProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "photoURL", skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Name shown next to the user's comments.
    pub fn display_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.name.as_deref())
            .or(self.email.as_deref())
            .unwrap_or("Anonymous")
    }

    pub fn owns(&self, comment: &Comment) -> bool {
        self.uid == comment.user_id
    }
}

/// Everything the post page shows, derived from one store snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub all_posts: Vec<Post>,
    pub current_post: Option<Post>,
    /// Newest first.
    pub comments: Vec<Comment>,
    pub prev_post_id: Option<String>,
    pub next_post_id: Option<String>,
    pub related_posts: Vec<Post>,
}

/// Booking form payload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub service: String,
    pub date: String,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Bookings are recorded as pending; staff confirm them outside the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Pending,
}

/// A booking as stored under `appointments/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(flatten)]
    pub request: AppointmentRequest,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub created_at: i64,
}

/// A message for a signed-in user under `notifications/{uid}/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub read: bool,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
}

/// A customer review as seen by the admin dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub author: String,
    pub service: String,
    pub rating: u8,
    pub text: String,
    pub date: String,
    pub status: ReviewStatus,
}

/// Date string shown under comments, e.g. "October 19, 2026".
pub fn display_date(at: DateTime<Utc>) -> String {
    at.format("%B %-d, %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn content_blocks_parse_each_known_tag() {
        let raw = json!([
            { "type": "h1", "value": "Hot stone massage" },
            { "type": "p", "value": "Warm basalt stones." },
            { "type": "list", "value": ["Relaxes muscles", "Improves sleep"] },
            { "type": "descList", "value": [{ "term": "Duration", "details": "60 min" }] },
            { "type": "image", "value": { "src": "/img/stones.jpg", "caption": "Stones" } },
        ]);
        let blocks: Vec<ContentBlock> = serde_json::from_value(raw).unwrap();

        assert_eq!(blocks[0], ContentBlock::H1("Hot stone massage".into()));
        assert_eq!(blocks[1], ContentBlock::Paragraph("Warm basalt stones.".into()));
        assert_eq!(
            blocks[2],
            ContentBlock::List(vec!["Relaxes muscles".into(), "Improves sleep".into()])
        );
        assert_eq!(
            blocks[3],
            ContentBlock::DescList(vec![DescItem {
                term: "Duration".into(),
                details: "60 min".into()
            }])
        );
        assert_eq!(
            blocks[4],
            ContentBlock::Image(ImageBlock {
                url: "/img/stones.jpg".into(),
                caption: Some("Stones".into())
            })
        );
    }

    #[test]
    fn unknown_and_misshapen_blocks_are_kept_verbatim() {
        let raw = json!([
            { "type": "video", "value": { "id": "abc" } },
            { "type": "h2", "value": 42 },
        ]);
        let blocks: Vec<ContentBlock> = serde_json::from_value(raw.clone()).unwrap();

        assert!(matches!(&blocks[0], ContentBlock::Unknown { kind, .. } if kind == "video"));
        assert!(matches!(&blocks[1], ContentBlock::Unknown { kind, .. } if kind == "h2"));
        assert_eq!(serde_json::to_value(&blocks).unwrap(), raw);
    }

    #[test]
    fn post_from_record_takes_ids_from_keys_and_skips_bad_comments() {
        let record = json!({
            "heading": "Aromatherapy basics",
            "date": "2024-02-01",
            "comments": {
                "c1": { "userId": "u1", "name": "Ana", "comment": "Lovely", "timestamp": 10, "date": "x" },
                "c2": { "comment": "no author, no timestamp" }
            }
        });

        let post = Post::from_record("p1", &record).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.title, "Aromatherapy basics");
        assert_eq!(post.comments.len(), 1);
        assert_eq!(post.comments["c1"].id, "c1");
    }

    #[test]
    fn canonical_and_legacy_names_may_coexist() {
        let record = json!({
            "title": "Card title",
            "heading": "Page heading",
            "content": [{ "type": "p", "value": "Body" }],
            "contentBlocks": [{ "type": "p", "value": "Old body" }],
        });
        let post = Post::from_record("a", &record).unwrap();
        assert_eq!(post.title, "Card title");
        assert_eq!(post.content, vec![ContentBlock::Paragraph("Body".into())]);

        let record = json!({
            "title": "",
            "heading": "Page heading",
            "content": [],
            "contentBlocks": [{ "type": "h2", "value": "Old body" }],
        });
        let post = Post::from_record("a", &record).unwrap();
        assert_eq!(post.title, "Page heading");
        assert_eq!(post.content, vec![ContentBlock::H2("Old body".into())]);
    }

    #[test]
    fn identity_display_name_falls_back() {
        let mut user = Identity {
            uid: "u1".into(),
            email: Some("ana@example.com".into()),
            ..Default::default()
        };
        assert_eq!(user.display_name(), "ana@example.com");
        user.name = Some("Ana".into());
        assert_eq!(user.display_name(), "Ana");
        user.display_name = Some("Ana P.".into());
        assert_eq!(user.display_name(), "Ana P.");
        assert_eq!(Identity::default().display_name(), "Anonymous");
    }

    #[test]
    fn display_date_is_long_form() {
        let at = Utc.with_ymd_and_hms(2026, 10, 9, 12, 0, 0).unwrap();
        assert_eq!(display_date(at), "October 9, 2026");
    }
}
