//! # Comment Editor
//!
//! Per-session state machine for writing, editing and deleting comments on
//! one post. The acting identity is passed to every call; edit and delete go
//! through the ownership gate (`identity.uid == comment.user_id`).
//!
//! ```text
//! Idle/Composing --submit--> Submitting --> Idle
//! Idle/Composing --start_edit--> Editing(id) --save_edit--> Submitting --> Idle
//!                                Editing(id) --cancel_edit--> Idle
//! Idle/Composing --request_delete--> ConfirmingDelete(id) --confirm--> Submitting --> Idle
//! ```
//!
//! Only one write may be outstanding per editor. A second write attempt while
//! `Submitting` is refused with `Conflict`, never queued.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde_json::{Map, Value};

use crate::error::{AppError, Result};
use crate::models::{display_date, Comment, Identity};
use crate::traits::{paths, DocumentStore};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditorState {
    #[default]
    Idle,
    /// A new comment draft is non-empty.
    Composing,
    Editing(String),
    ConfirmingDelete(String),
    Submitting,
}

#[derive(Default)]
struct Inner {
    state: EditorState,
    draft: String,
    edit_text: String,
    /// Author of the comment under edit or pending deletion.
    target_owner: Option<String>,
}

impl Inner {
    /// Where the editor returns to once an action completes.
    fn rest(&mut self) {
        self.state = if self.draft.is_empty() {
            EditorState::Idle
        } else {
            EditorState::Composing
        };
        self.edit_text.clear();
        self.target_owner = None;
    }

    fn ensure_resting(&self) -> Result<()> {
        match self.state {
            EditorState::Idle | EditorState::Composing => Ok(()),
            EditorState::Submitting => Err(AppError::conflict("a change is already being saved")),
            _ => Err(AppError::conflict("finish the current edit or deletion first")),
        }
    }

    fn check_target_owner(&self, identity: Option<&Identity>) -> Result<()> {
        let identity = identity.ok_or_else(|| AppError::unauthorized("sign in first"))?;
        if self.target_owner.as_deref() == Some(identity.uid.as_str()) {
            Ok(())
        } else {
            Err(AppError::unauthorized("you can only change your own comments"))
        }
    }
}

fn gate(identity: Option<&Identity>, comment: &Comment) -> Result<()> {
    match identity {
        None => Err(AppError::unauthorized("sign in first")),
        Some(user) if user.owns(comment) => Ok(()),
        Some(_) => Err(AppError::unauthorized("you can only change your own comments")),
    }
}

pub struct CommentEditor {
    store: Arc<dyn DocumentStore>,
    post_id: String,
    inner: Mutex<Inner>,
}

impl CommentEditor {
    pub fn new(store: Arc<dyn DocumentStore>, post_id: impl Into<String>) -> Self {
        Self {
            store,
            post_id: post_id.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn state(&self) -> EditorState {
        self.lock().state.clone()
    }

    pub fn draft(&self) -> String {
        self.lock().draft.clone()
    }

    pub fn edit_text(&self) -> String {
        self.lock().edit_text.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the new-comment draft. The draft survives view refreshes and
    /// failed submits.
    pub fn set_draft(&self, text: impl Into<String>) {
        let mut inner = self.lock();
        inner.draft = text.into();
        if matches!(inner.state, EditorState::Idle | EditorState::Composing) {
            inner.rest();
        }
    }

    /// Publishes the draft as a new comment by `identity`.
    pub async fn submit(&self, identity: Option<&Identity>) -> Result<Comment> {
        let (mut comment, submitted_draft) = {
            let mut inner = self.lock();
            inner.ensure_resting()?;

            let text = inner.draft.trim().to_string();
            if text.is_empty() {
                return Err(AppError::validation("comment cannot be empty"));
            }
            let user = identity.ok_or_else(|| AppError::unauthorized("sign in to comment"))?;

            let now = Utc::now();
            let comment = Comment {
                id: String::new(),
                user_id: user.uid.clone(),
                name: user.display_name().to_string(),
                photo_url: user.photo_url.clone(),
                comment: text,
                timestamp: now.timestamp_millis(),
                date: display_date(now),
                edited: None,
                updated_at: None,
            };
            inner.state = EditorState::Submitting;
            (comment, inner.draft.clone())
        };

        let path = paths::comments(&self.post_id);
        let written = match serde_json::to_value(&comment) {
            Ok(record) => self.store.push(&path, record).await,
            Err(err) => Err(err.into()),
        };

        let mut inner = self.lock();
        match written {
            Ok(key) => {
                // Keep anything typed while the write was in flight.
                if inner.draft == submitted_draft {
                    inner.draft.clear();
                }
                inner.rest();
                comment.id = key;
                log::debug!("comment {} added to {}", comment.id, self.post_id);
                Ok(comment)
            }
            Err(err) => {
                log::error!("adding comment to {path} failed: {err:#}");
                inner.rest();
                Err(AppError::WriteFailure)
            }
        }
    }

    /// Opens `comment` for editing if `identity` wrote it.
    pub fn start_edit(&self, identity: Option<&Identity>, comment: &Comment) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_resting()?;
        gate(identity, comment)?;

        inner.state = EditorState::Editing(comment.id.clone());
        inner.edit_text = comment.comment.clone();
        inner.target_owner = Some(comment.user_id.clone());
        Ok(())
    }

    pub fn set_edit_text(&self, text: impl Into<String>) -> Result<()> {
        let mut inner = self.lock();
        if !matches!(inner.state, EditorState::Editing(_)) {
            return Err(AppError::conflict("no comment is being edited"));
        }
        inner.edit_text = text.into();
        Ok(())
    }

    /// Saves the edit text as a partial update; other fields stay untouched.
    pub async fn save_edit(&self, identity: Option<&Identity>) -> Result<()> {
        let (comment_id, fields) = {
            let mut inner = self.lock();
            let comment_id = match &inner.state {
                EditorState::Editing(id) => id.clone(),
                EditorState::Submitting => {
                    return Err(AppError::conflict("a change is already being saved"))
                }
                _ => return Err(AppError::conflict("no comment is being edited")),
            };

            let text = inner.edit_text.trim().to_string();
            if text.is_empty() {
                return Err(AppError::validation("comment cannot be empty"));
            }
            inner.check_target_owner(identity)?;

            let mut fields = Map::new();
            fields.insert("comment".into(), Value::from(text));
            fields.insert("edited".into(), Value::from(true));
            fields.insert("updatedAt".into(), Value::from(Utc::now().timestamp_millis()));

            inner.state = EditorState::Submitting;
            (comment_id, fields)
        };

        let path = paths::comment(&self.post_id, &comment_id);
        let written = self.store.update(&path, fields).await;

        let mut inner = self.lock();
        match written {
            Ok(()) => {
                inner.rest();
                Ok(())
            }
            Err(err) => {
                log::error!("updating {path} failed: {err:#}");
                inner.state = EditorState::Editing(comment_id);
                Err(AppError::WriteFailure)
            }
        }
    }

    pub fn cancel_edit(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, EditorState::Editing(_)) {
            inner.rest();
        }
    }

    /// Asks for confirmation before deleting `comment`.
    pub fn request_delete(&self, identity: Option<&Identity>, comment: &Comment) -> Result<()> {
        let mut inner = self.lock();
        inner.ensure_resting()?;
        gate(identity, comment)?;

        inner.state = EditorState::ConfirmingDelete(comment.id.clone());
        inner.target_owner = Some(comment.user_id.clone());
        Ok(())
    }

    pub async fn confirm_delete(&self, identity: Option<&Identity>) -> Result<()> {
        let comment_id = {
            let mut inner = self.lock();
            let comment_id = match &inner.state {
                EditorState::ConfirmingDelete(id) => id.clone(),
                EditorState::Submitting => {
                    return Err(AppError::conflict("a change is already being saved"))
                }
                _ => return Err(AppError::conflict("no deletion is awaiting confirmation")),
            };
            inner.check_target_owner(identity)?;
            inner.state = EditorState::Submitting;
            comment_id
        };

        let path = paths::comment(&self.post_id, &comment_id);
        let written = self.store.remove(&path).await;

        let mut inner = self.lock();
        inner.rest();
        written.map_err(|err| {
            log::error!("deleting {path} failed: {err:#}");
            AppError::WriteFailure
        })
    }

    pub fn cancel_delete(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, EditorState::ConfirmingDelete(_)) {
            inner.rest();
        }
    }
}
