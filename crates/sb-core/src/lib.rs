//! serene/crates/sb-core/src/lib.rs
//!
//! Domain logic and interface definitions for the Serene spa site:
//! blog comments, post navigation, booking and review moderation.

pub mod booking;
pub mod editor;
pub mod error;
pub mod models;
pub mod moderation;
pub mod navigator;
pub mod sync;
pub mod traits;

// Re-exporting for easier access in other crates
pub use booking::BookingService;
pub use editor::{CommentEditor, EditorState};
pub use error::*;
pub use models::*;
pub use moderation::ReviewBoard;
pub use navigator::{navigate, Navigation};
pub use sync::{derive_view, CommentSynchronizer, PostOrder, ViewStream};
pub use traits::*;
