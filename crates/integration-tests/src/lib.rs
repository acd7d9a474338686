//! Shared fixtures for the cross-crate tests.

use std::sync::Arc;

use sb_core::models::Identity;
use sb_store_memory::MemoryDocumentStore;
use serde_json::{json, Value};

/// Four posts whose store keys (a..d) disagree with their publication dates.
pub fn blog_tree() -> Value {
    json!({
        "blogs": {
            "a-hot-stones": {
                "title": "Hot stone therapy",
                "date": "2024-03-10",
                "content": [
                    { "type": "h2", "value": "Why heat helps" },
                    { "type": "p", "value": "Warm basalt loosens tight muscles." }
                ],
                "comments": {
                    "c-old": {
                        "userId": "u-ben",
                        "name": "Ben",
                        "comment": "Booked again!",
                        "timestamp": 1_710_000_000_000_i64,
                        "date": "March 9, 2024"
                    }
                }
            },
            "b-aromatherapy": { "title": "Aromatherapy oils", "date": "January 5, 2024" },
            "c-reflexology": { "title": "Reflexology basics", "date": "2024-06-02" },
            "d-couples": { "title": "Couples retreat", "date": "not a date" }
        }
    })
}

pub fn seeded_store() -> Arc<MemoryDocumentStore> {
    Arc::new(MemoryDocumentStore::from_value(blog_tree()))
}

pub fn user(uid: &str, name: &str) -> Identity {
    Identity {
        uid: uid.into(),
        display_name: Some(name.into()),
        ..Default::default()
    }
}
