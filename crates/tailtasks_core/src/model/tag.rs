//! Tag model. Titles are free text and not unique.

use serde::{Deserialize, Serialize};

/// Store-generated tag identifier.
pub type TagId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub title: String,
}
