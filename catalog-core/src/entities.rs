//! Core entity structures

use crate::{RecordId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Record - a single catalog entry.
///
/// Owned by the durable store. The cache only ever holds a serialized,
/// time-bounded snapshot of one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    pub price: u64,
    pub description: String,
    pub category: String,
    /// `None` and `Some("")` are distinct and both survive the cache codec.
    pub image: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Record {
    /// Materialize a draft into a record with the given identity and timestamp.
    pub fn from_draft(id: RecordId, draft: RecordDraft, now: Timestamp) -> Self {
        Self {
            id,
            name: draft.name,
            price: draft.price,
            description: draft.description,
            category: draft.category,
            image: draft.image,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place and bump `updated_at`.
    pub fn apply(&mut self, patch: &RecordPatch, now: Timestamp) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = &patch.category {
            self.category = category.clone();
        }
        if let Some(image) = &patch.image {
            self.image = image.clone();
        }
        self.updated_at = now;
    }
}

/// Input for creating a record. The store assigns identity and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDraft {
    pub name: String,
    pub price: u64,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl RecordDraft {
    pub fn new(
        name: impl Into<String>,
        price: u64,
        description: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            price,
            description: description.into(),
            category: category.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Update payload for records.
///
/// `None` leaves a field untouched. For `image`, `Some(None)` clears the
/// reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub price: Option<u64>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image: Option<Option<String>>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn price(mut self, price: u64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn image(mut self, image: Option<String>) -> Self {
        self.image = Some(image);
        self
    }
}

/// Acknowledgement returned by mutations that do not hand back the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Updated(RecordId),
    Deleted(RecordId),
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Updated(id) => write!(f, "record {} updated", id),
            Self::Deleted(id) => write!(f, "record {} deleted", id),
        }
    }
}
