//! Placement targets.
//!
//! A zone is a destination labeled with a category; the coordinator's
//! placement evaluation (`Node::object_entered_zone`) fires when a shared
//! object overlaps a zone whose category matches the object's.

use handoff_shared::ObjectEntry;

/// A destination area accepting objects of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    category: String,
}

impl Zone {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn accepts(&self, object: &ObjectEntry) -> bool {
        object.category() == self.category
    }
}
