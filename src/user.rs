//! The owner of all stored entities.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// A newtype wrapper for opaque user keys.
///
/// Every category, expense and budget belongs to exactly one user, and the
/// [Repository](crate::Repository) only ever reads and writes the collections
/// of the user it was created for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The user ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
