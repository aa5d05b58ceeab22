use std::fmt;

use crate::dao::storage::{StorageError, StorageResult};

/// Characters the hosted store refuses inside a key.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Slash separated address of a node inside the state tree (`sessions/{id}/participants`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a textual path, rejecting empty paths and malformed keys.
    pub fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(StorageError::invalid_path(raw, "path must not be empty"));
        }

        let segments = trimmed
            .split('/')
            .map(|segment| validate_key(segment).map(|_| segment.to_string()))
            .collect::<StorageResult<Vec<_>>>()
            .map_err(|_| StorageError::invalid_path(raw, "path contains an invalid key"))?;

        Ok(Self { segments })
    }

    /// Path with a single top-level key.
    pub fn root(key: &str) -> StorageResult<Self> {
        validate_key(key)?;
        Ok(Self {
            segments: vec![key.to_string()],
        })
    }

    /// Extend the path with a key that was already validated or is a known field name.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(key.into());
        Self { segments }
    }

    /// Extend the path with a caller-supplied key, validating it first.
    pub fn join(&self, key: &str) -> StorageResult<Self> {
        validate_key(key)?;
        Ok(self.child(key))
    }

    /// Keys making up the path, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether `self` is `other` or one of its descendants.
    pub fn starts_with(&self, other: &KeyPath) -> bool {
        self.segments.starts_with(&other.segments)
    }

    /// Whether a write at one path can change the value observed at the other.
    pub fn overlaps(&self, other: &KeyPath) -> bool {
        self.starts_with(other) || other.starts_with(self)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Check that a key can be stored as a single path segment.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_path(key, "key must not be empty"));
    }
    if key.contains(FORBIDDEN_KEY_CHARS) || key.chars().any(char::is_control) {
        return Err(StorageError::invalid_path(
            key,
            "key contains a forbidden character",
        ));
    }
    Ok(())
}
