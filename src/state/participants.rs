//! The participant set of one thread

use std::collections::HashSet;

/// Ordered, duplicate-free set of participant handles
///
/// Repliers are inserted in discovery order while replies are collected. Once
/// collection ends the root author is placed first and the set is frozen;
/// follow lists are retrieved in the resulting order.
#[derive(Debug, Clone, Default)]
pub struct ParticipantSet {
    handles: Vec<String>,
    index: HashSet<String>,
    frozen: bool,
}

impl ParticipantSet {
    /// Creates an empty, open set
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a handle; returns false if it was already present or the set is frozen
    pub fn insert(&mut self, handle: &str) -> bool {
        if self.frozen || self.index.contains(handle) {
            return false;
        }
        self.index.insert(handle.to_string());
        self.handles.push(handle.to_string());
        true
    }

    /// Places the root author first and freezes the set
    ///
    /// An author who also replied to their own post is moved to the front
    /// rather than listed twice.
    pub fn freeze_with_author(&mut self, author: &str) {
        if self.frozen {
            return;
        }
        self.handles.retain(|h| h != author);
        self.handles.insert(0, author.to_string());
        self.index.insert(author.to_string());
        self.frozen = true;
    }

    /// Builds a frozen set from a root author and repliers in discovery order
    pub fn from_thread(author: &str, repliers: &[String]) -> Self {
        let mut set = Self::new();
        for replier in repliers {
            set.insert(replier);
        }
        set.freeze_with_author(author);
        set
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.index.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in retrieval order
    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    /// Repliers in discovery order, excluding the root author
    pub fn repliers(&self) -> &[String] {
        if self.frozen {
            &self.handles[1..]
        } else {
            &self.handles
        }
    }
}
