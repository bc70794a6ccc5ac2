//! Relationship correlation
//!
//! Intersects one participant's follow-set with the participant set. Pure and
//! synchronous; all I/O happens before and after.

use crate::crawler::follows::FollowSet;
use crate::state::ParticipantSet;
use std::collections::HashSet;

/// A directed "follower follows followed" relationship between participants
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub follower: String,
    pub followed: String,
}

impl Edge {
    pub fn new(follower: impl Into<String>, followed: impl Into<String>) -> Self {
        Self {
            follower: follower.into(),
            followed: followed.into(),
        }
    }
}

/// Run-wide edge accumulator
///
/// Keeps insertion order and rejects a pair it already holds.
#[derive(Debug, Default, Clone)]
pub struct EdgeList {
    edges: Vec<Edge>,
    seen: HashSet<Edge>,
}

impl EdgeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `edge` unless it is already present
    pub fn push(&mut self, edge: Edge) -> bool {
        if self.seen.contains(&edge) {
            return false;
        }
        self.seen.insert(edge.clone());
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    pub fn into_vec(self) -> Vec<Edge> {
        self.edges
    }
}

/// Appends an edge from the follow-set owner to every participant it follows
///
/// Returns the number of new edges. Self-loops are never emitted.
pub fn correlate(follows: &FollowSet, participants: &ParticipantSet, edges: &mut EdgeList) -> usize {
    let mut added = 0;
    for candidate in participants.handles() {
        if *candidate == follows.owner || !follows.follows(candidate) {
            continue;
        }
        if edges.push(Edge::new(&follows.owner, candidate)) {
            tracing::info!("{} follows {}", follows.owner, candidate);
            added += 1;
        }
    }
    added
}
