//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlPhase`: the orchestrator's state machine
//! - `ParticipantState`: how far one participant's follow-list retrieval got
//! - `ParticipantSet`: the ordered, frozen set of thread participants
//! - `CrawlState`: cursor bookkeeping for one paginated operation

mod crawl_phase;
mod participant_state;
mod participants;

pub use crawl_phase::CrawlPhase;
pub use participant_state::ParticipantState;
pub use participants::ParticipantSet;

/// Pagination cursor of a single paginated operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlState {
    /// Continuation token for the next request, `None` before the first page
    pub cursor: Option<String>,

    /// Pages received so far
    pub pages: u32,

    /// Whether the operation reached its end (exhaustion or abort)
    pub finished: bool,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received page and its continuation token
    pub fn advance(&mut self, next: Option<String>) {
        self.pages += 1;
        self.finished = next.is_none();
        self.cursor = next;
    }

    /// Marks the operation as finished
    pub fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_until_last_page() {
        let mut state = CrawlState::new();
        state.advance(Some("c1".to_string()));
        assert_eq!(state.cursor.as_deref(), Some("c1"));
        assert!(!state.finished);

        state.advance(None);
        assert_eq!(state.pages, 2);
        assert!(state.finished);
    }
}
