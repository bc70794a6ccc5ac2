/// Crawl phase definitions for the orchestrator state machine
///
/// A run moves strictly forward through these phases. Only reply collection can
/// fail the run; per-participant failures are absorbed.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Looking up the root post and collecting repliers
    CollectReplies,

    /// Retrieving the root author's follow list
    ResolveRootAuthorFollows,

    /// Retrieving every replier's follow list
    ResolveParticipantFollows,

    /// Writing the edge list and archiving the run
    Serialize,

    /// Run finished
    Done,

    /// Run aborted before any follow-list work
    Failed,
}

impl CrawlPhase {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns true if `next` is a legal successor of this phase
    pub fn can_transition_to(&self, next: CrawlPhase) -> bool {
        matches!(
            (self, next),
            (Self::CollectReplies, Self::ResolveRootAuthorFollows)
                | (Self::CollectReplies, Self::Failed)
                | (Self::ResolveRootAuthorFollows, Self::ResolveParticipantFollows)
                | (Self::ResolveParticipantFollows, Self::Serialize)
                | (Self::Serialize, Self::Done)
        )
    }

    /// Converts the phase to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollectReplies => "collect_replies",
            Self::ResolveRootAuthorFollows => "resolve_root_author_follows",
            Self::ResolveParticipantFollows => "resolve_participant_follows",
            Self::Serialize => "serialize",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
