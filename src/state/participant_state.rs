/// Participant state definitions for tracking follow-list retrieval
use std::fmt;

/// Represents how far a participant's follow-list retrieval got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    /// Not attempted yet
    Pending,

    /// Follow list retrieved until the provider reported exhaustion
    Retrieved,

    /// A provider error stopped pagination; the follow set is incomplete
    Partial,

    /// The handle could not be resolved to an account
    Unresolved,
}

impl ParticipantState {
    /// Converts the state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Retrieved => "retrieved",
            Self::Partial => "partial",
            Self::Unresolved => "unresolved",
        }
    }

    /// Parses a state from a database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "retrieved" => Some(Self::Retrieved),
            "partial" => Some(Self::Partial),
            "unresolved" => Some(Self::Unresolved),
            _ => None,
        }
    }

    /// Returns all participant states
    pub fn all_states() -> [Self; 4] {
        [
            Self::Pending,
            Self::Retrieved,
            Self::Partial,
            Self::Unresolved,
        ]
    }
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
