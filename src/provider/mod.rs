//! External collaborators: the reply-search provider and the account provider
//!
//! The crawler only talks to these traits. `TwitterClient` implements both
//! against a REST API; tests substitute in-memory fakes.
//!
//! Paginated calls never signal end-of-stream through an error. They answer
//! every request with a [`PageOutcome`]:
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | `Page` | Items plus the continuation token (`None` on the last page) |
//! | `Exhausted` | No more data |
//! | `Throttled` | Request quota exhausted, retry the same request later |
//! | `Failed` | Provider-side error, abort this paginated operation |

mod http;
#[cfg(test)]
pub(crate) mod memory;
mod wire;

pub use http::{build_http_client, TwitterClient};

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by non-paginated provider calls
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Request quota exhausted")]
    Throttled,

    #[error("Provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    /// Returns true if this error is the provider's throttling signal
    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled)
    }
}

/// One page of a paginated result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Continuation token for the next page, `None` when this is the last one
    pub next: Option<String>,
}

/// Tagged answer to a single paginated request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome<T> {
    Page(Page<T>),
    Exhausted,
    Throttled,
    Failed(String),
}

impl<T> From<ProviderError> for PageOutcome<T> {
    fn from(error: ProviderError) -> Self {
        if error.is_throttled() {
            Self::Throttled
        } else {
            Self::Failed(error.to_string())
        }
    }
}

/// The root post of a thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    /// Canonical identifier as reported by the provider
    pub id: String,

    /// Handle of the post's author
    pub author: String,
}

/// A reply candidate returned by the reply search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRecord {
    /// Identifier of the reply itself
    pub id: String,

    /// Handle of the account that wrote the reply
    pub author: String,

    /// Identifier of the post this one answers, as reported upstream
    pub in_reply_to: Option<String>,
}

impl ReplyRecord {
    /// Returns the replied-to post id, if there is a real one
    ///
    /// Upstream serializes a missing reply target as the literal string
    /// `"None"` in some payloads; that, an empty string and an absent field
    /// all mean "not a reply".
    pub fn reply_target(&self) -> Option<&str> {
        match self.in_reply_to.as_deref() {
            None | Some("") | Some("None") => None,
            Some(id) => Some(id),
        }
    }
}

/// A resolved account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub handle: String,
}

/// Parameters of a reply search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyQuery {
    /// Handle the replies are addressed to
    pub author: String,

    /// Only records newer than this post id are returned
    pub since_id: String,

    /// Records requested per page
    pub page_size: u32,
}

/// Reply-search provider
#[async_trait]
pub trait ThreadProvider: Send + Sync {
    /// Looks up the root post of a thread
    async fn lookup_post(&self, post_id: &str) -> Result<PostRef, ProviderError>;

    /// Fetches one page of reply candidates
    async fn search_replies(
        &self,
        query: &ReplyQuery,
        cursor: Option<&str>,
    ) -> PageOutcome<ReplyRecord>;
}

/// Account and follow-list provider
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// Resolves a handle to an account record
    ///
    /// Fails for unknown, suspended or protected accounts.
    async fn resolve_account(&self, handle: &str) -> Result<Account, ProviderError>;

    /// Fetches one page of the accounts `account` follows
    async fn follows_page(
        &self,
        account: &Account,
        page_size: u32,
        cursor: Option<&str>,
    ) -> PageOutcome<Account>;
}
