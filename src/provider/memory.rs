//! Scripted in-memory providers for unit tests

use crate::provider::{
    Account, AccountProvider, Page, PageOutcome, PostRef, ProviderError, ReplyQuery, ReplyRecord,
    ThreadProvider,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

/// Provider answering from scripted outcomes
///
/// Each paginated call pops the next scripted outcome; an empty script
/// answers `Exhausted`. Every request is recorded so tests can check retries.
#[derive(Default)]
pub(crate) struct MemoryProvider {
    posts: HashMap<String, PostRef>,
    throttled_lookups: Mutex<u32>,
    replies: Mutex<VecDeque<PageOutcome<ReplyRecord>>>,
    accounts: HashMap<String, Account>,
    follows: Mutex<HashMap<String, VecDeque<PageOutcome<Account>>>>,
    requests: Mutex<Vec<(String, Instant)>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_post(mut self, id: &str, author: &str) -> Self {
        self.posts.insert(
            id.to_string(),
            PostRef {
                id: id.to_string(),
                author: author.to_string(),
            },
        );
        self
    }

    /// The next `count` lookups answer with the throttling signal
    pub fn with_throttled_lookups(self, count: u32) -> Self {
        *self.throttled_lookups.lock().unwrap() = count;
        self
    }

    pub fn with_reply_outcomes(self, outcomes: Vec<PageOutcome<ReplyRecord>>) -> Self {
        self.replies.lock().unwrap().extend(outcomes);
        self
    }

    pub fn with_account(mut self, handle: &str) -> Self {
        self.accounts.insert(
            handle.to_string(),
            Account {
                id: format!("id-{}", handle),
                handle: handle.to_string(),
            },
        );
        self
    }

    pub fn with_follow_outcomes(self, handle: &str, outcomes: Vec<PageOutcome<Account>>) -> Self {
        self.follows
            .lock()
            .unwrap()
            .entry(handle.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// Registers an account whose follow list is a single page
    pub fn with_follows(self, handle: &str, follows: &[&str]) -> Self {
        self.with_account(handle)
            .with_follow_outcomes(handle, vec![follow_page(follows, None)])
    }

    /// Requests received so far, formatted as `<call>:<argument>:<cursor>`
    pub fn requests(&self) -> Vec<String> {
        self.timed_requests()
            .into_iter()
            .map(|(request, _)| request)
            .collect()
    }

    /// Requests received so far with the instant each one arrived
    pub fn timed_requests(&self) -> Vec<(String, Instant)> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, request: String) {
        self.requests.lock().unwrap().push((request, Instant::now()));
    }

    fn take_throttle(&self) -> bool {
        let mut remaining = self.throttled_lookups.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            true
        } else {
            false
        }
    }
}

/// A reply record
pub(crate) fn reply(id: &str, author: &str, in_reply_to: Option<&str>) -> ReplyRecord {
    ReplyRecord {
        id: id.to_string(),
        author: author.to_string(),
        in_reply_to: in_reply_to.map(str::to_string),
    }
}

/// A page of reply records
pub(crate) fn reply_page(items: Vec<ReplyRecord>, next: Option<&str>) -> PageOutcome<ReplyRecord> {
    PageOutcome::Page(Page {
        items,
        next: next.map(str::to_string),
    })
}

/// A page of followed accounts
pub(crate) fn follow_page(handles: &[&str], next: Option<&str>) -> PageOutcome<Account> {
    PageOutcome::Page(Page {
        items: handles
            .iter()
            .map(|handle| Account {
                id: format!("id-{}", handle),
                handle: handle.to_string(),
            })
            .collect(),
        next: next.map(str::to_string),
    })
}

/// Collects handles into a set
pub(crate) fn handle_set(handles: &[&str]) -> HashSet<String> {
    handles.iter().map(|h| h.to_string()).collect()
}

#[async_trait]
impl ThreadProvider for MemoryProvider {
    async fn lookup_post(&self, post_id: &str) -> Result<PostRef, ProviderError> {
        self.record(format!("lookup:{}", post_id));
        if self.take_throttle() {
            return Err(ProviderError::Throttled);
        }
        self.posts
            .get(post_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("post {}", post_id)))
    }

    async fn search_replies(
        &self,
        query: &ReplyQuery,
        cursor: Option<&str>,
    ) -> PageOutcome<ReplyRecord> {
        self.record(format!(
            "search:{}:{}",
            query.author,
            cursor.unwrap_or("-")
        ));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(PageOutcome::Exhausted)
    }
}

#[async_trait]
impl AccountProvider for MemoryProvider {
    async fn resolve_account(&self, handle: &str) -> Result<Account, ProviderError> {
        self.record(format!("resolve:{}", handle));
        self.accounts
            .get(handle)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(format!("user {}", handle)))
    }

    async fn follows_page(
        &self,
        account: &Account,
        _page_size: u32,
        cursor: Option<&str>,
    ) -> PageOutcome<Account> {
        self.record(format!(
            "follows:{}:{}",
            account.handle,
            cursor.unwrap_or("-")
        ));
        self.follows
            .lock()
            .unwrap()
            .get_mut(&account.handle)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PageOutcome::Exhausted)
    }
}
