//! Follow-set retrieval for one participant

use crate::crawler::throttle::{
    call_with_cooldown, Pacing, PageSource, PageStep, Paginator, RateGate,
};
use crate::output::Artifacts;
use crate::provider::{Account, AccountProvider, PageOutcome};
use async_trait::async_trait;
use std::collections::HashSet;

/// Accounts followed by one participant
#[derive(Debug, Clone)]
pub struct FollowSet {
    pub owner: String,

    /// Followed handles, deduplicated
    pub handles: HashSet<String>,

    /// Followed handles in provider order, as dumped to disk
    pub raw: Vec<String>,

    /// False when a provider error stopped pagination early
    pub complete: bool,

    pub pages: u32,
}

impl FollowSet {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            handles: HashSet::new(),
            raw: Vec::new(),
            complete: true,
            pages: 0,
        }
    }

    pub fn extend<I: IntoIterator<Item = String>>(&mut self, handles: I) {
        for handle in handles {
            self.handles.insert(handle.clone());
            self.raw.push(handle);
        }
    }

    pub fn follows(&self, handle: &str) -> bool {
        self.handles.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Result of one follow-set retrieval
#[derive(Debug, Clone)]
pub enum FollowOutcome {
    Retrieved(FollowSet),

    /// The account could not be resolved; no follow list was requested
    Unresolved { handle: String, reason: String },
}

struct FollowList<'a, P: ?Sized> {
    provider: &'a P,
    account: Account,
    page_size: u32,
}

#[async_trait]
impl<'a, P: AccountProvider + ?Sized> PageSource for FollowList<'a, P> {
    type Item = Account;

    async fn fetch_page(&self, cursor: Option<&str>) -> PageOutcome<Account> {
        self.provider
            .follows_page(&self.account, self.page_size, cursor)
            .await
    }
}

/// Retrieves the complete follow list of `handle`
///
/// Resolution failures are appended to the error log and reported as
/// [`FollowOutcome::Unresolved`]. A provider error while paging keeps what was
/// gathered and marks the set incomplete. One cooldown is observed after every
/// page.
pub async fn retrieve_follows<P: AccountProvider + ?Sized>(
    provider: &P,
    gate: &RateGate,
    handle: &str,
    page_size: u32,
    artifacts: &Artifacts,
) -> FollowOutcome {
    tracing::info!("Resolving account {}", handle);

    let account = match call_with_cooldown(gate, handle, move || provider.resolve_account(handle))
        .await
    {
        Ok(account) => account,
        Err(e) => {
            let reason = e.to_string();
            tracing::warn!("Error in fetching user {}: {}", handle, reason);
            if let Err(log_err) = artifacts.error_log.record(handle, &reason) {
                tracing::error!(
                    "Failed to write {}: {}",
                    artifacts.error_log.path().display(),
                    log_err
                );
            }
            return FollowOutcome::Unresolved {
                handle: handle.to_string(),
                reason,
            };
        }
    };

    let mut paginator = Paginator::new(
        FollowList {
            provider,
            account,
            page_size,
        },
        gate,
        Pacing::EveryPage,
        format!("follows of {}", handle),
    );

    let mut set = FollowSet::new(handle);
    loop {
        match paginator.next_page().await {
            PageStep::Items(accounts) => {
                set.extend(accounts.into_iter().map(|a| a.handle));
            }
            PageStep::Exhausted => break,
            PageStep::Aborted(detail) => {
                tracing::warn!(
                    "Follow list of {} incomplete after {} handles: {}",
                    handle,
                    set.raw.len(),
                    detail
                );
                set.complete = false;
                break;
            }
        }
    }
    set.pages = paginator.pages_fetched();

    tracing::info!(
        "{} follows {} accounts ({} pages)",
        handle,
        set.len(),
        set.pages
    );

    if let Some(dumps) = &artifacts.dumps {
        match dumps.write(handle, &set.raw) {
            Ok(path) => tracing::debug!("Wrote {}", path.display()),
            Err(e) => tracing::warn!("Could not dump follows of {}: {}", handle, e),
        }
    }

    FollowOutcome::Retrieved(set)
}
