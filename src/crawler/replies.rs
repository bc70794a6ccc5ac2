//! Reply collection
//!
//! Looks up the root post, then scans the reply search for records that answer
//! it directly, collecting each replier once in first-seen order.

use crate::config::{CrawlerConfig, TargetConfig};
use crate::crawler::throttle::{
    call_with_cooldown, Pacing, PageSource, PageStep, Paginator, RateGate,
};
use crate::provider::{PageOutcome, PostRef, ReplyQuery, ReplyRecord, ThreadProvider};
use crate::state::ParticipantSet;
use crate::MeshError;
use async_trait::async_trait;

/// Repliers found for one root post
#[derive(Debug, Clone)]
pub struct ReplyCollection {
    /// The root post as reported by the provider
    pub post: PostRef,

    /// Unique repliers in discovery order (open, not yet frozen)
    pub repliers: ParticipantSet,

    /// Reply records examined
    pub scanned: usize,

    /// Reply-search pages received
    pub pages: u32,

    /// False when a provider error cut the scan short
    pub complete: bool,
}

/// Adapts a reply search to the paginator
struct ReplySearch<'a, P: ?Sized> {
    provider: &'a P,
    query: ReplyQuery,
}

#[async_trait]
impl<'a, P: ThreadProvider + ?Sized> PageSource for ReplySearch<'a, P> {
    type Item = ReplyRecord;

    async fn fetch_page(&self, cursor: Option<&str>) -> PageOutcome<ReplyRecord> {
        self.provider.search_replies(&self.query, cursor).await
    }
}

/// Collects the direct repliers of a thread's root post
///
/// # Errors
///
/// Returns `MeshError::RootPost` when the root post cannot be looked up; no
/// thread can be analyzed without it. Errors during the reply scan are not
/// fatal: the repliers gathered so far are returned with `complete == false`.
pub async fn collect_repliers<P: ThreadProvider + ?Sized>(
    provider: &P,
    gate: &RateGate,
    target: &TargetConfig,
    settings: &CrawlerConfig,
) -> Result<ReplyCollection, MeshError> {
    tracing::info!("Looking up post {}", target.post_id);

    let post_id = target.post_id.as_str();
    let post = call_with_cooldown(gate, "post lookup", move || provider.lookup_post(post_id))
        .await
        .map_err(|source| MeshError::RootPost {
            post_id: target.post_id.clone(),
            source,
        })?;

    tracing::info!("Root post {} by {}", post.id, post.author);
    if !post.author.eq_ignore_ascii_case(&target.author) {
        tracing::warn!(
            "Post {} was written by {}, not {}; searching replies to {}",
            post.id,
            post.author,
            target.author,
            target.author
        );
    }

    let query = ReplyQuery {
        author: target.author.clone(),
        since_id: post.id.clone(),
        page_size: settings.replies_page_size,
    };
    let mut paginator = Paginator::new(
        ReplySearch { provider, query },
        gate,
        Pacing::OnThrottle,
        format!("replies to {}", target.author),
    );

    let mut repliers = ParticipantSet::new();
    let mut scanned = 0;
    let mut complete = true;

    'pages: loop {
        match paginator.next_page().await {
            PageStep::Items(records) => {
                for record in records {
                    scanned += 1;
                    match record.reply_target() {
                        None => {}
                        Some(replied_to) if replied_to == post.id => {
                            if repliers.insert(&record.author) {
                                tracing::info!("Replier found: {}", record.author);
                            }
                        }
                        Some(replied_to) => {
                            tracing::debug!("Reply {} answers post {}", record.id, replied_to);
                        }
                    }

                    if scanned >= settings.max_replies {
                        tracing::info!("Scan limit of {} replies reached", settings.max_replies);
                        break 'pages;
                    }
                }
            }
            PageStep::Exhausted => break,
            PageStep::Aborted(detail) => {
                tracing::warn!(
                    "Reply scan stopped early after {} records: {}",
                    scanned,
                    detail
                );
                complete = false;
                break;
            }
        }
    }

    tracing::info!(
        "{} unique repliers among {} scanned records",
        repliers.len(),
        scanned
    );
    for (position, handle) in repliers.handles().iter().enumerate() {
        tracing::debug!("{}. {}", position, handle);
    }

    Ok(ReplyCollection {
        post,
        repliers,
        scanned,
        pages: paginator.pages_fetched(),
        complete,
    })
}
