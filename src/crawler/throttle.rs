//! Quota-aware pagination
//!
//! This module handles:
//! - A process-wide `RateGate` shared by every request against one credential
//! - Cooldown-and-retry on the provider's throttling signal
//! - Driving a paginated source page by page with a `Paginator`
//!
//! # Outcome handling
//!
//! | Source outcome | Paginator action |
//! |----------------|------------------|
//! | `Page` | Yield items, remember the cursor, optionally pace |
//! | `Exhausted` | Yield `Exhausted` |
//! | `Throttled` | Close the gate for one cooldown, retry the same cursor |
//! | `Failed` | Yield `Aborted`, no further requests |

use crate::provider::{PageOutcome, ProviderError};
use crate::state::CrawlState;
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Cooldown bookkeeping guarded by the gate's lock
#[derive(Debug, Default)]
struct Schedule {
    /// Set while the gate is closed after a throttle signal
    reopens_at: Option<Instant>,

    /// Earliest start of the next paced request
    next_slot: Option<Instant>,
}

/// Shared quota-tracking state
///
/// Every request waits on [`RateGate::ready`] first. A throttle signal closes
/// the gate for one cooldown interval, which pauses all workers sharing it.
/// Paced requests book their start through [`RateGate::reserve`], so paced
/// requests from all holders of the gate start at least one cooldown apart.
#[derive(Debug)]
pub struct RateGate {
    cooldown: Duration,
    schedule: Mutex<Schedule>,
    throttles: AtomicU64,
    paces: AtomicU64,
}

impl RateGate {
    /// Creates an open gate with the given cooldown interval
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            schedule: Mutex::new(Schedule::default()),
            throttles: AtomicU64::new(0),
            paces: AtomicU64::new(0),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Waits until the gate is open
    pub async fn ready(&self) {
        loop {
            let reopens_at = match self.schedule().reopens_at {
                Some(at) if at > Instant::now() => at,
                _ => return,
            };
            sleep_until(reopens_at).await;
        }
    }

    /// Waits for an open gate and a free pacing slot, then takes the slot
    ///
    /// Returns the instant the slot was taken. The next slot opens one
    /// cooldown later, whichever worker asks for it.
    pub async fn reserve(&self) -> Instant {
        loop {
            let due = {
                let mut schedule = self.schedule();
                let now = Instant::now();
                let due = [schedule.reopens_at, schedule.next_slot]
                    .into_iter()
                    .flatten()
                    .fold(now, |a, b| a.max(b));
                if due <= now {
                    schedule.next_slot = Some(now + self.cooldown);
                    return now;
                }
                due
            };
            sleep_until(due).await;
        }
    }

    /// Closes the gate for one cooldown interval after a throttle signal
    pub fn trip(&self) {
        let reopens = Instant::now() + self.cooldown;
        let mut schedule = self.schedule();
        if schedule.reopens_at.map_or(true, |current| current < reopens) {
            schedule.reopens_at = Some(reopens);
        }
        self.throttles.fetch_add(1, Ordering::Relaxed);
    }

    /// Sleeps until one cooldown after `slot` to honour the sustained-rate contract
    pub async fn pace(&self, slot: Instant) {
        self.paces.fetch_add(1, Ordering::Relaxed);
        sleep_until(slot + self.cooldown).await;
    }

    /// Number of throttle signals received
    pub fn throttle_count(&self) -> u64 {
        self.throttles.load(Ordering::Relaxed)
    }

    /// Number of pacing pauses taken
    pub fn pace_count(&self) -> u64 {
        self.paces.load(Ordering::Relaxed)
    }

    /// Total cooldown pauses: pacing plus throttle recovery
    pub fn cooldown_count(&self) -> u64 {
        self.throttle_count() + self.pace_count()
    }
}

/// When a paginator pauses between pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Only wait when the provider signals throttling
    OnThrottle,

    /// Start each request on a shared pacing slot and wait one cooldown after
    /// every page, plus any throttle cooldown
    EveryPage,
}

/// A paginated data source
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    /// Requests the page at `cursor` (`None` for the first page)
    async fn fetch_page(&self, cursor: Option<&str>) -> PageOutcome<Self::Item>;
}

/// Result of advancing a paginator
#[derive(Debug, PartialEq, Eq)]
pub enum PageStep<T> {
    /// The next page of items
    Items(Vec<T>),

    /// The source has no more data
    Exhausted,

    /// A provider error ended this operation
    Aborted(String),
}

/// Drives a [`PageSource`] through the rate gate
pub struct Paginator<'a, S: PageSource> {
    source: S,
    gate: &'a RateGate,
    pacing: Pacing,
    label: String,
    state: CrawlState,
}

impl<'a, S: PageSource> Paginator<'a, S> {
    pub fn new(source: S, gate: &'a RateGate, pacing: Pacing, label: impl Into<String>) -> Self {
        Self {
            source,
            gate,
            pacing,
            label: label.into(),
            state: CrawlState::new(),
        }
    }

    /// Fetches the next page, waiting out throttle signals
    pub async fn next_page(&mut self) -> PageStep<S::Item> {
        if self.state.finished {
            return PageStep::Exhausted;
        }

        loop {
            let slot = match self.pacing {
                Pacing::EveryPage => Some(self.gate.reserve().await),
                Pacing::OnThrottle => {
                    self.gate.ready().await;
                    None
                }
            };

            match self.source.fetch_page(self.state.cursor.as_deref()).await {
                PageOutcome::Page(page) => {
                    self.state.advance(page.next);
                    tracing::info!(
                        "{}: page {} received ({} items)",
                        self.label,
                        self.state.pages,
                        page.items.len()
                    );

                    if let Some(slot) = slot {
                        tracing::debug!("{}: sleeping {:?}", self.label, self.gate.cooldown());
                        self.gate.pace(slot).await;
                        tracing::debug!("{}: awake after page {}", self.label, self.state.pages);
                    }

                    return PageStep::Items(page.items);
                }
                PageOutcome::Exhausted => {
                    self.state.finish();
                    tracing::debug!("{}: exhausted after {} pages", self.label, self.state.pages);
                    return PageStep::Exhausted;
                }
                PageOutcome::Throttled => {
                    tracing::warn!(
                        "{}: request quota exhausted, retrying in {:?}",
                        self.label,
                        self.gate.cooldown()
                    );
                    self.gate.trip();
                }
                PageOutcome::Failed(detail) => {
                    self.state.finish();
                    tracing::error!("{}: provider error: {}", self.label, detail);
                    return PageStep::Aborted(detail);
                }
            }
        }
    }

    /// Pages received so far
    pub fn pages_fetched(&self) -> u32 {
        self.state.pages
    }

    pub fn is_finished(&self) -> bool {
        self.state.finished
    }
}

/// Runs a single (non-paginated) provider call, retrying after throttle signals
///
/// Any other error is returned to the caller unchanged.
pub async fn call_with_cooldown<T, F, Fut>(
    gate: &RateGate,
    label: &str,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    loop {
        gate.ready().await;
        match call().await {
            Err(e) if e.is_throttled() => {
                tracing::warn!(
                    "{}: request quota exhausted, retrying in {:?}",
                    label,
                    gate.cooldown()
                );
                gate.trip();
            }
            result => return result,
        }
    }
}
