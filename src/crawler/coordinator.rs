//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one run through its phases:
//! - Collecting the repliers of the root post
//! - Retrieving the root author's follow list, then every replier's
//! - Correlating each follow-set against the participant set
//! - Writing the edge list and archiving the run

use crate::config::Config;
use crate::crawler::correlator::{correlate, Edge, EdgeList};
use crate::crawler::follows::{retrieve_follows, FollowOutcome};
use crate::crawler::replies::collect_repliers;
use crate::crawler::throttle::RateGate;
use crate::output::{write_edges_csv, Artifacts};
use crate::provider::{AccountProvider, ThreadProvider, TwitterClient};
use crate::state::{CrawlPhase, ParticipantSet, ParticipantState};
use crate::storage::{open_storage, ParticipantRecord, SqliteStorage, Storage, StorageResult};
use crate::MeshError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Summary of a finished run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Archive id of the run; `None` when the run could not be archived
    pub run_id: Option<i64>,
    pub post_id: String,
    pub author: String,

    /// Root author first, then repliers in discovery order
    pub participants: Vec<String>,

    pub edges: Vec<Edge>,

    /// Participants whose account could not be resolved
    pub failed: Vec<String>,

    /// Participants whose follow list was cut short by a provider error
    pub incomplete: Vec<String>,

    /// False when the reply scan stopped on a provider error
    pub replies_complete: bool,

    pub reply_pages: u32,
    pub follow_pages: u32,
    pub throttles: u64,
    pub cooldowns: u64,
    pub elapsed: Duration,
    pub edges_path: PathBuf,

    /// First archive write that failed, if any; the edge list is still written
    pub archive_error: Option<String>,
}

/// Per-run bookkeeping filled in as follow outcomes arrive
#[derive(Debug, Default)]
struct Tally {
    edges: EdgeList,
    failed: Vec<String>,
    incomplete: Vec<String>,
    follow_pages: u32,
}

/// Main crawler coordinator structure
pub struct Coordinator<T, A> {
    config: Arc<Config>,
    threads: Arc<T>,
    accounts: Arc<A>,
    gate: Arc<RateGate>,
    artifacts: Arc<Artifacts>,
    storage: SqliteStorage,
    config_hash: String,
    phase: CrawlPhase,
    run_id: Option<i64>,
    archive_error: Option<String>,
}

impl<T, A> Coordinator<T, A>
where
    T: ThreadProvider + 'static,
    A: AccountProvider + 'static,
{
    /// Creates a coordinator for one run
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `threads` - Root post lookup and reply search
    /// * `accounts` - Account resolution and follow lists
    /// * `storage` - Run archive
    /// * `config_hash` - Hash recorded with the run
    pub fn new(
        config: Config,
        threads: Arc<T>,
        accounts: Arc<A>,
        storage: SqliteStorage,
        config_hash: impl Into<String>,
    ) -> Self {
        let gate = Arc::new(RateGate::new(config.crawler.cooldown()));
        let artifacts = Arc::new(Artifacts::from_config(&config.output));

        Self {
            config: Arc::new(config),
            threads,
            accounts,
            gate,
            artifacts,
            storage,
            config_hash: config_hash.into(),
            phase: CrawlPhase::CollectReplies,
            run_id: None,
            archive_error: None,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Runs the crawl to completion
    ///
    /// Only a failed root post lookup ends the run with an error; in that case
    /// no edge list is written. Unresolvable accounts and provider errors while
    /// paging are recorded in the report and the crawl continues. Archive
    /// failures are logged and mark the archived run failed, but never cost
    /// the edge list.
    pub async fn run(&mut self) -> Result<CrawlReport, MeshError> {
        if self.phase != CrawlPhase::CollectReplies {
            return Err(MeshError::InvalidTransition {
                from: self.phase,
                to: CrawlPhase::CollectReplies,
            });
        }

        let start_time = Instant::now();
        let config = Arc::clone(&self.config);
        let target = &config.target;

        tracing::info!("Starting crawl of post {} by {}", target.post_id, target.author);
        match self
            .storage
            .create_run(&target.post_id, &target.author, &self.config_hash)
        {
            Ok(run_id) => {
                tracing::info!("Archiving as run {}", run_id);
                self.run_id = Some(run_id);
            }
            Err(e) => {
                tracing::error!("Could not archive run, continuing without archive: {}", e);
                self.archive_error = Some(format!("run start: {}", e));
            }
        }

        let collection =
            match collect_repliers(&*self.threads, &self.gate, target, &config.crawler).await {
                Ok(collection) => collection,
                Err(e) => {
                    self.transition(CrawlPhase::Failed)?;
                    tracing::error!("Crawl of post {} failed: {}", target.post_id, e);
                    self.close_run(Some(&e.to_string()));
                    return Err(e);
                }
            };

        let participants = ParticipantSet::from_thread(&target.author, collection.repliers.handles());
        tracing::info!("{} participants", participants.len());
        let pending: Vec<ParticipantRecord> = participants
            .handles()
            .iter()
            .enumerate()
            .map(|(position, handle)| ParticipantRecord {
                handle: handle.clone(),
                position: position as u32,
                state: ParticipantState::Pending,
                follows_count: 0,
                error_message: None,
            })
            .collect();
        self.archive("participants", |storage, run_id| {
            pending
                .iter()
                .try_for_each(|record| storage.record_participant(run_id, record))
        });

        let mut tally = Tally::default();

        self.transition(CrawlPhase::ResolveRootAuthorFollows)?;
        let outcome = retrieve_follows(
            &*self.accounts,
            &self.gate,
            &target.author,
            config.crawler.follows_page_size,
            &self.artifacts,
        )
        .await;
        self.absorb(0, outcome, &participants, &mut tally);

        self.transition(CrawlPhase::ResolveParticipantFollows)?;
        if config.crawler.max_workers > 1 && participants.repliers().len() > 1 {
            self.retrieve_pooled(&participants, &mut tally).await?;
        } else {
            self.retrieve_sequential(&participants, &mut tally).await;
        }

        self.transition(CrawlPhase::Serialize)?;
        let edges_path = PathBuf::from(&config.output.edges_path);
        let edges = tally.edges.into_vec();
        if let Err(e) = write_edges_csv(&edges, &edges_path) {
            self.close_run(Some(&format!("writing {}: {}", edges_path.display(), e)));
            return Err(e.into());
        }
        tracing::info!("Wrote {} edges to {}", edges.len(), edges_path.display());

        if let Some(inserted) = self.archive("edges", |storage, run_id| {
            storage.insert_edges(run_id, &edges)
        }) {
            tracing::debug!("Archived {} edges", inserted);
        }
        self.close_run(None);
        self.transition(CrawlPhase::Done)?;

        let report = CrawlReport {
            run_id: self.run_id,
            post_id: collection.post.id,
            author: target.author.clone(),
            participants: participants.handles().to_vec(),
            edges,
            failed: tally.failed,
            incomplete: tally.incomplete,
            replies_complete: collection.complete,
            reply_pages: collection.pages,
            follow_pages: tally.follow_pages,
            throttles: self.gate.throttle_count(),
            cooldowns: self.gate.cooldown_count(),
            elapsed: start_time.elapsed(),
            edges_path,
            archive_error: self.archive_error.clone(),
        };

        tracing::info!(
            "Crawl completed: {} participants, {} edges, {} unresolved, {} incomplete in {:?}",
            report.participants.len(),
            report.edges.len(),
            report.failed.len(),
            report.incomplete.len(),
            report.elapsed
        );

        Ok(report)
    }

    fn transition(&mut self, next: CrawlPhase) -> Result<(), MeshError> {
        if !self.phase.can_transition_to(next) {
            return Err(MeshError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!("Phase {} -> {}", self.phase, next);
        if next.is_terminal() {
            tracing::info!("Crawl reached terminal phase {}", next);
        }
        self.phase = next;
        Ok(())
    }

    async fn retrieve_sequential(&mut self, participants: &ParticipantSet, tally: &mut Tally) {
        for (offset, handle) in participants.repliers().iter().enumerate() {
            let outcome = retrieve_follows(
                &*self.accounts,
                &self.gate,
                handle,
                self.config.crawler.follows_page_size,
                &self.artifacts,
            )
            .await;
            self.absorb(offset as u32 + 1, outcome, participants, tally);
        }
    }

    /// Retrieves replier follow lists on a bounded task pool
    ///
    /// Workers share the rate gate and send their outcomes back over a channel;
    /// only the coordinator touches the edge list and the archive.
    async fn retrieve_pooled(
        &mut self,
        participants: &ParticipantSet,
        tally: &mut Tally,
    ) -> Result<(), MeshError> {
        let repliers = participants.repliers();
        let workers = self.config.crawler.max_workers;
        tracing::info!(
            "Retrieving {} follow lists with {} workers",
            repliers.len(),
            workers
        );

        let semaphore = Arc::new(Semaphore::new(workers));
        // One slot per replier so a finished worker never waits on the channel
        let (tx, mut rx) = mpsc::channel::<(u32, FollowOutcome)>(repliers.len());
        let mut tasks = JoinSet::new();

        for (offset, handle) in repliers.iter().enumerate() {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            let accounts = Arc::clone(&self.accounts);
            let gate = Arc::clone(&self.gate);
            let artifacts = Arc::clone(&self.artifacts);
            let page_size = self.config.crawler.follows_page_size;
            let handle = handle.clone();
            let tx = tx.clone();

            tasks.spawn(async move {
                let outcome =
                    retrieve_follows(&*accounts, &gate, &handle, page_size, &artifacts).await;
                drop(permit);
                if tx.send((offset as u32 + 1, outcome)).await.is_err() {
                    tracing::debug!("Coordinator stopped listening before {} finished", handle);
                }
            });
        }
        drop(tx);

        while let Some((position, outcome)) = rx.recv().await {
            self.absorb(position, outcome, participants, tally);
        }
        while let Some(joined) = tasks.join_next().await {
            joined?;
        }
        Ok(())
    }

    /// Correlates one outcome and records it in the archive
    fn absorb(
        &mut self,
        position: u32,
        outcome: FollowOutcome,
        participants: &ParticipantSet,
        tally: &mut Tally,
    ) {
        let record = match outcome {
            FollowOutcome::Retrieved(set) => {
                let added = correlate(&set, participants, &mut tally.edges);
                tracing::info!("{}: {} edges", set.owner, added);
                tally.follow_pages += set.pages;

                let state = if set.complete {
                    ParticipantState::Retrieved
                } else {
                    tally.incomplete.push(set.owner.clone());
                    ParticipantState::Partial
                };
                ParticipantRecord {
                    follows_count: set.len() as u64,
                    handle: set.owner,
                    position,
                    state,
                    error_message: None,
                }
            }
            FollowOutcome::Unresolved { handle, reason } => {
                tally.failed.push(handle.clone());
                ParticipantRecord {
                    handle,
                    position,
                    state: ParticipantState::Unresolved,
                    follows_count: 0,
                    error_message: Some(reason),
                }
            }
        };

        self.archive("participant", |storage, run_id| {
            storage.record_participant(run_id, &record)
        });
    }

    /// Applies one archive write
    ///
    /// A failure is logged and kept for the report instead of ending the run.
    /// Once a write has failed, later writes of the run are skipped.
    fn archive<R, F>(&mut self, what: &str, write: F) -> Option<R>
    where
        F: FnOnce(&mut SqliteStorage, i64) -> StorageResult<R>,
    {
        let run_id = self.run_id?;
        if self.archive_error.is_some() {
            return None;
        }
        match write(&mut self.storage, run_id) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Run {}: could not archive {}: {}", run_id, what, e);
                self.archive_error = Some(format!("{}: {}", what, e));
                None
            }
        }
    }

    /// Marks the archived run completed, or failed when `failure` is given or
    /// an earlier archive write was lost
    fn close_run(&mut self, failure: Option<&str>) {
        let Some(run_id) = self.run_id else {
            return;
        };
        let reason = match (failure, &self.archive_error) {
            (Some(failure), _) => Some(failure.to_string()),
            (None, Some(lost)) => Some(format!("Archive incomplete: {}", lost)),
            (None, None) => None,
        };

        let closed = match &reason {
            Some(reason) => self.storage.fail_run(run_id, reason),
            None => self.storage.complete_run(run_id),
        };
        if let Err(e) = closed {
            tracing::error!("Could not close run {}: {}", run_id, e);
            self.archive_error.get_or_insert_with(|| format!("run status: {}", e));
        }
    }
}

/// Runs a complete crawl against the REST API
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, recorded with the run
///
/// # Example
///
/// ```no_run
/// use reply_mesh::config::load_config_with_hash;
/// use reply_mesh::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("config.toml"))?;
/// let report = run_crawl(config, hash).await?;
/// println!("{} edges", report.edges.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, config_hash: String) -> Result<CrawlReport, MeshError> {
    let client = Arc::new(TwitterClient::new(&config.api)?);
    let storage = open_storage(Path::new(&config.output.database_path))?;

    let mut coordinator = Coordinator::new(
        config,
        Arc::clone(&client),
        client,
        storage,
        config_hash,
    );
    coordinator.run().await
}
