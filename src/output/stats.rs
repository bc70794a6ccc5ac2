//! Statistics from the run archive
//!
//! This module provides functionality for extracting and displaying
//! statistics of the most recent archived run.

use crate::state::ParticipantState;
use crate::storage::{RunRecord, Storage};
use crate::MeshError;
use std::collections::HashMap;

/// Run statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run: RunRecord,

    /// Count of participants by retrieval outcome
    pub participants_by_state: HashMap<ParticipantState, u64>,

    /// Total number of edges produced
    pub total_edges: u64,

    /// Handles whose account could not be resolved, with the reason
    pub unresolved: Vec<(String, Option<String>)>,
}

impl RunStatistics {
    pub fn total_participants(&self) -> u64 {
        self.participants_by_state.values().sum()
    }
}

/// Loads statistics of the latest run, `None` when the archive is empty
pub fn load_statistics(storage: &dyn Storage) -> Result<Option<RunStatistics>, MeshError> {
    let Some(run) = storage.get_latest_run()? else {
        return Ok(None);
    };

    let mut participants_by_state = HashMap::new();
    for state in ParticipantState::all_states() {
        let count = storage.count_participants_by_state(run.id, state)?;
        if count > 0 {
            participants_by_state.insert(state, count);
        }
    }

    let total_edges = storage.count_edges(run.id)?;

    let unresolved = storage
        .get_participants(run.id)?
        .into_iter()
        .filter(|p| p.state == ParticipantState::Unresolved)
        .map(|p| (p.handle, p.error_message))
        .collect();

    Ok(Some(RunStatistics {
        run,
        participants_by_state,
        total_edges,
        unresolved,
    }))
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Run {} ===\n", stats.run.id);

    println!("Target:");
    println!("  Post: {} by {}", stats.run.post_id, stats.run.author);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    if let Some(error) = &stats.run.error_message {
        println!("  Error: {}", error);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    let total = stats.total_participants();
    println!("Participants ({}):", total);
    for state in ParticipantState::all_states() {
        let count = stats.participants_by_state.get(&state).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let percentage = (count as f64 / total as f64) * 100.0;
        println!("  {}: {} ({:.1}%)", state, count, percentage);
    }
    println!();

    println!("Edges: {}", stats.total_edges);

    if !stats.unresolved.is_empty() {
        println!();
        println!("Unresolved Accounts ({}):", stats.unresolved.len());
        for (handle, reason) in &stats.unresolved {
            match reason {
                Some(reason) => println!("  - {}: {}", handle, reason),
                None => println!("  - {}", handle),
            }
        }
    }
}
