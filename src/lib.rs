//! Reply-Mesh: a follow-graph mapper for conversation threads
//!
//! This crate discovers who follows whom among the participants of a social-media
//! thread: it collects everyone who replied to a root post, retrieves each
//! participant's follow list under the provider's rate limits, and emits the
//! directed edges between participants.

pub mod config;
pub mod crawler;
pub mod output;
pub mod provider;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Reply-Mesh operations
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Root post {post_id} could not be loaded: {source}")]
    RootPost {
        post_id: String,
        source: provider::ProviderError,
    },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("Worker task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),
}

/// Result type alias for Reply-Mesh operations
pub type Result<T> = std::result::Result<T, MeshError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Edge, EdgeList};
pub use state::CrawlPhase;
