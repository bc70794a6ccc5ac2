use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Reply-Mesh
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The thread whose participants are mapped
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Identifier of the root post (the number at the end of the post URL)
    #[serde(rename = "post-id")]
    pub post_id: String,

    /// Handle of the root post's author
    pub author: String,
}

/// Provider endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the REST API
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding an already-issued bearer token
    #[serde(rename = "bearer-token-env", default = "default_bearer_token_env")]
    pub bearer_token_env: String,

    /// Timeout for a single HTTP request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Crawl pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Pause observed after every follow-list page and after a throttle signal (milliseconds)
    #[serde(rename = "cooldown-ms", default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Maximum number of reply records scanned for one thread
    #[serde(rename = "max-replies", default = "default_max_replies")]
    pub max_replies: usize,

    /// Number of participants whose follow lists are retrieved concurrently
    #[serde(rename = "max-workers", default = "default_max_workers")]
    pub max_workers: usize,

    /// Records requested per reply-search page
    #[serde(rename = "replies-page-size", default = "default_replies_page_size")]
    pub replies_page_size: u32,

    /// Accounts requested per follow-list page
    #[serde(rename = "follows-page-size", default = "default_follows_page_size")]
    pub follows_page_size: u32,
}

impl CrawlerConfig {
    /// The cooldown interval as a duration
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV edge list
    #[serde(rename = "edges-path", default = "default_edges_path")]
    pub edges_path: String,

    /// Path of the append-only account failure log
    #[serde(rename = "error-log-path", default = "default_error_log_path")]
    pub error_log_path: String,

    /// Directory receiving one `<handle>.txt` follow dump per participant
    #[serde(rename = "dump-dir", default = "default_dump_dir")]
    pub dump_dir: String,

    /// Whether per-participant follow dumps are written
    #[serde(rename = "write-follow-dumps", default = "default_write_follow_dumps")]
    pub write_follow_dumps: bool,

    /// Path to the SQLite run archive
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

fn default_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_bearer_token_env() -> String {
    "REPLY_MESH_BEARER_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_cooldown_ms() -> u64 {
    60_000
}

fn default_max_replies() -> usize {
    1000
}

fn default_max_workers() -> usize {
    1
}

fn default_replies_page_size() -> u32 {
    100
}

fn default_follows_page_size() -> u32 {
    200
}

fn default_edges_path() -> String {
    "allRelationships.csv".to_string()
}

fn default_error_log_path() -> String {
    "errorFile.txt".to_string()
}

fn default_dump_dir() -> String {
    "follows".to_string()
}

fn default_write_follow_dumps() -> bool {
    true
}

fn default_database_path() -> String {
    "reply_mesh.db".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            bearer_token_env: default_bearer_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            max_replies: default_max_replies(),
            max_workers: default_max_workers(),
            replies_page_size: default_replies_page_size(),
            follows_page_size: default_follows_page_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            edges_path: default_edges_path(),
            error_log_path: default_error_log_path(),
            dump_dir: default_dump_dir(),
            write_follow_dumps: default_write_follow_dumps(),
            database_path: default_database_path(),
        }
    }
}
