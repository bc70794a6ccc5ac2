//! Crawler module for the reply-and-follow crawl
//!
//! This module contains the core crawling logic, including:
//! - Quota-aware pagination shared by every provider call
//! - Reply collection for the root post
//! - Follow-set retrieval per participant
//! - Correlation of follow-sets into edges
//! - Overall crawl coordination

mod coordinator;
mod correlator;
mod follows;
mod replies;
pub mod throttle;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use correlator::{correlate, Edge, EdgeList};
pub use follows::{retrieve_follows, FollowOutcome, FollowSet};
pub use replies::{collect_repliers, ReplyCollection};
pub use throttle::{Pacing, RateGate};
