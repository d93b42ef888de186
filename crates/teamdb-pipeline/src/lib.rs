//! teamdb-pipeline — keeps the team catalog consistent with the engine and the remote index.
//!
//! Catalog load → submission merge → freshness gate → recompute → archive →
//! publish. Each stage is a module; [`Pipeline`] strings them together.

pub mod catalog;
pub mod config;
pub mod freshness;
pub mod merger;
pub mod pipeline;
pub mod publisher;
pub mod report;

pub use catalog::{CatalogLoad, LoadFailure};
pub use config::TeamdbConfig;
pub use freshness::needs_recompute;
pub use merger::{merge_author, MergeOutcome, Submission, SubmissionMerger};
pub use pipeline::{Pipeline, RunOptions};
pub use publisher::{PublishReport, Publisher};
pub use report::{Outcome, RecordStatus, RunReport};
