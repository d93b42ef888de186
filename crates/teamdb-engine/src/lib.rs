//! Teamdb Engine — computation engine boundary, result projection, archival
//!
//! The engine is an external executable driven through [`ComputationEngine`].
//! [`ComputationAdapter`] turns a stale record into a fresh one; the archive
//! module stores the raw output next to the record.

pub mod adapter;
pub mod archive;
pub mod engine;
pub mod scratch;

pub use adapter::{Computation, ComputationAdapter};
pub use engine::{ComputationEngine, EngineError, EngineResult, SubprocessEngine};
pub use scratch::ScratchDir;
