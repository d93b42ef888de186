//! Teamdb Core - Record model, identity registry, and error handling

pub mod error;
pub mod normalize;
pub mod registry;
pub mod result;
pub mod types;

pub use error::{Error, Result};
pub use normalize::ConfigNormalizer;
pub use registry::{Identity, IdentityRegistry};
pub use result::*;
pub use types::*;
