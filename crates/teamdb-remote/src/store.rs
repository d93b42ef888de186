//! Remote store trait

use serde::{Deserialize, Serialize};
use teamdb_core::{IndexEntry, Record, SubmissionData};

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Remote store error types
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{stage} returned {status}: {body}")]
    Status {
        stage: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response from {stage}: {message}")]
    InvalidResponse { stage: &'static str, message: String },

    #[error("blob decode failed: {0}")]
    Decode(String),

    #[error("no api key configured for {0}")]
    MissingApiKey(&'static str),
}

impl RemoteError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(e) => !e.is_decode() && !e.is_builder(),
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<RemoteError> for teamdb_core::Error {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Decode(message) => Self::decode("remote blob", message),
            RemoteError::InvalidResponse { stage, message } => Self::decode(stage, message),
            RemoteError::Status { stage, .. } => Self::transport_failed(stage, e.to_string()),
            RemoteError::MissingApiKey(stage) => Self::transport_failed(stage, e.to_string()),
            RemoteError::Network(_) => Self::transport_failed("request", e.to_string()),
        }
    }
}

/// Body of an artifact upload (`POST /key`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResultUpload {
    /// Base64 of the gzip archive.
    pub data: String,
    pub author: String,
    pub description: String,
}

/// The remote index and artifact store.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Current index snapshot.
    async fn fetch_index(&self) -> RemoteResult<Vec<IndexEntry>>;

    /// Retrieve and decode the submission behind a share reference.
    async fn fetch_submission(&self, reference: &str) -> RemoteResult<SubmissionData>;

    /// Upload one archived result. `advisory_key` is the identity the client
    /// proposes; the returned id is the one to keep.
    async fn upload_result(&self, upload: &ResultUpload, advisory_key: &str)
        -> RemoteResult<String>;

    /// Replace the index with the given record list.
    async fn upload_index(&self, records: &[Record]) -> RemoteResult<()>;
}
