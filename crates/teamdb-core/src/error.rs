//! Error types for teamdb

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("decode error: {context} - {message}")]
    Decode { context: String, message: String },

    #[error("computation failed for {record}: {cause}")]
    ComputationFailed { record: String, cause: String },

    #[error("transport failed during {stage}: {message}")]
    TransportFailed { stage: String, message: String },

    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn decode(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn computation_failed(record: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::ComputationFailed {
            record: record.into(),
            cause: cause.into(),
        }
    }

    pub fn transport_failed(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportFailed {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly category, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode { .. } | Self::Json(_) | Self::Yaml(_) => "decode",
            Self::ComputationFailed { .. } => "computation",
            Self::TransportFailed { .. } => "transport",
            Self::UnknownEntity(_) => "unknown_entity",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
        }
    }
}
