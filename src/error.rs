//! Error type shared by the protocol, session and snapshot layers.

use thiserror::Error;

use crate::session::SessionMode;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("document does not contain a stored snapshot")]
    MissingSnapshot,
    #[error("malformed text export: {0}")]
    MalformedTextExport(String),
    #[error("cannot move session from {from:?} to {to:?}")]
    InvalidTransition { from: SessionMode, to: SessionMode },
    #[error("acquisition is disabled for this session")]
    AcquisitionDisabled,
    #[error("unknown configuration property {0:?}")]
    UnknownProperty(String),
    #[error("channel {channel} out of range (histogram has {channels} channels)")]
    ChannelOutOfRange { channel: u64, channels: usize },
    #[error("histogram length mismatch: expected {expected}, got {actual}")]
    HistogramLength { expected: usize, actual: usize },
    #[error("bin size must be positive, got {0}")]
    InvalidBinSize(usize),
    #[error("instrument link is closed")]
    LinkClosed,
}

pub type Result<T> = std::result::Result<T, SpectrumError>;
