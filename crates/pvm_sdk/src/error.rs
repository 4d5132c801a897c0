use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    /// Resuming a continuation that was never saved, or whose id derivation
    /// diverged between save and load. Fatal: aborts the invocation.
    #[error("continuation state missing")]
    ContinuationMissing,
    #[error("encode: {0}")]
    Encode(String),
    #[error("decode: {0}")]
    Decode(String),
    #[error("checkpoint execution mode required")]
    CheckpointModeRequired,
    #[error("checkpoint primitive unavailable")]
    CheckpointUnavailable,
    #[error("rng state: {0}")]
    RngState(&'static str),
    #[error("random: {0}")]
    Random(&'static str),
    #[error("host: {0}")]
    Host(#[from] pvm_host::HostError),
    #[error("serde-json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SdkError>;
