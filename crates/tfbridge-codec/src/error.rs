use thiserror::Error;

use tfbridge_types::EngineError;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("msgpack encode error: {0}")]
    MsgpackEncode(String),

    #[error("msgpack decode error: {0}")]
    MsgpackDecode(String),

    #[error("invalid schema at {path}: {reason}")]
    InvalidSchema { path: String, reason: String },
}

impl CodecError {
    pub(crate) fn encode(e: impl std::fmt::Display) -> Self {
        Self::MsgpackEncode(e.to_string())
    }

    pub(crate) fn decode(e: impl std::fmt::Display) -> Self {
        Self::MsgpackDecode(e.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
