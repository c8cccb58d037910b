//! Error types shared by the session, queue and tournament clients

use thiserror::Error;

/// WebSocket channel failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel is not open")]
    NotOpen,
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("send failed: {0}")]
    Send(String),
}

/// HTTP endpoint failure (not an application rejection)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Errors surfaced by the coordinator operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Server answered with a non-success flag
    #[error("rejected by server: {0}")]
    Rejected(String),
    #[error("failed to load view: {0}")]
    View(String),
    #[error("a game is already in progress")]
    GameActive,
    #[error("no active game session")]
    NoSession,
    /// Action not valid for the current game mode or phase
    #[error("{0} not allowed now")]
    NotAllowed(&'static str),
}
