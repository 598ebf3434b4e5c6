//! Turn-layer errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnErrorKind {
    InvalidRequest,
    Context,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnError {
    pub kind: TurnErrorKind,
    pub message: String,
}

impl TurnError {
    pub fn new(kind: TurnErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::InvalidRequest, message)
    }

    pub fn context(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Context, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(TurnErrorKind::Internal, message)
    }
}

impl Display for TurnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for TurnError {}

impl From<tokio::task::JoinError> for TurnError {
    fn from(value: tokio::task::JoinError) -> Self {
        TurnError::internal(format!("turn task did not finish: {value}"))
    }
}
