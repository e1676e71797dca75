// src/error.rs

//! Unified error handling for the aggregator.

use std::fmt;

use thiserror::Error;

use crate::models::{ErrorKind, SessionStatus, SourceId};

/// Result type alias for aggregator operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No active source matched the run parameters
    #[error("No active sources found")]
    NoActiveSources,

    /// Session lookup failed
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session was asked to move to a state it cannot reach
    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    /// Retry requested for a session that is not failed or cancelled
    #[error("Can only retry failed or cancelled sessions (session {id} is {status})")]
    NotRetryable { id: String, status: SessionStatus },

    /// Adapter-level failure carrying its classification
    #[error("{message}")]
    Adapter {
        source_id: SourceId,
        kind: ErrorKind,
        message: String,
    },

    /// Persistence failure
    #[error("Store error: {0}")]
    Store(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create an adapter error.
    pub fn adapter(source_id: SourceId, kind: ErrorKind, message: impl fmt::Display) -> Self {
        Self::Adapter {
            source_id,
            kind,
            message: message.to_string(),
        }
    }

    /// Source the error is attributed to, if any.
    pub fn source_id(&self) -> Option<SourceId> {
        match self {
            Self::Adapter { source_id, .. } => Some(*source_id),
            _ => None,
        }
    }

    /// Classify this error into the session error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) => crate::utils::http::classify(e),
            Self::Json(_) | Self::Selector { .. } | Self::Url(_) | Self::Validation(_) => {
                ErrorKind::Parsing
            }
            Self::Adapter { kind, .. } => *kind,
            Self::SessionNotFound(_) => ErrorKind::NotFound,
            Self::Io(_)
            | Self::Toml(_)
            | Self::Config(_)
            | Self::NoActiveSources
            | Self::InvalidTransition { .. }
            | Self::NotRetryable { .. }
            | Self::Store(_) => ErrorKind::Other,
        }
    }
}
