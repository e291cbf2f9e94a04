//! Error types for the resume pipeline.

use std::time::Duration;

/// Configuration-related errors. These are fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Session store unavailable: {0}")]
    Unavailable(String),
}

/// Job queue errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("Queue is full ({capacity} pending tasks)")]
    Full { capacity: usize },

    #[error("Queue is closed")]
    Closed,
}

/// Messenger/transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send message on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to download document {file_ref} on channel {name}: {reason}")]
    DownloadFailed {
        name: String,
        file_ref: String,
        reason: String,
    },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Analysis engine errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned an empty response")]
    EmptyResponse { provider: String },
}

/// Task-level failure taxonomy.
///
/// Every variant ends a task with exactly one user-visible notification,
/// rendered by [`TaskError::user_message`].
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Input rejected before any collaborator was called.
    #[error("Validation failed: {reason}")]
    Validation { reason: String, user_message: String },

    /// A required session value is missing. Never retried.
    #[error("Precondition failed: {reason}")]
    Precondition { reason: String, user_message: String },

    /// Parser, fetcher, engine or transport failure.
    #[error("Collaborator {collaborator} failed: {reason}")]
    Collaborator {
        collaborator: &'static str,
        reason: String,
        user_message: String,
    },

    #[error("Collaborator {collaborator} timed out after {timeout:?}")]
    Timeout {
        collaborator: &'static str,
        timeout: Duration,
        user_message: String,
    },

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// The handler panicked; the worker survives.
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    /// The single message delivered to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { user_message, .. }
            | Self::Precondition { user_message, .. }
            | Self::Collaborator { user_message, .. }
            | Self::Timeout { user_message, .. } => user_message.clone(),
            Self::StoreUnavailable(_) | Self::Panicked(_) => {
                crate::messages::TRY_LATER.to_string()
            }
        }
    }

    /// Short label used in logs and stats.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Precondition { .. } => "precondition",
            Self::Collaborator { .. } | Self::Timeout { .. } => "collaborator",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Panicked(_) => "panicked",
        }
    }
}
