use std::fmt;

use thiserror::Error;

use super::remapper::NameError;

/// Orchestrator operation, used to label spans, log records and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitBackup,
    TrackBackup,
    EvictBackup,
    SubmitRestore,
    TrackRestore,
    EvictRestore,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitBackup => "submit_backup",
            Self::TrackBackup => "track_backup",
            Self::EvictBackup => "evict_backup",
            Self::SubmitRestore => "submit_restore",
            Self::TrackRestore => "track_restore",
            Self::EvictRestore => "evict_restore",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an outstanding daemon call was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("request cancelled"),
            Self::DeadlineExceeded => f.write_str("request deadline exceeded"),
        }
    }
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Daemon,
    Decode,
    NameGeneration,
}

/// Failure of a single orchestrator call. None of these are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("[{request_id}] {operation}: failed to reach backup daemon: {source}")]
    Transport {
        operation: Operation,
        request_id: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("[{request_id}] {operation}: {reason}")]
    Interrupted {
        operation: Operation,
        request_id: String,
        reason: Interrupt,
    },

    #[error("[{request_id}] {operation}: backup daemon responded with status {status}: {body}")]
    Daemon {
        operation: Operation,
        request_id: String,
        status: u16,
        body: String,
    },

    #[error(
        "[{request_id}] {operation}: failed to decode daemon response (blake3 {body_hash}, body {excerpt:?}): {source}"
    )]
    Decode {
        operation: Operation,
        request_id: String,
        body_hash: String,
        excerpt: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("[{request_id}] {operation}: cannot generate new name for database '{database}': {source}")]
    NameGeneration {
        operation: Operation,
        request_id: String,
        database: String,
        #[source]
        source: NameError,
    },
}

/// Longest prefix of a daemon body kept in decode diagnostics.
const EXCERPT_LEN: usize = 256;

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::Interrupted { .. } => ErrorKind::Transport,
            Self::Daemon { .. } => ErrorKind::Daemon,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::NameGeneration { .. } => ErrorKind::NameGeneration,
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Transport { operation, .. }
            | Self::Interrupted { operation, .. }
            | Self::Daemon { operation, .. }
            | Self::Decode { operation, .. }
            | Self::NameGeneration { operation, .. } => *operation,
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            Self::Transport { request_id, .. }
            | Self::Interrupted { request_id, .. }
            | Self::Daemon { request_id, .. }
            | Self::Decode { request_id, .. }
            | Self::NameGeneration { request_id, .. } => request_id,
        }
    }

    pub(crate) fn decode(
        operation: Operation,
        request_id: &str,
        body: &[u8],
        source: serde_json::Error,
    ) -> Self {
        let text = String::from_utf8_lossy(body);
        let excerpt = match text.char_indices().nth(EXCERPT_LEN) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.into_owned(),
        };

        Self::Decode {
            operation,
            request_id: request_id.to_string(),
            body_hash: blake3::hash(body).to_hex().to_string(),
            excerpt,
            source,
        }
    }
}
