use std::error::Error;
use std::fmt;

use crate::timeline::TimelineId;

/// Error type for timeline, settings and persisted-state operations.
///
/// Nothing in the render path returns these: a renderer that cannot make
/// sense of its input writes silence instead.
#[derive(Debug)]
pub enum SyncError {
    /// Fewer than two tempo events or no time signature event
    InsufficientTimeline {
        tempo_events: usize,
        signature_events: usize,
    },
    /// Tempo events `index` and `index + 1` do not describe a positive tempo
    InvalidTempo { index: usize },
    /// The timeline source has nothing for this id
    UnknownTimeline(TimelineId),
    /// Persisted control state shorter than the fixed blob size
    MalformedState { len: usize },
    /// Settings or timeline file could not be read or deserialized
    Config(config::ConfigError),
    Io(std::io::Error),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::InsufficientTimeline {
                tempo_events,
                signature_events,
            } => write!(
                f,
                "insufficient timeline data: {} tempo events, {} time signature events",
                tempo_events, signature_events
            ),
            SyncError::InvalidTempo { index } => {
                write!(f, "tempo events {} and {} do not advance", index, index + 1)
            }
            SyncError::UnknownTimeline(id) => write!(f, "unknown timeline {}", id),
            SyncError::MalformedState { len } => {
                write!(f, "persisted state too short: {} bytes", len)
            }
            SyncError::Config(e) => write!(f, "configuration error: {}", e),
            SyncError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SyncError::Config(e) => Some(e),
            SyncError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(e: config::ConfigError) -> Self {
        SyncError::Config(e)
    }
}

impl From<std::io::Error> for SyncError {
    fn from(e: std::io::Error) -> Self {
        SyncError::Io(e)
    }
}

/// Result type for pulsesync operations
pub type Result<T> = std::result::Result<T, SyncError>;
