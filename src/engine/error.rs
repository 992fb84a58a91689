use crate::engine::clock::SessionState;

/// Result alias carrying [`SessionError`].
pub type Result<T> = std::result::Result<T, SessionError>;

/// Coarse error classes a caller can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The file could not be read, or the engine faulted mid-stream.
    Io,
    /// The engine did not recognize the loaded bytes.
    Format,
    /// A seek target lies beyond the known duration.
    Range,
    /// Memory or DSP state could not be allocated.
    Resource,
    /// A caller-supplied value was rejected.
    Argument,
    /// The operation is not legal in the session's current state.
    State,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("read operation interrupted ({read} of {expected} bytes)")]
    ReadInterrupted { expected: u64, read: u64 },

    /// Hard decoder fault, distinct from end of stream.
    #[error("unable to decode: {0}")]
    Decode(String),

    #[error("file is not in a recognized format: {0}")]
    UnrecognizedFormat(String),

    #[error("no decodable audio track found")]
    NoAudioTrack,

    #[error("attempt to seek past end of file ({target_ms} ms > {length_ms} ms)")]
    SeekPastEnd { target_ms: u64, length_ms: u64 },

    #[error("unable to allocate {bytes} bytes")]
    Allocation { bytes: u64 },

    #[error("unable to set up resampler: {0}")]
    Resampler(String),

    #[error("scale must be a finite, non-negative number (got {0})")]
    InvalidScale(f32),

    #[error("position must be a finite, non-negative number of ms (got {0})")]
    InvalidPosition(f64),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot {operation} a session that is {state:?}")]
    InvalidState {
        state: SessionState,
        operation: &'static str,
    },
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::Io(_)
            | SessionError::ReadInterrupted { .. }
            | SessionError::Decode(_) => ErrorKind::Io,
            SessionError::UnrecognizedFormat(_) | SessionError::NoAudioTrack => ErrorKind::Format,
            SessionError::SeekPastEnd { .. } => ErrorKind::Range,
            SessionError::Allocation { .. } | SessionError::Resampler(_) => ErrorKind::Resource,
            SessionError::InvalidScale(_)
            | SessionError::InvalidPosition(_)
            | SessionError::Config(_) => ErrorKind::Argument,
            SessionError::InvalidState { .. } => ErrorKind::State,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let io = SessionError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(io.kind(), ErrorKind::Io);
        assert_eq!(
            SessionError::ReadInterrupted { expected: 10, read: 4 }.kind(),
            ErrorKind::Io
        );
        assert_eq!(
            SessionError::UnrecognizedFormat("junk".into()).kind(),
            ErrorKind::Format
        );
        assert_eq!(
            SessionError::SeekPastEnd { target_ms: 2, length_ms: 1 }.kind(),
            ErrorKind::Range
        );
        assert_eq!(SessionError::Allocation { bytes: 1 }.kind(), ErrorKind::Resource);
        assert_eq!(SessionError::InvalidScale(-1.0).kind(), ErrorKind::Argument);
    }

    #[test]
    fn seek_message_is_stable() {
        let err = SessionError::SeekPastEnd { target_ms: 10001, length_ms: 10000 };
        assert!(err.to_string().starts_with("attempt to seek past end of file"));
    }
}
