use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Image or save file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The ROM image has no usable internal header.
    #[error("ROM header error: {0}")]
    Header(String),

    /// The byte transport rejected a send. Fatal for the session.
    #[error("transport failed: {0}")]
    Transport(#[source] io::Error),

    /// The platform bus layer failed to report a line level.
    #[error("bus sampling failed: {0}")]
    Sample(#[source] io::Error),

    /// A bus trace could not be encoded or decoded.
    #[error("bus trace error: {0}")]
    Trace(#[from] bincode::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_errors_convert_and_chain() {
        let err: BridgeError = io::Error::new(io::ErrorKind::NotFound, "rom.sfc").into();
        assert!(matches!(err, BridgeError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: rom.sfc");
        assert!(err.source().is_some());

        let err = BridgeError::Transport(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(err.to_string(), "transport failed: gone");
        assert!(err.source().is_some());
        assert!(BridgeError::Config("x".into()).source().is_none());
    }
}
