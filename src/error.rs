use thiserror::Error;

/// Errors produced while scanning a syslog message or stream frame.
///
/// Every variant means nothing was consumed from the input.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed header")]
    MalformedHeader,
    #[error("malformed timestamp")]
    MalformedTimestamp,
    #[error("unexpected eof")]
    UnexpectedEndOfInput,
    #[error("expected a single space separator")]
    ExpectedSeparator,
    #[error("invalid structured data")]
    InvalidStructuredData,
    #[error("unicode error: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("incomplete frame: declared {declared} bytes, {available} available")]
    IncompleteFrame { declared: usize, available: usize },
    #[error("invalid frame length prefix")]
    InvalidFrameLength,
    #[error("frame length {length} exceeds limit {limit}")]
    FrameTooLarge { length: usize, limit: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
