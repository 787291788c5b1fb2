// MIT License - Copyright (c) 2026 Peter Wright

/// All errors that can occur in the lutron-lip-bridge library.
///
/// None of these are fatal to a running session: connection-level failures
/// surface here once and the keepalive cycle drives recovery.
#[derive(Debug, thiserror::Error)]
pub enum LipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bridge closed the connection")]
    Disconnected,

    #[error("Session has not been opened")]
    NotOpen,

    #[error("Invalid integration report: {details}")]
    Report { details: String },
}

pub type Result<T> = std::result::Result<T, LipError>;
