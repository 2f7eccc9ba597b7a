use thiserror::Error;

/// Main error type for livesocket
#[derive(Error, Debug)]
pub enum SocketError {
    /// Dialing the peer failed (recoverable, retried with backoff)
    #[error("Dial error: {0}")]
    Dial(String),

    /// The established connection failed mid-session
    #[error("Transport error: {0}")]
    Transport(String),

    /// Caller payload could not be serialized
    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// No generation is currently active
    #[error("Not connected")]
    NotConnected,

    /// The client was closed explicitly
    #[error("Connection closed")]
    Closed,

    /// Operation was tagged with a generation that has been superseded
    #[error("Stale connection: generation {requested} superseded by {current}")]
    StaleGeneration { requested: u64, current: u64 },

    /// Reconnection budget exhausted
    #[error("Connection lost after {attempts} attempts")]
    ConnectionLost { attempts: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Timeout error
    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SocketError {
    /// Whether the supervisor should treat this error as a reason to reconnect
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SocketError::Dial(_)
                | SocketError::Transport(_)
                | SocketError::Timeout(_)
                | SocketError::Io(_)
        )
    }

    /// Whether the error is terminal for the logical connection
    pub fn is_terminal(&self) -> bool {
        matches!(self, SocketError::Closed | SocketError::ConnectionLost { .. })
    }
}

/// Result type for livesocket operations
pub type Result<T> = std::result::Result<T, SocketError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(SocketError::Dial("refused".into()).is_recoverable());
        assert!(SocketError::Transport("reset".into()).is_recoverable());
        assert!(!SocketError::Closed.is_recoverable());
        assert!(!SocketError::NotConnected.is_recoverable());
    }

    #[test]
    fn test_terminal_classification() {
        assert!(SocketError::Closed.is_terminal());
        assert!(SocketError::ConnectionLost { attempts: 3 }.is_terminal());
        assert!(!SocketError::StaleGeneration { requested: 1, current: 2 }.is_terminal());
    }

    #[test]
    fn test_encoding_from_serde() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: SocketError = err.into();
        assert!(matches!(err, SocketError::Encoding(_)));
    }
}
