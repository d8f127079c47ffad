//! Error types for cfl-reach
//!
//! Provides unified error handling across the crate.

use crate::config::ConfigError;
use thiserror::Error;

/// Main error type for CFL-reachability operations
#[derive(Debug, Error)]
pub enum CflError {
    /// IO error (unreadable grammar or graph file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed grammar or graph text
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Symbol queried before it was registered with the grammar
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),

    /// Solving exceeded the configured deadline
    #[error("Solver timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u128 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Analysis error
    #[error("Analysis error: {0}")]
    Analysis(String),
}

impl CflError {
    /// Create a parse error for a 1-based line number
    pub fn parse(line: usize, msg: impl Into<String>) -> Self {
        CflError::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        CflError::Analysis(msg.into())
    }

    /// Whether the error came from the deadline check
    pub fn is_timeout(&self) -> bool {
        matches!(self, CflError::Timeout { .. })
    }
}

/// Result type alias for CFL operations
pub type Result<T> = std::result::Result<T, CflError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = CflError::parse(3, "too many fields");
        assert_eq!(err.to_string(), "Parse error at line 3: too many fields");
    }

    #[test]
    fn test_timeout_flag() {
        assert!(CflError::Timeout { elapsed_ms: 10 }.is_timeout());
        assert!(!CflError::UnknownSymbol("x".into()).is_timeout());
    }
}
