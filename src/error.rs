//! Error types for the brent-changepoint library.

use thiserror::Error;

/// Result type alias for change-point operations.
pub type Result<T> = std::result::Result<T, ChangePointError>;

/// Errors that can occur while preparing data, sampling or summarizing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChangePointError {
    /// Insufficient data points for the operation.
    #[error("insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Series dates are not strictly increasing or values are not finite.
    #[error("malformed series: {0}")]
    MalformedSeries(String),

    /// Invalid sampler, prior or summary configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dimension mismatch between data structures.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// A summarized index does not fit the series it is applied to.
    #[error("estimate out of range: index {index} (size: {size})")]
    OutOfRangeEstimate { index: usize, size: usize },

    /// An inference result is being applied to a different series.
    #[error("series mismatch: result was inferred from {expected}, got {got}")]
    SeriesMismatch { expected: String, got: String },

    /// Sampling was cancelled before every chain completed.
    #[error("sampling cancelled")]
    Cancelled,

    /// File system error.
    #[error("io error: {0}")]
    Io(String),

    /// A row of an input file could not be parsed.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Stored draws violate the model's support.
    #[error("corrupt trace: {0}")]
    CorruptTrace(String),

    /// JSON or TOML (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ChangePointError {
    fn from(err: std::io::Error) -> Self {
        ChangePointError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ChangePointError {
    fn from(err: serde_json::Error) -> Self {
        ChangePointError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ChangePointError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            return ChangePointError::Io(err.to_string());
        }
        match err.position() {
            Some(pos) => ChangePointError::Parse {
                line: pos.line() as usize,
                message: err.to_string(),
            },
            None => ChangePointError::Serialization(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for ChangePointError {
    fn from(err: toml::de::Error) -> Self {
        ChangePointError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = ChangePointError::InsufficientData { needed: 2, got: 1 };
        assert_eq!(err.to_string(), "insufficient data: need at least 2, got 1");

        let err = ChangePointError::InvalidConfig("num_samples must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "invalid configuration: num_samples must be positive"
        );

        let err = ChangePointError::OutOfRangeEstimate { index: 12, size: 10 };
        assert_eq!(err.to_string(), "estimate out of range: index 12 (size: 10)");

        let err = ChangePointError::Parse {
            line: 3,
            message: "bad date".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at line 3: bad date");

        let err = ChangePointError::CorruptTrace("sigma -1 is not positive".to_string());
        assert_eq!(err.to_string(), "corrupt trace: sigma -1 is not positive");

        assert_eq!(ChangePointError::Cancelled.to_string(), "sampling cancelled");
    }

    #[test]
    fn errors_are_clonable_and_comparable() {
        let err1 = ChangePointError::MalformedSeries("dates out of order".to_string());
        let err2 = err1.clone();
        assert_eq!(err1, err2);
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.csv");
        let err: ChangePointError = io.into();
        assert!(matches!(err, ChangePointError::Io(ref msg) if msg.contains("missing.csv")));
    }
}
