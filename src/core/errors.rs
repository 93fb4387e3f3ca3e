//! Error types for the qualgate-rs library.
//!
//! Errors fall into four categories that callers are expected to treat
//! differently: configuration errors abort the current evaluation or request,
//! data errors abort the current indexing batch (which can be retried),
//! resource errors come straight from the store or index collaborators, and
//! internal errors signal a broken invariant.

use std::io;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Main result type for qualgate operations.
pub type Result<T> = std::result::Result<T, QualgateError>;

/// Coarse classification of a [`QualgateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad gate or metric configuration. Never retried automatically.
    Configuration,
    /// A malformed source row. The whole batch may be retried.
    Data,
    /// Store, index or filesystem failure reported by a collaborator.
    Resource,
    /// Broken invariant inside the crate.
    Internal,
}

/// Error type for all qualgate operations.
#[derive(Error, Debug)]
pub enum QualgateError {
    /// Quality gate or metric configuration that cannot be evaluated
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error description
        message: String,
        /// Metric key involved, when known
        metric: Option<String>,
    },

    /// Malformed primary-store row met while building index documents
    #[error("Data error in row '{row_key}': {message}")]
    Data {
        /// Stable key of the offending row
        row_key: String,
        /// Error description
        message: String,
        /// Line inside the row payload (source-line rows only)
        line: Option<usize>,
    },

    /// Primary store failures
    #[error("Store error: {message}")]
    Store {
        /// Error description
        message: String,
        /// Store operation that failed
        operation: Option<String>,
        /// Underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Search index failures
    #[error("Index error on '{index}': {message}")]
    Index {
        /// Name of the index
        index: String,
        /// Error description
        message: String,
    },

    /// I/O related errors
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for configuration input
    #[error("Validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field that failed validation
        field: Option<String>,
    },

    /// A write operation whose follow-up indexing failed
    #[error("{operation} failed: {source}")]
    Write {
        /// Write operation that was not fully applied
        operation: String,
        /// Failure reported by the indexing step
        #[source]
        source: Box<QualgateError>,
    },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

impl QualgateError {
    /// Create a new configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            metric: None,
        }
    }

    /// Create a new configuration error naming the metric involved
    pub fn configuration_for_metric(message: impl Into<String>, metric: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            metric: Some(metric.into()),
        }
    }

    /// Create a new data error for a source row
    pub fn data(row_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Data {
            row_key: row_key.into(),
            message: message.into(),
            line: None,
        }
    }

    /// Create a new data error pointing at one line of a source row
    pub fn data_at_line(row_key: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Data {
            row_key: row_key.into(),
            message: message.into(),
            line: Some(line),
        }
    }

    /// Create a new store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
            operation: None,
            source: None,
        }
    }

    /// Create a new store error for a named operation
    pub fn store_operation(
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        let operation = operation.into();
        Self::Store {
            message: format!("{operation} failed: {source}"),
            operation: Some(operation),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new index error
    pub fn index(index: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Index {
            index: index.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new validation error with field context
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Wrap the failure of a write operation's indexing step
    pub fn write_failed(operation: impl Into<String>, source: QualgateError) -> Self {
        Self::Write {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Classify this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } | Self::Validation { .. } => ErrorCategory::Configuration,
            Self::Data { .. } => ErrorCategory::Data,
            Self::Store { .. } | Self::Index { .. } | Self::Io { .. } => ErrorCategory::Resource,
            Self::Serialization { .. } | Self::Internal { .. } => ErrorCategory::Internal,
            Self::Write { source, .. } => source.category(),
        }
    }

    /// Whether this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        match &mut self {
            Self::Internal { context: ctx, .. } => {
                *ctx = Some(context.into());
            }
            Self::Store { operation, .. } if operation.is_none() => {
                *operation = Some(context.into());
            }
            _ => {}
        }
        self
    }
}

impl From<io::Error> for QualgateError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for QualgateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for QualgateError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<rusqlite::Error> for QualgateError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Store {
            message: format!("Database operation failed: {err}"),
            operation: None,
            source: Some(Box::new(err)),
        }
    }
}

impl From<ParseIntError> for QualgateError {
    fn from(err: ParseIntError) -> Self {
        Self::validation(format!("Invalid integer: {err}"))
    }
}

impl From<ParseFloatError> for QualgateError {
    fn from(err: ParseFloatError) -> Self {
        Self::validation(format!("Invalid float: {err}"))
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<QualgateError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            QualgateError::configuration("bad gate").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            QualgateError::validation("bad field").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            QualgateError::data("FILE_1", "bad csv").category(),
            ErrorCategory::Data
        );
        assert_eq!(
            QualgateError::index("rules", "down").category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            QualgateError::store("locked").category(),
            ErrorCategory::Resource
        );
        assert_eq!(
            QualgateError::internal("oops").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn test_data_error_names_row_and_line() {
        let err = QualgateError::data_at_line("FILE_1", 3, "expected 16 fields, got 2");
        let display = format!("{err}");
        assert!(display.contains("FILE_1"));
        assert!(display.contains("expected 16 fields"));

        if let QualgateError::Data { line, .. } = err {
            assert_eq!(line, Some(3));
        } else {
            panic!("Expected Data error");
        }
    }

    #[test]
    fn test_write_failed_keeps_source_category() {
        let err = QualgateError::write_failed(
            "Rule activation",
            QualgateError::index("active_rules", "connection refused"),
        );

        assert_eq!(err.category(), ErrorCategory::Resource);
        let display = format!("{err}");
        assert!(display.starts_with("Rule activation failed"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_configuration_for_metric() {
        let err = QualgateError::configuration_for_metric("unsupported", "ncloc_data");

        if let QualgateError::Configuration { message, metric } = err {
            assert_eq!(message, "unsupported");
            assert_eq!(metric, Some("ncloc_data".to_string()));
        } else {
            panic!("Expected Configuration error");
        }
    }

    #[test]
    fn test_with_context_internal_error() {
        let err = QualgateError::internal("Something went wrong").with_context("During indexing");

        if let QualgateError::Internal { context, .. } = err {
            assert_eq!(context, Some("During indexing".to_string()));
        } else {
            panic!("Expected Internal error");
        }
    }

    #[test]
    fn test_with_context_leaves_configuration_untouched() {
        let err = QualgateError::configuration("Bad threshold").with_context("ignored");

        if let QualgateError::Configuration { message, .. } = err {
            assert_eq!(message, "Bad threshold");
        } else {
            panic!("Expected Configuration error");
        }
    }

    #[test]
    fn test_result_ext_context_on_io() {
        let result: std::result::Result<i32, std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ));

        let err = result.context("Failed to read configuration file").unwrap_err();
        assert!(matches!(err, QualgateError::Io { .. }));
        assert_eq!(err.category(), ErrorCategory::Resource);
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<i32>("invalid json").unwrap_err();
        let err: QualgateError = json_err.into();

        if let QualgateError::Serialization { data_type, .. } = err {
            assert_eq!(data_type, Some("JSON".to_string()));
        } else {
            panic!("Expected Serialization error");
        }
    }

    #[test]
    fn test_from_sqlite_error() {
        let err: QualgateError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, QualgateError::Store { .. }));
    }

    #[test]
    fn test_from_parse_int_error() {
        let parse_err = "not_a_number".parse::<i32>().unwrap_err();
        let err: QualgateError = parse_err.into();

        assert!(matches!(err, QualgateError::Validation { .. }));
    }
}
