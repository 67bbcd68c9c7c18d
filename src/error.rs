use thiserror::Error;

/// Main error type for the criterion crate
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CriterionError {
    /// Malformed arguments: target arity, sigma, unknown names
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Element counts of input, ground truth or weights disagree
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// IO errors
    #[error("IO error: {0}")]
    IoError(String),
}

impl CriterionError {
    /// Create a shape mismatch error with an optional suggestion
    pub fn shape_mismatch(expected: &str, got: &str, suggestion: Option<&str>) -> Self {
        let message = if let Some(sugg) = suggestion {
            format!("Expected {}, got {}. Suggestion: {}", expected, got, sugg)
        } else {
            format!("Expected {}, got {}", expected, got)
        };
        CriterionError::ShapeMismatch(message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CriterionError::InvalidArgument(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        CriterionError::ConfigurationError(message.into())
    }
}

impl From<std::io::Error> for CriterionError {
    fn from(err: std::io::Error) -> Self {
        CriterionError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for CriterionError {
    fn from(err: serde_json::Error) -> Self {
        CriterionError::SerializationError(err.to_string())
    }
}

/// Result type for criterion operations
pub type CriterionResult<T> = Result<T, CriterionError>;

/// Error context for providing additional debugging information
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub operation: String,
    pub tensor_shapes: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            ..Default::default()
        }
    }

    pub fn with_shape(mut self, shape: impl ToString) -> Self {
        self.tensor_shapes.push(shape.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }

    pub fn to_error_message(&self) -> String {
        let mut message = format!("Operation: {}", self.operation);

        if !self.tensor_shapes.is_empty() {
            message.push_str(&format!("\nTensor shapes: {}", self.tensor_shapes.join(", ")));
        }

        if !self.suggestions.is_empty() {
            message.push_str("\nSuggestions:");
            for suggestion in &self.suggestions {
                message.push_str(&format!("\n  - {}", suggestion));
            }
        }

        message
    }
}

/// Helper trait for adding context to errors
pub trait WithContext<T> {
    fn with_context<F>(self, f: F) -> CriterionResult<T>
    where
        F: FnOnce() -> ErrorContext;
}

impl<T> WithContext<T> for CriterionResult<T> {
    fn with_context<F>(self, f: F) -> CriterionResult<T>
    where
        F: FnOnce() -> ErrorContext,
    {
        self.map_err(|e| {
            let context = f().to_error_message();
            match e {
                CriterionError::ShapeMismatch(msg) => {
                    CriterionError::ShapeMismatch(format!("{}\nContext: {}", msg, context))
                }
                CriterionError::InvalidArgument(msg) => {
                    CriterionError::InvalidArgument(format!("{}\nContext: {}", msg, context))
                }
                _ => e,
            }
        })
    }
}

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidArgument,
    ShapeMismatch,
    ConfigInvalid,
    SerializationFailed,
    Io,
}

impl CriterionError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            CriterionError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            CriterionError::ShapeMismatch(_) => ErrorCode::ShapeMismatch,
            CriterionError::ConfigurationError(_) => ErrorCode::ConfigInvalid,
            CriterionError::SerializationError(_) => ErrorCode::SerializationFailed,
            CriterionError::IoError(_) => ErrorCode::Io,
        }
    }

    /// Caller misuse is never recoverable; config and IO problems can be fixed and retried.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::ConfigInvalid | ErrorCode::SerializationFailed | ErrorCode::Io
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CriterionError::ShapeMismatch(msg) => {
                format!("Shape Mismatch: {}\n\nInput, ground truth and both weight tensors must hold the same number of elements.", msg)
            }
            CriterionError::InvalidArgument(msg) => {
                format!("Invalid Argument: {}\n\nPass the ground truth alone, or ground truth plus inside and outside weights.", msg)
            }
            CriterionError::ConfigurationError(msg) => {
                format!("Configuration Error: {}\n\nCheck the loss section of your configuration file.", msg)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch() {
        let error = CriterionError::shape_mismatch("4 elements", "3 elements", Some("Check the inside weight"));
        assert!(error.to_string().contains("Expected 4 elements, got 3 elements"));
        assert!(error.to_string().contains("Check the inside weight"));
    }

    #[test]
    fn test_error_context() {
        let context = ErrorContext::new("smooth_l1.forward")
            .with_shape("[2, 4]")
            .with_shape("[8]")
            .with_suggestion("Reshape the ground truth to match the input");

        let message = context.to_error_message();
        assert!(message.contains("Operation: smooth_l1.forward"));
        assert!(message.contains("Tensor shapes: [2, 4], [8]"));
        assert!(message.contains("Reshape the ground truth"));
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let result: CriterionResult<()> = Err(CriterionError::ShapeMismatch("bad".to_string()));
        let err = result
            .with_context(|| ErrorContext::new("backward"))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ShapeMismatch);
        assert!(err.to_string().contains("Operation: backward"));
    }

    #[test]
    fn test_error_codes() {
        let shape_error = CriterionError::ShapeMismatch("test".to_string());
        assert_eq!(shape_error.code(), ErrorCode::ShapeMismatch);
        assert!(!shape_error.is_recoverable());

        let config_error = CriterionError::configuration("sigma");
        assert_eq!(config_error.code(), ErrorCode::ConfigInvalid);
        assert!(config_error.is_recoverable());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: CriterionError = io.into();
        assert_eq!(err.code(), ErrorCode::Io);
    }

    #[test]
    fn test_user_message() {
        let error = CriterionError::invalid_argument("target has 2 tensors");
        let message = error.user_message();
        assert!(message.contains("Invalid Argument"));
        assert!(message.contains("inside and outside weights"));
    }
}
