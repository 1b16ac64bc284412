//! Startup errors
//!
//! Configuration problems carry an [`ErrorContext`] so the operator sees
//! which component failed and a hint at what to fix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type GateResult<T> = Result<T, GateError>;

/// Where an error came from and what to try next
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Id to correlate a log line with what the operator saw
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub operation: Option<String>,
    pub suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestions.push(suggestion.to_string());
        self
    }
}

/// Startup errors: loading, parsing or validating configuration
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },
}

impl GateError {
    pub fn context(&self) -> &ErrorContext {
        match self {
            GateError::Config { context, .. } | GateError::Validation { context, .. } => context,
        }
    }

    /// Log the error together with its suggestions
    pub fn log(&self) {
        let context = self.context();
        error!(
            error_id = %context.error_id,
            component = %context.component,
            operation = ?context.operation,
            error = %self,
            "Rolegate failed to start"
        );
        for suggestion in &context.suggestions {
            warn!("Hint: {}", suggestion);
        }
    }
}

/// Build a [`GateError::Config`] with context
///
/// `config_error!(message, component, operation)` or, wrapping a cause,
/// `config_error!(message, component, operation, source)`.
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr, $operation:expr) => {
        $crate::GateError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_operation($operation)
                .with_suggestion("Compare the file with the sample rolegate.toml"),
        }
    };
    ($msg:expr, $component:expr, $operation:expr, $source:expr) => {
        $crate::GateError::Config {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_operation($operation)
                .with_suggestion("Compare the file with the sample rolegate.toml"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::GateError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_operation("validate")
                .with_suggestion("Check the field value and format"),
        }
    };
}
