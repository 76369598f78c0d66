use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::config::ConfigError;

#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum FlightError {
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    #[error("{0}")]
    NotSerializable(String),

    #[error(
        "React Blocks (and Lazy Components) are expected to be replaced by a compiler on the \
         server. Try configuring your compiler set up and avoid using React.lazy inside of Blocks."
    )]
    UnsupportedBlock,

    #[error("{0}")]
    ModuleResolution(String),

    #[error("Invalid hook call. Hooks can only be called while a server component renders.")]
    InvalidHookCall,

    #[error("{0} is not supported in Server Components.")]
    UnsupportedHook(&'static str),

    #[error("{message}")]
    Component { message: String, stack: Option<String> },

    #[error("Error: {0}")]
    Thrown(String),

    #[error("Destination error: {0}")]
    Destination(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FlightError {
    pub fn component(message: impl Into<String>) -> Self {
        Self::Component { message: message.into(), stack: None }
    }

    /// A value raised by user code that is not an error in its own right.
    pub fn thrown(value: impl std::fmt::Display) -> Self {
        Self::Thrown(value.to_string())
    }

    pub fn not_serializable(message: impl Into<String>) -> Self {
        Self::NotSerializable(message.into())
    }

    pub fn unsupported_type(description: impl Into<String>) -> Self {
        Self::UnsupportedType(description.into())
    }

    pub fn module_resolution(message: impl Into<String>) -> Self {
        Self::ModuleResolution(message.into())
    }

    pub fn destination(message: impl Into<String>) -> Self {
        Self::Destination(message.into())
    }

    pub fn with_stack(self, stack: impl Into<String>) -> Self {
        match self {
            Self::Component { message, .. } => {
                Self::Component { message, stack: Some(stack.into()) }
            }
            other => other,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Component { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn stack(&self) -> Option<&str> {
        match self {
            Self::Component { stack, .. } => stack.as_deref(),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            Self::NotSerializable(_) => "NOT_SERIALIZABLE",
            Self::UnsupportedBlock => "UNSUPPORTED_BLOCK",
            Self::ModuleResolution(_) => "MODULE_RESOLUTION",
            Self::InvalidHookCall => "INVALID_HOOK_CALL",
            Self::UnsupportedHook(_) => "UNSUPPORTED_HOOK",
            Self::Component { .. } => "COMPONENT_ERROR",
            Self::Thrown(_) => "THROWN_VALUE",
            Self::Destination(_) => "DESTINATION_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

/// Body of an `E` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub stack: String,
}

impl ErrorPayload {
    pub const FALLBACK_MESSAGE: &'static str =
        "An error occurred but serializing the error message failed.";
}

impl From<&FlightError> for ErrorPayload {
    fn from(error: &FlightError) -> Self {
        Self { message: error.message(), stack: error.stack().unwrap_or_default().to_string() }
    }
}

impl From<serde_json::Error> for FlightError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<std::io::Error> for FlightError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<ConfigError> for FlightError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

impl From<String> for FlightError {
    fn from(error: String) -> Self {
        Self::Component { message: error, stack: None }
    }
}

impl From<&str> for FlightError {
    fn from(error: &str) -> Self {
        Self::Component { message: error.to_string(), stack: None }
    }
}
