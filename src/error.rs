use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    InitialisationError(String),
    MessagingError(String),
    SchedulingError(String),
    ConfigurationError(String),
    IsolationError(String),
    RegistryError(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InitialisationError(msg) => write!(f, "Initialisation error: {msg}"),
            CoreError::MessagingError(msg) => write!(f, "Messaging error: {msg}"),
            CoreError::SchedulingError(msg) => write!(f, "Scheduling error: {msg}"),
            CoreError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            CoreError::IsolationError(msg) => write!(f, "Isolation error: {msg}"),
            CoreError::RegistryError(msg) => write!(f, "Registry error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Fatal error raised while a component is being set up.
///
/// Initialisation failures abort the startup of the owning component and are
/// never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Failed to initialise '{component}': {reason}")]
pub struct InitialisationError {
    component: String,
    reason: String,
}

impl InitialisationError {
    pub fn new(component: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            reason: reason.into(),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<InitialisationError> for CoreError {
    fn from(err: InitialisationError) -> Self {
        CoreError::InitialisationError(err.to_string())
    }
}
