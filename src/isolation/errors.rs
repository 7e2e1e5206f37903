//! Isolation error types, using thiserror for structured errors.

use crate::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IsolationError {
    #[error("Malformed classloader model in '{path}': {reason}")]
    MalformedModel { path: String, reason: String },

    #[error("Malformed module descriptor in '{path}': {reason}")]
    MalformedModule { path: String, reason: String },

    #[error("Module discovery failed under '{root}': {source}")]
    ModuleDiscovery {
        root: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Class '{class_name}' is not visible from '{artifact}'")]
    ClassNotFound {
        class_name: String,
        artifact: String,
    },

    #[error("Resource '{resource}' is not visible from '{artifact}'")]
    ResourceNotFound { resource: String, artifact: String },

    #[error("Isolation tree build failed: {reason}")]
    Build { reason: String },
}

impl IsolationError {
    pub fn malformed_model(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedModel {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed_module(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedModule {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn module_discovery(root: impl Into<String>, source: std::io::Error) -> Self {
        Self::ModuleDiscovery {
            root: root.into(),
            source,
        }
    }

    pub fn class_not_found(class_name: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self::ClassNotFound {
            class_name: class_name.into(),
            artifact: artifact.into(),
        }
    }

    pub fn resource_not_found(resource: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource: resource.into(),
            artifact: artifact.into(),
        }
    }

    pub fn build(reason: impl Into<String>) -> Self {
        Self::Build {
            reason: reason.into(),
        }
    }
}

impl From<IsolationError> for CoreError {
    fn from(err: IsolationError) -> Self {
        CoreError::IsolationError(err.to_string())
    }
}
