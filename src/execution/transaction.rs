//! Transaction demarcation for flow execution.
//!
//! The actual transactional resource lives behind [`TransactionFactory`];
//! the core only decides when to begin, commit, and roll back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// How the execution template demarcates a transaction around one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    /// No transaction handling at all.
    #[default]
    None,
    /// Begin a transaction if a factory is configured.
    BeginOrJoin,
    /// Always begin a transaction; a missing factory is an error.
    AlwaysBegin,
    /// Transactions are not supported by this entry point.
    NotSupported,
}

impl fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::BeginOrJoin => write!(f, "begin_or_join"),
            Self::AlwaysBegin => write!(f, "always_begin"),
            Self::NotSupported => write!(f, "not_supported"),
        }
    }
}

impl FromStr for TransactionAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "begin_or_join" => Ok(Self::BeginOrJoin),
            "always_begin" => Ok(Self::AlwaysBegin),
            "not_supported" => Ok(Self::NotSupported),
            _ => Err(format!("Invalid transaction action: {s}")),
        }
    }
}

/// Errors raised by the transactional resource.
#[derive(Debug, Clone, Error)]
pub enum TransactionError {
    #[error("transaction begin failed: {0}")]
    Begin(String),
    #[error("transaction commit failed: {0}")]
    Commit(String),
    #[error("transaction rollback failed: {0}")]
    Rollback(String),
}

/// An open transaction. Consumed by exactly one of commit or rollback.
pub trait Transaction: Send {
    fn commit(self: Box<Self>) -> Result<(), TransactionError>;
    fn rollback(self: Box<Self>) -> Result<(), TransactionError>;
}

/// Opens transactions on the underlying resource.
pub trait TransactionFactory: Send + Sync {
    fn begin(&self) -> Result<Box<dyn Transaction>, TransactionError>;
}

/// Transaction demarcation config handed to the execution template.
#[derive(Clone, Default)]
pub struct TransactionConfig {
    action: TransactionAction,
    factory: Option<Arc<dyn TransactionFactory>>,
}

impl TransactionConfig {
    /// Config that never opens a transaction.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(action: TransactionAction, factory: Arc<dyn TransactionFactory>) -> Self {
        Self {
            action,
            factory: Some(factory),
        }
    }

    pub fn action(&self) -> TransactionAction {
        self.action
    }

    /// Begin a transaction if this config requires one.
    ///
    /// Joining an ambient transaction is the factory's concern; the template
    /// only guarantees demarcation of transactions it opened itself.
    pub(crate) fn begin_if_required(
        &self,
    ) -> Result<Option<Box<dyn Transaction>>, TransactionError> {
        match self.action {
            TransactionAction::None | TransactionAction::NotSupported => Ok(None),
            TransactionAction::BeginOrJoin => match &self.factory {
                Some(factory) => factory.begin().map(Some),
                None => Ok(None),
            },
            TransactionAction::AlwaysBegin => match &self.factory {
                Some(factory) => factory.begin().map(Some),
                None => Err(TransactionError::Begin(
                    "no transaction factory configured".to_string(),
                )),
            },
        }
    }
}

impl fmt::Debug for TransactionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionConfig")
            .field("action", &self.action)
            .field("factory", &self.factory.is_some())
            .finish()
    }
}
