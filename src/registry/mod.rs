//! # Registry Infrastructure
//!
//! Bootstrap-time registration of discoverable components.
//!
//! ## Overview
//!
//! At artifact startup a [`RegistryBootstrap`] walks its configured
//! bootstrap properties in declaration order and registers every transformer
//! entry with the [`TransformerRegistry`]. Registered
//! [`TransformerResolver`]s are notified of each change as it happens.
//! Bootstrap failures are initialisation errors: fatal, never retried.

pub mod bootstrap;

pub use bootstrap::{
    BootstrapEntry, BootstrapProperties, RegisteredTransformer, RegistryAction,
    RegistryBootstrap, TransformerRegistry, TransformerResolver,
};
