//! # Artifact Isolation
//!
//! Layered class-visibility tree used to sandbox plugin code.
//!
//! ## Overview
//!
//! Deployment builds a three-tier hierarchy: one container node (boot
//! packages plus discovered modules), N sibling plugin nodes (each seeing
//! the container and its own declared dependencies), and one application
//! node that sees the container and every plugin. Each node resolves class
//! and resource names through an ordered [`ClassLookupPolicy`]: packages
//! registered parent-first delegate up before looking locally, everything
//! else is child-first so an artifact's private dependency versions neither
//! leak nor get shadowed by the container's.
//!
//! ## Lifecycle
//!
//! Trees are mutable only while being assembled; [`IsolationTreeBuilder`]
//! publishes immutable nodes that are safe for concurrent resolution.
//! Module discovery runs against an explicitly seeded set of roots and
//! releases its file handles on every exit path. Descriptor loading fails
//! fast on malformed input; no partial model is ever returned.

pub mod builder;
pub mod descriptor;
pub mod discovery;
pub mod errors;
pub mod lookup;
pub mod node;

pub use builder::{IsolationTree, IsolationTreeBuilder};
pub use descriptor::{ArtifactDependency, ClassloaderModel, DependencyScope};
pub use discovery::{ArtifactModule, FileModuleDiscoverer, ModuleDiscoverer};
pub use errors::IsolationError;
pub use lookup::{ClassLookupPolicy, LookupStrategy};
pub use node::{
    ArtifactClassRegistry, ClassResolver, CompositeResolver, ResolvedClass, ResolvedResource,
};
