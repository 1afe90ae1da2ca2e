//! # Core Engine Module
//!
//! Shared abstractions the rest of the engine builds on: object identity,
//! the instance database, and the configuration system.
//!
//! ## Organization
//!
//! - **Object**: Identity and naming shared by every engine-managed type
//! - **Registry**: Process-wide identifier issuance and resolution
//! - **Config**: File-backed configuration for engine and applications

pub mod config;
pub mod object;
pub mod registry;

// Re-export commonly used types
pub use config::{Config, ConfigError, EngineConfig};
pub use object::{InstanceId, Object, ObjectMeta};
pub use registry::{Registry, RegistryEntry, RegistryError};
