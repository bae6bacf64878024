//! Per-genome containers: call strings, overflow tiers, persistence and validation.

pub mod builder;
pub mod genome;
pub mod store;
pub mod validate;

pub use builder::GenomeBuilder;
pub use genome::{Call, GenomeContainer, LookupError};
pub use validate::{ValidationConfig, Violation};
