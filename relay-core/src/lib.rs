//! Relay Core
//!
//! Core types for handing typed results from a build step to a deploy step
//! across CI job boundaries.
//!
//! This crate contains:
//! - Execution context: the typed view of the CI environment
//! - Matrix: declarative matrix configuration and its expansion
//! - Metadata: build results and their persisted form
//! - Descriptor: the static per-package action descriptor

pub mod descriptor;
pub mod env;
pub mod error;
pub mod matrix;
pub mod metadata;

pub use descriptor::{ActionDescriptor, DESCRIPTOR_FILE};
pub use env::{ExecutionContext, RefType, Vars};
pub use error::{EnvIssue, Error, Result};
pub use matrix::{BuildMatrix, Combination, MatrixConfig, MatrixInclude, MatrixJob};
pub use metadata::{ArtifactSpec, BuildResult, MetadataUnit, RawMetadataUnit};
