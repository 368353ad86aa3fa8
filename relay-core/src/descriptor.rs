//! Action descriptor
//!
//! Every action package publishes a static `relay.json` next to its build and
//! deploy binaries. The planner reads the matrix from it as plain data, so
//! declaring a matrix never requires running any build code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::matrix::MatrixConfig;

/// File name of a package's descriptor
pub const DESCRIPTOR_FILE: &str = "relay.json";

/// Static declaration of an action package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Display name; defaults to the package directory name
    #[serde(default)]
    pub name: Option<String>,

    /// Build matrix; absent means a single job
    #[serde(default)]
    pub matrix: Option<MatrixConfig>,
}

impl ActionDescriptor {
    /// Parses a descriptor and validates its matrix
    ///
    /// `path` is only used in error messages.
    pub fn parse(path: &Path, raw: &str) -> Result<Self> {
        let descriptor: Self = serde_json::from_str(raw)
            .map_err(|e| Error::descriptor(path, format!("not a valid descriptor: {}", e)))?;

        if let Some(dimension) = descriptor
            .matrix
            .as_ref()
            .and_then(MatrixConfig::empty_dimension)
        {
            return Err(Error::descriptor(
                path,
                format!("matrix dimension '{}' declares no values", dimension),
            ));
        }

        Ok(descriptor)
    }

    /// Loads a descriptor file, or the `relay.json` inside a directory
    pub async fn load(path: &Path) -> Result<Self> {
        let file = if tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
        {
            path.join(DESCRIPTOR_FILE)
        } else {
            path.to_path_buf()
        };

        let raw = tokio::fs::read_to_string(&file)
            .await
            .map_err(|e| Error::descriptor(&file, format!("cannot read: {}", e)))?;

        Self::parse(&file, &raw)
    }

    /// The declared matrix, or none when it is absent or empty
    pub fn build_matrix(&self) -> Option<&MatrixConfig> {
        self.matrix.as_ref().filter(|matrix| !matrix.is_empty())
    }
}
