//! Step outputs
//!
//! The platform reads a step's outputs back from a file of `key=value` lines.
//! Values are written verbatim; a string containing a newline will break the
//! line format, which callers must avoid.

use indexmap::IndexMap;
use relay_core::{Error, Result};
use serde_json::Value as JsonValue;
use std::path::Path;
use tracing::debug;

/// Ordered output values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outputs(IndexMap<String, JsonValue>);

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Renders outputs as `key=value` lines
///
/// Strings are written raw; anything else as inline JSON, which for numbers
/// and booleans is their plain form.
pub fn render_outputs(outputs: &Outputs) -> String {
    outputs
        .0
        .iter()
        .map(|(key, value)| match value {
            JsonValue::String(s) => format!("{}={}", key, s),
            other => format!("{}={}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Writes outputs to the output channel, replacing its previous content
pub async fn write_outputs(path: &Path, outputs: &Outputs) -> Result<()> {
    debug!("Writing {} output(s) to {}", outputs.len(), path.display());

    tokio::fs::write(path, render_outputs(outputs))
        .await
        .map_err(|source| Error::Output {
            path: path.to_path_buf(),
            source,
        })
}
