//! Matrix command handler

use anyhow::{Context, Result};
use relay_core::{ActionDescriptor, BuildMatrix};
use std::path::Path;

/// Print the `include` list of a package's build matrix as JSON
///
/// A package without a matrix prints its single implicit job.
pub async fn handle_matrix_command(path: &Path) -> Result<()> {
    let descriptor = ActionDescriptor::load(path)
        .await
        .with_context(|| format!("Failed to load descriptor from {}", path.display()))?;

    let json = serde_json::to_string_pretty(&expanded(&descriptor))?;
    println!("{}", json);
    Ok(())
}

fn expanded(descriptor: &ActionDescriptor) -> BuildMatrix {
    descriptor.matrix.clone().unwrap_or_default().build_matrix()
}
