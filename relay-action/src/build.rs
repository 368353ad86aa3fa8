//! Build runner
//!
//! Runs a build step once for the current job and records its result in the
//! output channel, where the platform picks it up as the job's metadata.

use relay_core::{Combination, Error, ExecutionContext, Result, Vars};
use serde::Serialize;
use tracing::info;

use crate::config::MATRIX_VALUES_VAR;
use crate::output::{Outputs, write_outputs};
use crate::step::{BuildEnv, BuildStep};

/// Output holding the encoded metadata unit
pub(crate) const METADATA_OUTPUT: &str = "metadata";

/// Output listing the artifact paths the platform should upload
pub(crate) const ARTIFACT_PATHS_OUTPUT: &str = "artifact_paths";

pub(crate) async fn run_build<P, S>(vars: &Vars, step: &S) -> Result<()>
where
    P: Serialize + Send + 'static,
    S: BuildStep<P> + ?Sized,
{
    let context = ExecutionContext::load(vars).await?;
    let matrix = Combination::from_env_value(vars.get(MATRIX_VALUES_VAR));
    let output_path = context.paths.output.clone();

    if matrix.is_empty() {
        info!("Running build step");
    } else {
        info!("Running build step for matrix job '{}'", matrix.key());
    }

    let result = step
        .build(BuildEnv { context, matrix })
        .await
        .map_err(Error::Step)?;

    let Some(result) = result else {
        info!("Build step returned no result; no outputs written");
        return Ok(());
    };

    let (unit, artifact_paths) = result.into_metadata();
    info!(
        "Build produced {} payload and {} artifact(s)",
        if unit.payload.is_some() { "a" } else { "no" },
        artifact_paths.len()
    );

    let outputs = Outputs::new()
        .with(METADATA_OUTPUT, unit.encode()?)
        .with(ARTIFACT_PATHS_OUTPUT, artifact_paths.join("\n"));

    write_outputs(&output_path, &outputs).await
}
