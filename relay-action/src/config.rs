//! Action configuration
//!
//! Variables the workflow sets for Relay itself, on top of the platform's
//! own run context.

use relay_core::{Error, Result, Vars};
use std::path::PathBuf;

/// JSON object holding the current job's matrix combination
pub const MATRIX_VALUES_VAR: &str = "MATRIX_VALUES_JSON";

/// Directory the deploy job downloaded every build artifact into
pub const ARTIFACTS_DIR_VAR: &str = "ARTIFACTS_DIR";

/// Prefix shared by a package's artifact directory names
pub const JOB_PREFIX_VAR: &str = "CI_NAME";

/// Raw `metadata` output of a build that did not fan out
pub const BUILD_OUTPUT_VAR: &str = "BUILD_OUTPUT";

/// Deploy configuration
///
/// Expected environment variables:
/// - ARTIFACTS_DIR (required)
/// - CI_NAME (required)
/// - BUILD_OUTPUT (optional, single-job builds only)
#[derive(Debug, Clone)]
pub struct DeployConfig {
    /// Root holding the `<prefix><key>-metadata` and `-artifacts` directories
    pub artifacts_dir: PathBuf,

    /// Only directories starting with this prefix belong to the package
    pub job_prefix: String,

    /// Metadata passed straight from the build job, replacing directory discovery
    pub build_output: Option<String>,
}

impl DeployConfig {
    pub fn new(artifacts_dir: impl Into<PathBuf>, job_prefix: impl Into<String>) -> Self {
        Self {
            artifacts_dir: artifacts_dir.into(),
            job_prefix: job_prefix.into(),
            build_output: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Fails before anything is scanned if a required variable is missing.
    pub fn from_vars(vars: &Vars) -> Result<Self> {
        let artifacts_dir = vars
            .non_empty(ARTIFACTS_DIR_VAR)
            .ok_or(Error::MissingDeployVariable(ARTIFACTS_DIR_VAR))?;

        let job_prefix = vars
            .non_empty(JOB_PREFIX_VAR)
            .ok_or(Error::MissingDeployVariable(JOB_PREFIX_VAR))?;

        Ok(Self {
            artifacts_dir: PathBuf::from(artifacts_dir),
            job_prefix: job_prefix.to_string(),
            build_output: vars.non_empty(BUILD_OUTPUT_VAR).map(str::to_string),
        })
    }

    pub fn with_build_output(mut self, raw: impl Into<String>) -> Self {
        self.build_output = Some(raw.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars() {
        let vars: Vars = [("ARTIFACTS_DIR", "/tmp/artifacts"), ("CI_NAME", "kb-")]
            .into_iter()
            .collect();

        let config = DeployConfig::from_vars(&vars).unwrap();
        assert_eq!(config.artifacts_dir, PathBuf::from("/tmp/artifacts"));
        assert_eq!(config.job_prefix, "kb-");
        assert!(config.build_output.is_none());
    }

    #[test]
    fn test_missing_variables() {
        let vars: Vars = [("CI_NAME", "kb-")].into_iter().collect();
        assert!(matches!(
            DeployConfig::from_vars(&vars),
            Err(Error::MissingDeployVariable("ARTIFACTS_DIR"))
        ));

        let vars: Vars = [("ARTIFACTS_DIR", "/tmp"), ("CI_NAME", "")]
            .into_iter()
            .collect();
        assert!(matches!(
            DeployConfig::from_vars(&vars),
            Err(Error::MissingDeployVariable("CI_NAME"))
        ));
    }
}
