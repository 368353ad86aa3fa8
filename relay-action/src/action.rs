//! Action entry points

use relay_core::{Error, ExecutionContext, Result, Vars};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::build::run_build;
use crate::deploy::run_deploy;
use crate::mode::Mode;
use crate::step::{BeforeEnv, BeforeStep, BuildStep, DeployStep};

/// Entry point for a package's before, build and deploy binaries
///
/// Holds the invocation mode and a snapshot of the environment; nothing is
/// parsed until a step is actually run.
#[derive(Debug, Clone)]
pub struct Action {
    mode: Mode,
    vars: Vars,
}

impl Action {
    /// Creates an action over the current process environment
    pub fn new(mode: Mode) -> Self {
        Self::with_vars(mode, Vars::capture())
    }

    /// Creates an action whose mode comes from the process arguments
    pub fn from_args() -> Self {
        Self::new(Mode::from_args())
    }

    /// Creates an action over an explicit set of variables
    pub fn with_vars(mode: Mode, vars: Vars) -> Self {
        Self { mode, vars }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Runs a setup step that only needs the run context
    pub async fn before<S>(&self, step: S) -> Result<()>
    where
        S: BeforeStep,
    {
        if self.skip("before") {
            return Ok(());
        }

        let context = ExecutionContext::load(&self.vars).await?;
        info!("Running before step");
        step.before(BeforeEnv { context })
            .await
            .map_err(Error::Step)
    }

    /// Runs a build step and records its result for the deploy job
    ///
    /// # Errors
    /// Fails on an invalid environment, an unreadable event file, a failing
    /// step or an unwritable output file. Nothing is written unless the
    /// step succeeded.
    pub async fn build<P, S>(&self, step: S) -> Result<()>
    where
        P: Serialize + Send + 'static,
        S: BuildStep<P>,
    {
        if self.skip("build") {
            return Ok(());
        }
        run_build(&self.vars, &step).await
    }

    /// Gathers every build job's results and runs the deploy step once
    ///
    /// # Errors
    /// Fails on an invalid environment, a missing `ARTIFACTS_DIR` or
    /// `CI_NAME`, an unreadable artifacts root or a failing step. Missing or
    /// malformed metadata from individual jobs is logged and skipped.
    pub async fn deploy<P, S>(&self, step: S) -> Result<()>
    where
        P: DeserializeOwned + Send + 'static,
        S: DeployStep<P>,
    {
        if self.skip("deploy") {
            return Ok(());
        }
        run_deploy(&self.vars, &step).await
    }

    fn skip(&self, entry: &str) -> bool {
        if self.mode.is_declare() {
            debug!("Declare mode: skipping {} step", entry);
            true
        } else {
            false
        }
    }
}
