//! Step contracts
//!
//! A step is the caller's business logic. Structs can implement the traits
//! directly; async closures taking the env by value get them for free.

use async_trait::async_trait;
use indexmap::IndexMap;
use relay_core::{BuildResult, Combination, ExecutionContext};
use std::future::Future;
use std::path::{Path, PathBuf};

/// What a before step sees
#[derive(Debug, Clone)]
pub struct BeforeEnv {
    pub context: ExecutionContext,
}

/// What a build step sees
#[derive(Debug, Clone)]
pub struct BuildEnv {
    pub context: ExecutionContext,
    /// Current job's combination; empty outside a matrix
    pub matrix: Combination,
}

/// What a deploy step sees
#[derive(Debug, Clone)]
pub struct DeployEnv<P> {
    pub context: ExecutionContext,
    pub matrix: Combination,
    /// Every recovered payload, in sorted job directory order
    pub build: Vec<P>,
    /// Artifact name to resolved path; unresolved entries keep the path the
    /// build recorded
    pub artifacts: IndexMap<String, PathBuf>,
}

impl<P> DeployEnv<P> {
    pub fn artifact(&self, name: &str) -> Option<&Path> {
        self.artifacts.get(name).map(PathBuf::as_path)
    }
}

#[async_trait]
pub trait BeforeStep: Send + Sync {
    async fn before(&self, env: BeforeEnv) -> anyhow::Result<()>;
}

/// Build logic for one job
#[async_trait]
pub trait BuildStep<P>: Send + Sync {
    /// Runs the build
    ///
    /// # Returns
    /// `None` when there is nothing to hand to the deploy step
    async fn build(&self, env: BuildEnv) -> anyhow::Result<Option<BuildResult<P>>>;
}

/// Deploy logic, run once with every job's results
#[async_trait]
pub trait DeployStep<P>: Send + Sync {
    async fn deploy(&self, env: DeployEnv<P>) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> BeforeStep for F
where
    F: Fn(BeforeEnv) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn before(&self, env: BeforeEnv) -> anyhow::Result<()> {
        (self)(env).await
    }
}

#[async_trait]
impl<P, F, Fut> BuildStep<P> for F
where
    P: Send + 'static,
    F: Fn(BuildEnv) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<Option<BuildResult<P>>>> + Send,
{
    async fn build(&self, env: BuildEnv) -> anyhow::Result<Option<BuildResult<P>>> {
        (self)(env).await
    }
}

#[async_trait]
impl<P, F, Fut> DeployStep<P> for F
where
    P: Send + 'static,
    F: Fn(DeployEnv<P>) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn deploy(&self, env: DeployEnv<P>) -> anyhow::Result<()> {
        (self)(env).await
    }
}
