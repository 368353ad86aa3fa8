//! Relay Action
//!
//! Runtime linked into each package's build and deploy binaries.
//!
//! A build binary calls [`Action::build`]; its step returns an optional
//! payload and named artifacts, which are written to the platform's output
//! channel. After every matrix job finished and the platform downloaded their
//! outputs, the deploy binary calls [`Action::deploy`], which gathers every
//! job's payload, resolves artifact paths and runs the deploy step once.
//!
//! # Example
//!
//! ```no_run
//! use relay_action::{Action, BuildEnv, BuildResult};
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Payload {
//!     digest: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     relay_action::telemetry::init();
//!
//!     Action::from_args()
//!         .build(|env: BuildEnv| async move {
//!             let arch = env.matrix.get("arch").unwrap_or("amd64").to_string();
//!             Ok(Some(
//!                 BuildResult::new()
//!                     .with_payload(Payload { digest: format!("sha256:{arch}") })
//!                     .with_artifact("image", "./out/image.tar"),
//!             ))
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

mod action;
mod build;
pub mod config;
pub mod deploy;
mod mode;
pub mod output;
pub mod resolver;
mod step;
pub mod telemetry;

pub use action::Action;
pub use config::DeployConfig;
pub use deploy::{Aggregate, aggregate};
pub use mode::Mode;
pub use output::{Outputs, render_outputs, write_outputs};
pub use resolver::resolve_artifact;
pub use step::{BeforeEnv, BeforeStep, BuildEnv, BuildStep, DeployEnv, DeployStep};

pub use relay_core::{
    ArtifactSpec, BuildResult, Combination, Error, ExecutionContext, MatrixConfig, Result, Vars,
};
