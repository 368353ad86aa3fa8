//! Error types for Relay

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a build or deploy invocation
///
/// Recoverable conditions (a malformed matrix variable, a missing metadata
/// file, an unresolved artifact) are logged and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    /// One or more required environment variables are missing or malformed
    #[error("invalid environment: {}", join_issues(.issues))]
    InvalidEnvironment {
        /// Every offending variable, in declaration order
        issues: Vec<EnvIssue>,
    },

    /// The event payload file could not be read
    #[error("failed to read event file {path}: {source}")]
    EventRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The event payload file is not valid JSON
    #[error("event file {path} is not valid JSON: {source}")]
    EventParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A variable only the deploy step needs is missing
    #[error("{0} environment variable is required")]
    MissingDeployVariable(&'static str),

    /// The artifacts root could not be listed
    #[error("failed to read artifacts directory {path}: {source}")]
    ArtifactsRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output channel file could not be written
    #[error("failed to write outputs to {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An action descriptor could not be loaded
    #[error("invalid descriptor {path}: {message}")]
    Descriptor { path: PathBuf, message: String },

    /// The secrets blob is missing or does not match the requested shape
    #[error("secrets: {0}")]
    Secrets(String),

    /// Metadata could not be serialized
    #[error("failed to encode metadata: {0}")]
    Encode(#[from] serde_json::Error),

    /// The caller's before, build or deploy step failed
    #[error("step failed: {0:#}")]
    Step(anyhow::Error),
}

impl Error {
    /// Create a descriptor error
    pub fn descriptor(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Descriptor {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check if this error came from the caller's step rather than Relay itself
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::Step(_))
    }
}

/// A single problem with an environment variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvIssue {
    /// Variable name
    pub name: &'static str,
    /// What is wrong with it
    pub problem: IssueKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueKind {
    Missing,
    Malformed { expected: &'static str, found: String },
}

impl EnvIssue {
    pub fn missing(name: &'static str) -> Self {
        Self {
            name,
            problem: IssueKind::Missing,
        }
    }

    pub fn malformed(name: &'static str, expected: &'static str, found: impl Into<String>) -> Self {
        Self {
            name,
            problem: IssueKind::Malformed {
                expected,
                found: found.into(),
            },
        }
    }
}

impl fmt::Display for EnvIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.problem {
            IssueKind::Missing => write!(f, "{} is required", self.name),
            IssueKind::Malformed { expected, found } => {
                write!(f, "{} must be {}, got '{}'", self.name, expected, found)
            }
        }
    }
}

fn join_issues(issues: &[EnvIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
