//! Execution context
//!
//! Parses the variables the CI platform exports into a typed, immutable
//! [`ExecutionContext`]. Every missing or malformed required variable is
//! collected so a single failure reports all of them at once.

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

use crate::error::{EnvIssue, Error, Result};

/// Snapshot of the variables a process was started with
#[derive(Debug, Clone, Default)]
pub struct Vars {
    inner: HashMap<String, String>,
}

impl Vars {
    /// Captures the current process environment
    pub fn capture() -> Self {
        std::env::vars().collect()
    }

    /// Returns a variable if it is set, even to an empty string
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner.get(name).map(String::as_str)
    }

    /// Returns a variable if it is set and non-empty
    ///
    /// The platform exports an expression that evaluated to nothing as an
    /// empty string, so optional values treat it as unset.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|value| !value.is_empty())
    }

    /// Returns a copy with one variable set
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.inner.insert(name.into(), value.into());
        self
    }

    /// Returns a copy with one variable removed
    pub fn without(mut self, name: &str) -> Self {
        self.inner.remove(name);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Vars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A string that is never printed by `Debug`
#[derive(Clone, PartialEq, Eq)]
pub struct Redacted(String);

impl Redacted {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Redacted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Kind of git ref that triggered the run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefType {
    Branch,
    Tag,
}

impl FromStr for RefType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "branch" => Ok(RefType::Branch),
            "tag" => Ok(RefType::Tag),
            _ => Err(()),
        }
    }
}

/// The action step being executed
#[derive(Debug, Clone)]
pub struct ActionInfo {
    pub name: String,
    /// Only set for composite actions
    pub path: Option<PathBuf>,
    pub repository: String,
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub login: String,
    pub id: Option<String>,
    pub triggering_actor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    pub api_url: String,
    pub graphql_url: String,
    pub server_url: String,
}

/// The webhook event that triggered the run
#[derive(Debug, Clone)]
pub struct Event {
    pub name: String,
    pub path: PathBuf,
    /// Decoded event file; `Null` until [`ExecutionContext::load`] reads it
    pub payload: JsonValue,
}

#[derive(Debug, Clone)]
pub struct RunInfo {
    pub workflow: String,
    pub workflow_ref: Option<String>,
    pub workflow_sha: Option<String>,
    pub job: String,
    pub run_id: u64,
    pub run_number: u64,
    pub run_attempt: u64,
    pub retention_days: u64,
}

#[derive(Debug, Clone)]
pub struct Repository {
    pub name: String,
    pub id: Option<String>,
    pub owner: String,
    pub owner_id: Option<String>,
    pub git_ref: String,
    pub ref_name: String,
    pub ref_type: RefType,
    pub ref_protected: Option<bool>,
    pub sha: String,
    /// Pull requests only
    pub base_ref: Option<String>,
    /// Pull requests only
    pub head_ref: Option<String>,
}

/// Filesystem locations the platform provides
#[derive(Debug, Clone)]
pub struct Paths {
    pub workspace: PathBuf,
    pub env_file: PathBuf,
    /// Output channel read back by the platform after the step
    pub output: PathBuf,
    pub path_file: PathBuf,
    pub step_summary: PathBuf,
    /// Root the deploy job downloads artifacts into
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct RunnerInfo {
    pub name: Option<String>,
    pub os: String,
    pub arch: String,
    pub environment: Option<String>,
    pub debug: bool,
    pub temp: PathBuf,
    pub tool_cache: PathBuf,
}

/// Immutable, typed view of the CI environment
///
/// Built once per process and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub action: ActionInfo,
    pub actor: Actor,
    pub api: ApiEndpoints,
    pub event: Event,
    pub run: RunInfo,
    pub repository: Repository,
    pub paths: Paths,
    pub runner: RunnerInfo,
    secrets: Option<Redacted>,
    runtime_token: Option<Redacted>,
    pub cache_url: Option<String>,
}

impl ExecutionContext {
    /// Parses the process environment and loads the event file
    pub async fn from_env() -> Result<Self> {
        Self::load(&Vars::capture()).await
    }

    /// Parses `vars` and loads the event file it points at
    ///
    /// # Errors
    /// Returns an error if any required variable is missing or malformed, or
    /// if the event file cannot be read or is not valid JSON.
    pub async fn load(vars: &Vars) -> Result<Self> {
        let mut context = Self::parse(vars)?;

        let path = context.event.path.clone();
        let raw = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| Error::EventRead {
                path: path.clone(),
                source,
            })?;
        context.event.payload =
            serde_json::from_str(&raw).map_err(|source| Error::EventParse { path, source })?;

        debug!(
            "Loaded context for run {} attempt {} ({})",
            context.run.run_id, context.run.run_attempt, context.event.name
        );
        Ok(context)
    }

    /// Parses `vars` without touching the filesystem
    ///
    /// The event payload is left as `Null`.
    pub fn parse(vars: &Vars) -> Result<Self> {
        let mut r = FieldReader::new(vars);

        let action = ActionInfo {
            name: r.required("GITHUB_ACTION"),
            path: r.optional("GITHUB_ACTION_PATH").map(PathBuf::from),
            repository: r.required("GITHUB_ACTION_REPOSITORY"),
        };
        // Present on every hosted and self-hosted runner; its absence means
        // we are not running under the platform at all.
        r.required("GITHUB_ACTIONS");

        let actor = Actor {
            login: r.required("GITHUB_ACTOR"),
            id: r.optional("GITHUB_ACTOR_ID"),
            triggering_actor: r.optional("GITHUB_TRIGGERING_ACTOR"),
        };

        let api = ApiEndpoints {
            api_url: r.required("GITHUB_API_URL"),
            graphql_url: r.required("GITHUB_GRAPHQL_URL"),
            server_url: r.required("GITHUB_SERVER_URL"),
        };

        let event = Event {
            name: r.required("GITHUB_EVENT_NAME"),
            path: r.required_path("GITHUB_EVENT_PATH"),
            payload: JsonValue::Null,
        };

        let run = RunInfo {
            workflow: r.required("GITHUB_WORKFLOW"),
            workflow_ref: r.optional("GITHUB_WORKFLOW_REF"),
            workflow_sha: r.optional("GITHUB_WORKFLOW_SHA"),
            job: r.required("GITHUB_JOB"),
            run_id: r.required_number("GITHUB_RUN_ID"),
            run_number: r.required_number("GITHUB_RUN_NUMBER"),
            run_attempt: r.required_number("GITHUB_RUN_ATTEMPT"),
            retention_days: r.required_number("GITHUB_RETENTION_DAYS"),
        };

        let repository = Repository {
            name: r.required("GITHUB_REPOSITORY"),
            id: r.optional("GITHUB_REPOSITORY_ID"),
            owner: r.required("GITHUB_REPOSITORY_OWNER"),
            owner_id: r.optional("GITHUB_REPOSITORY_OWNER_ID"),
            git_ref: r.required("GITHUB_REF"),
            ref_name: r.required("GITHUB_REF_NAME"),
            ref_type: r.required_parsed("GITHUB_REF_TYPE", "'branch' or 'tag'", RefType::Branch),
            ref_protected: r.optional_parsed("GITHUB_REF_PROTECTED", "'true' or 'false'"),
            sha: r.required("GITHUB_SHA"),
            base_ref: r.optional("GITHUB_BASE_REF"),
            head_ref: r.optional("GITHUB_HEAD_REF"),
        };

        let paths = Paths {
            workspace: r.required_path("GITHUB_WORKSPACE"),
            env_file: r.required_path("GITHUB_ENV"),
            output: r.required_path("GITHUB_OUTPUT"),
            path_file: r.required_path("GITHUB_PATH"),
            step_summary: r.required_path("GITHUB_STEP_SUMMARY"),
            artifacts_dir: r.optional("ARTIFACTS_DIR").map(PathBuf::from),
        };

        let runner = RunnerInfo {
            name: r.optional("RUNNER_NAME"),
            os: r.required("RUNNER_OS"),
            arch: r.required("RUNNER_ARCH"),
            environment: r.optional("RUNNER_ENVIRONMENT"),
            debug: r.optional("RUNNER_DEBUG").is_some_and(|v| v == "1" || v == "true"),
            temp: r.required_path("RUNNER_TEMP"),
            tool_cache: r.required_path("RUNNER_TOOL_CACHE"),
        };

        let secrets = r.optional("SECRETS").map(Redacted);
        let runtime_token = r.optional("ACTIONS_RUNTIME_TOKEN").map(Redacted);
        let cache_url = r.optional("ACTIONS_CACHE_URL");

        r.finish()?;

        Ok(Self {
            action,
            actor,
            api,
            event,
            run,
            repository,
            paths,
            runner,
            secrets,
            runtime_token,
            cache_url,
        })
    }

    /// Decodes the raw `SECRETS` blob into a caller-defined shape
    pub fn secrets<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .secrets
            .as_ref()
            .ok_or_else(|| Error::Secrets("SECRETS is not set".to_string()))?;
        serde_json::from_str(raw.expose())
            .map_err(|e| Error::Secrets(format!("SECRETS does not match the expected shape: {}", e)))
    }

    /// Raw `SECRETS` blob, if the workflow passed one
    pub fn raw_secrets(&self) -> Option<&str> {
        self.secrets.as_ref().map(Redacted::expose)
    }

    pub fn runtime_token(&self) -> Option<&str> {
        self.runtime_token.as_ref().map(Redacted::expose)
    }

    /// The `before` commit of a push event
    pub fn event_before(&self) -> Option<&str> {
        self.event.payload.get("before").and_then(JsonValue::as_str)
    }

    pub fn workspace(&self) -> &Path {
        &self.paths.workspace
    }

    pub fn output_path(&self) -> &Path {
        &self.paths.output
    }
}

/// Reads variables while collecting every issue instead of stopping at the first
///
/// Accessors return a placeholder when a variable is unusable; [`finish`]
/// turns any recorded issue into an error so placeholders never escape.
///
/// [`finish`]: FieldReader::finish
struct FieldReader<'a> {
    vars: &'a Vars,
    issues: Vec<EnvIssue>,
}

impl<'a> FieldReader<'a> {
    fn new(vars: &'a Vars) -> Self {
        Self {
            vars,
            issues: Vec::new(),
        }
    }

    fn required(&mut self, name: &'static str) -> String {
        match self.vars.get(name) {
            Some(value) => value.to_string(),
            None => {
                self.issues.push(EnvIssue::missing(name));
                String::new()
            }
        }
    }

    fn required_path(&mut self, name: &'static str) -> PathBuf {
        PathBuf::from(self.required(name))
    }

    fn required_number(&mut self, name: &'static str) -> u64 {
        self.required_parsed(name, "an unsigned integer", 0)
    }

    fn required_parsed<T: FromStr>(
        &mut self,
        name: &'static str,
        expected: &'static str,
        placeholder: T,
    ) -> T {
        let Some(raw) = self.vars.get(name) else {
            self.issues.push(EnvIssue::missing(name));
            return placeholder;
        };
        match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                self.issues.push(EnvIssue::malformed(name, expected, raw));
                placeholder
            }
        }
    }

    fn optional(&self, name: &'static str) -> Option<String> {
        self.vars.non_empty(name).map(str::to_string)
    }

    fn optional_parsed<T: FromStr>(&mut self, name: &'static str, expected: &'static str) -> Option<T> {
        let raw = self.vars.non_empty(name)?;
        match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                self.issues.push(EnvIssue::malformed(name, expected, raw));
                None
            }
        }
    }

    fn finish(self) -> Result<()> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidEnvironment {
                issues: self.issues,
            })
        }
    }
}

/// A complete set of run variables rooted at `root`, for tests
///
/// The event file is expected at `root/event.json`.
#[cfg(any(test, feature = "test-util"))]
#[doc(hidden)]
pub fn test_vars(root: &Path) -> Vars {
    let p = |name: &str| root.join(name).to_string_lossy().to_string();
    [
        ("GITHUB_ACTIONS", "true".to_string()),
        ("GITHUB_ACTION", "__run".to_string()),
        ("GITHUB_ACTION_REPOSITORY", String::new()),
        ("GITHUB_ACTOR", "octocat".to_string()),
        ("GITHUB_API_URL", "https://api.github.com".to_string()),
        ("GITHUB_GRAPHQL_URL", "https://api.github.com/graphql".to_string()),
        ("GITHUB_SERVER_URL", "https://github.com".to_string()),
        ("GITHUB_EVENT_NAME", "push".to_string()),
        ("GITHUB_EVENT_PATH", p("event.json")),
        ("GITHUB_JOB", "build".to_string()),
        ("GITHUB_RUN_ID", "1658821493".to_string()),
        ("GITHUB_RUN_NUMBER", "42".to_string()),
        ("GITHUB_RUN_ATTEMPT", "1".to_string()),
        ("GITHUB_RETENTION_DAYS", "90".to_string()),
        ("GITHUB_WORKFLOW", "ci".to_string()),
        ("GITHUB_REPOSITORY", "octo-org/octo-repo".to_string()),
        ("GITHUB_REPOSITORY_OWNER", "octo-org".to_string()),
        ("GITHUB_REF", "refs/heads/main".to_string()),
        ("GITHUB_REF_NAME", "main".to_string()),
        ("GITHUB_REF_TYPE", "branch".to_string()),
        ("GITHUB_SHA", "ffac537e6cbbf934b08745a378932722df287a53".to_string()),
        ("GITHUB_WORKSPACE", root.to_string_lossy().to_string()),
        ("GITHUB_ENV", p("env")),
        ("GITHUB_OUTPUT", p("output")),
        ("GITHUB_PATH", p("path")),
        ("GITHUB_STEP_SUMMARY", p("summary")),
        ("RUNNER_OS", "Linux".to_string()),
        ("RUNNER_ARCH", "X64".to_string()),
        ("RUNNER_TEMP", p("tmp")),
        ("RUNNER_TOOL_CACHE", p("toolcache")),
    ]
    .into_iter()
    .collect()
}
