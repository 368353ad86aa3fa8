//! Deploy aggregation
//!
//! Reassembles the results of every build job from the artifacts root the
//! platform populated before the deploy job started. The root is treated as
//! a finished snapshot: jobs whose metadata is missing or unreadable are
//! skipped with a warning rather than failing the deploy.

use indexmap::IndexMap;
use relay_core::metadata::{ARTIFACTS_SUFFIX, METADATA_FILE, METADATA_SUFFIX};
use relay_core::{Combination, Error, ExecutionContext, RawMetadataUnit, Result, Vars};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::{BUILD_OUTPUT_VAR, DeployConfig, MATRIX_VALUES_VAR};
use crate::resolver::resolve_artifact;
use crate::step::{DeployEnv, DeployStep};

/// Combined view of every build job
#[derive(Debug, Clone)]
pub struct Aggregate<P> {
    /// Payloads in sorted metadata directory order
    pub payloads: Vec<P>,
    /// Artifact name to resolved path
    pub artifacts: IndexMap<String, PathBuf>,
    /// Metadata units that contributed, payload or not
    pub units: usize,
}

/// Collects every job's payload and artifacts under `config.artifacts_dir`
///
/// # Errors
/// Only an unreadable artifacts root is fatal; every per-unit problem is
/// logged and skipped.
pub async fn aggregate<P: DeserializeOwned>(config: &DeployConfig) -> Result<Aggregate<P>> {
    let job_dirs = list_job_dirs(&config.artifacts_dir, &config.job_prefix).await?;

    let sources = match &config.build_output {
        Some(raw) => {
            debug!("Using metadata from {}", BUILD_OUTPUT_VAR);
            vec![(BUILD_OUTPUT_VAR.to_string(), raw.clone())]
        }
        None => read_metadata_units(&config.artifacts_dir, &job_dirs).await,
    };

    let mut payloads = Vec::new();
    let mut recorded: IndexMap<String, String> = IndexMap::new();
    let mut units = 0;

    for (source, raw) in sources {
        let unit = match RawMetadataUnit::parse(&raw) {
            Ok(unit) => unit,
            Err(e) => {
                warn!("Failed to parse metadata {}: {}", source, e);
                continue;
            }
        };
        units += 1;

        match unit.decode_payload::<P>() {
            Some(Ok(payload)) => payloads.push(payload),
            Some(Err(e)) => warn!("Skipping payload from {}: {}", source, e),
            None => debug!("{} carries no payload", source),
        }

        // Later units overwrite earlier ones for the same artifact name
        for (name, path) in unit.artifacts {
            recorded.insert(name, path);
        }
    }

    let artifact_dirs: Vec<PathBuf> = job_dirs
        .iter()
        .filter(|name| name.ends_with(ARTIFACTS_SUFFIX))
        .map(|name| config.artifacts_dir.join(name))
        .collect();

    let mut artifacts = IndexMap::with_capacity(recorded.len());
    for (name, path) in recorded {
        let resolved = resolve_artifact(&path, &artifact_dirs).await;
        artifacts.insert(name, resolved);
    }

    info!(
        "Aggregated {} payload(s) and {} artifact(s) from {} metadata unit(s)",
        payloads.len(),
        artifacts.len(),
        units
    );

    Ok(Aggregate {
        payloads,
        artifacts,
        units,
    })
}

pub(crate) async fn run_deploy<P, S>(vars: &Vars, step: &S) -> Result<()>
where
    P: DeserializeOwned + Send + 'static,
    S: DeployStep<P> + ?Sized,
{
    let context = ExecutionContext::load(vars).await?;
    let config = DeployConfig::from_vars(vars)?;

    let aggregate = aggregate::<P>(&config).await?;
    let matrix = Combination::from_env_value(vars.get(MATRIX_VALUES_VAR));

    info!("Running deploy step");
    step.deploy(DeployEnv {
        context,
        matrix,
        build: aggregate.payloads,
        artifacts: aggregate.artifacts,
    })
    .await
    .map_err(Error::Step)
}

/// Sorted names of the package's directories directly under `root`
async fn list_job_dirs(root: &Path, prefix: &str) -> Result<Vec<String>> {
    let root_error = |source| Error::ArtifactsRoot {
        path: root.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(root).await.map_err(root_error)?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(root_error)? {
        let is_dir = entry
            .file_type()
            .await
            .map(|file_type| file_type.is_dir())
            .unwrap_or(false);
        if !is_dir {
            continue;
        }

        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(prefix) {
            names.push(name);
        }
    }

    names.sort();
    debug!("Found {} job director(ies) under {}", names.len(), root.display());
    Ok(names)
}

/// Reads `metadata.json` from every metadata directory, skipping absent ones
async fn read_metadata_units(root: &Path, job_dirs: &[String]) -> Vec<(String, String)> {
    let mut sources = Vec::new();

    for name in job_dirs.iter().filter(|name| name.ends_with(METADATA_SUFFIX)) {
        let path = root.join(name).join(METADATA_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => sources.push((path.display().to_string(), raw)),
            Err(e) => warn!("Skipping {}: cannot read {}: {}", name, METADATA_FILE, e),
        }
    }

    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Payload {
        version: String,
    }

    fn write_unit(root: &Path, dir: &str, content: &str) {
        let dir = root.join(dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(METADATA_FILE), content).unwrap();
    }

    #[tokio::test]
    async fn test_later_unit_wins_artifact_collision() {
        let root = tempfile::tempdir().unwrap();
        write_unit(
            root.path(),
            "job-b-metadata",
            r#"{"payload":{"version":"b"},"artifacts":{"build":"b/out"}}"#,
        );
        write_unit(
            root.path(),
            "job-a-metadata",
            r#"{"payload":{"version":"a"},"artifacts":{"build":"a/out","logs":"a/logs"}}"#,
        );

        let config = DeployConfig::new(root.path(), "job-");
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        let versions: Vec<_> = aggregate.payloads.iter().map(|p| p.version.as_str()).collect();
        assert_eq!(versions, vec!["a", "b"]);
        assert_eq!(aggregate.artifacts["build"], PathBuf::from("b/out"));
        assert_eq!(aggregate.artifacts["logs"], PathBuf::from("a/logs"));
        let names: Vec<_> = aggregate.artifacts.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["build", "logs"]);
    }

    #[tokio::test]
    async fn test_missing_metadata_file_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("job-amd64-metadata")).unwrap();
        write_unit(
            root.path(),
            "job-arm64-metadata",
            r#"{"payload":{"version":"arm"}}"#,
        );

        let config = DeployConfig::new(root.path(), "job-");
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        assert_eq!(aggregate.units, 1);
        assert_eq!(
            aggregate.payloads,
            vec![Payload {
                version: "arm".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_bad_units_degrade() {
        let root = tempfile::tempdir().unwrap();
        write_unit(root.path(), "job-1-metadata", "{not json");
        write_unit(
            root.path(),
            "job-2-metadata",
            r#"{"payload":{"version":2},"artifacts":{"site":"out"}}"#,
        );
        write_unit(root.path(), "job-3-metadata", r#"{"artifacts":{}}"#);

        let config = DeployConfig::new(root.path(), "job-");
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        assert!(aggregate.payloads.is_empty());
        assert_eq!(aggregate.units, 2);
        assert_eq!(aggregate.artifacts["site"], PathBuf::from("out"));
    }

    #[tokio::test]
    async fn test_null_artifacts_still_contribute_payload() {
        let root = tempfile::tempdir().unwrap();
        write_unit(
            root.path(),
            "job-a-metadata",
            r#"{"payload":{"version":"1"},"artifacts":null}"#,
        );

        let config = DeployConfig::new(root.path(), "job-");
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        assert_eq!(aggregate.units, 1);
        assert_eq!(
            aggregate.payloads,
            vec![Payload {
                version: "1".to_string()
            }]
        );
        assert!(aggregate.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_filters_by_prefix_and_resolves() {
        let root = tempfile::tempdir().unwrap();
        write_unit(
            root.path(),
            "site-metadata",
            r#"{"payload":{"version":"1"},"artifacts":{"build":"./out/index.html"}}"#,
        );
        write_unit(
            root.path(),
            "other-metadata",
            r#"{"payload":{"version":"other"}}"#,
        );
        let files = root.path().join("site-artifacts").join("out");
        fs::create_dir_all(&files).unwrap();
        fs::write(files.join("index.html"), "<html></html>").unwrap();
        fs::write(root.path().join("site-stray-metadata"), "not a directory").unwrap();

        let config = DeployConfig::new(root.path(), "site");
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        assert_eq!(aggregate.payloads.len(), 1);
        assert_eq!(
            aggregate.artifacts["build"],
            root.path().join("site-artifacts").join("out/index.html")
        );
    }

    #[tokio::test]
    async fn test_build_output_replaces_discovery() {
        let root = tempfile::tempdir().unwrap();
        write_unit(
            root.path(),
            "kb-metadata",
            r#"{"payload":{"version":"from-dir"}}"#,
        );

        let config = DeployConfig::new(root.path(), "kb")
            .with_build_output(r#"{"payload":{"version":"from-env"}}"#);
        let aggregate = aggregate::<Payload>(&config).await.unwrap();

        assert_eq!(aggregate.payloads.len(), 1);
        assert_eq!(aggregate.payloads[0].version, "from-env");
    }

    #[tokio::test]
    async fn test_unreadable_root_is_fatal() {
        let root = tempfile::tempdir().unwrap();
        let config = DeployConfig::new(root.path().join("missing"), "job-");

        let result = aggregate::<Payload>(&config).await;
        assert!(matches!(result, Err(Error::ArtifactsRoot { .. })));
    }
}
