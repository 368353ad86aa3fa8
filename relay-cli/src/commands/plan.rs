//! Plan command handler
//!
//! Maps the directories a push touched onto the action packages that own
//! them and writes the workflow matrix of package builds.

use anyhow::{Context, Result};
use colored::*;
use indexmap::IndexSet;
use relay_action::{Outputs, write_outputs};
use relay_core::{ActionDescriptor, BuildMatrix, DESCRIPTOR_FILE, ExecutionContext};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// One package build in the planned workflow matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedPackage {
    pub dir: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_matrix: Option<BuildMatrix>,
}

#[derive(Debug, Serialize)]
struct PlanMatrix<'a> {
    include: &'a [PlannedPackage],
}

/// Handle the plan command
///
/// Writes `count` and `matrix` to the step's output file.
pub async fn handle_plan_command(dirs: Vec<PathBuf>) -> Result<()> {
    let context = ExecutionContext::from_env()
        .await
        .context("Failed to read the CI environment")?;

    let dirs = if dirs.is_empty() {
        read_dirs_from_stdin().await?
    } else {
        dirs
    };

    let packages = plan_packages(&dirs, context.workspace()).await?;

    let outputs = Outputs::new()
        .with("count", packages.len())
        .with(
            "matrix",
            serde_json::to_value(PlanMatrix {
                include: &packages,
            })?,
        );
    write_outputs(context.output_path(), &outputs).await?;

    if packages.is_empty() {
        println!("{}", "No action packages changed.".yellow());
    } else {
        println!(
            "{}",
            format!("Planned {} package(s):", packages.len()).bold()
        );
        for package in &packages {
            println!("  {} {} {}", "▸".cyan(), package.name, package.dir.dimmed());
        }
    }

    Ok(())
}

async fn read_dirs_from_stdin() -> Result<Vec<PathBuf>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut dirs = Vec::new();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let line = line.trim();
        if !line.is_empty() {
            dirs.push(PathBuf::from(line));
        }
    }

    Ok(dirs)
}

/// Resolves changed directories to packages and plans each one
///
/// Packages keep the order in which they were first reached. Relative
/// directories are taken from `root`.
pub async fn plan_packages(dirs: &[PathBuf], root: &Path) -> Result<Vec<PlannedPackage>> {
    let mut package_dirs = IndexSet::new();

    for dir in dirs {
        let dir = root.join(dir);
        if dir == root {
            continue;
        }
        match find_package_dir(&dir, root).await {
            Some(package) => {
                debug!("{} belongs to package {}", dir.display(), package.display());
                package_dirs.insert(package);
            }
            None => debug!("{} is not inside an action package", dir.display()),
        }
    }

    let mut packages = Vec::with_capacity(package_dirs.len());
    for dir in package_dirs {
        let descriptor = ActionDescriptor::load(&dir).await?;
        packages.push(plan_package(&dir, &descriptor));
    }

    Ok(packages)
}

fn plan_package(dir: &Path, descriptor: &ActionDescriptor) -> PlannedPackage {
    let name = descriptor.name.clone().unwrap_or_else(|| {
        dir.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default()
    });

    let build_matrix = descriptor.build_matrix().map(|matrix| {
        let build_matrix = matrix.build_matrix();
        info!("{}: {} matrix jobs", name, build_matrix.include.len());
        build_matrix
    });

    PlannedPackage {
        dir: dir.to_string_lossy().to_string(),
        name,
        build_matrix,
    }
}

/// Walks up from `start` to the nearest directory holding a descriptor
///
/// `root` itself is never a package; the walk stops below it, and also at
/// the filesystem root when `start` lies outside `root`.
pub async fn find_package_dir(start: &Path, root: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        if dir == root {
            return None;
        }
        if tokio::fs::try_exists(dir.join(DESCRIPTOR_FILE))
            .await
            .unwrap_or(false)
        {
            return Some(dir.to_path_buf());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn package(root: &Path, rel: &str, descriptor: &str) -> PathBuf {
        let dir = root.join(rel);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DESCRIPTOR_FILE), descriptor).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_find_package_dir_walks_up() {
        let root = tempfile::tempdir().unwrap();
        let kb = package(root.path(), "apps/kb", "{}");
        let nested = kb.join("src/routes");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_package_dir(&nested, root.path()).await, Some(kb.clone()));
        assert_eq!(find_package_dir(&kb, root.path()).await, Some(kb));
    }

    #[tokio::test]
    async fn test_root_descriptor_is_not_a_package() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join(DESCRIPTOR_FILE), "{}").unwrap();
        let lib = root.path().join("internal/lib");
        fs::create_dir_all(&lib).unwrap();

        assert_eq!(find_package_dir(&lib, root.path()).await, None);
    }

    #[tokio::test]
    async fn test_plan_dedupes_in_first_seen_order() {
        let root = tempfile::tempdir().unwrap();
        let site = package(root.path(), "apps/site", r#"{"name":"www"}"#);
        let kb = package(
            root.path(),
            "apps/kb",
            r#"{"matrix":{"arch":["amd64","arm64"]}}"#,
        );
        fs::create_dir_all(root.path().join("internal/lib")).unwrap();

        let dirs = vec![
            root.path().to_path_buf(),
            site.join("src"),
            PathBuf::from("apps/kb"),
            PathBuf::from("internal/lib"),
            site.clone(),
        ];
        let packages = plan_packages(&dirs, root.path()).await.unwrap();

        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].name, "www");
        assert_eq!(packages[0].dir, site.to_string_lossy());
        assert!(packages[0].build_matrix.is_none());

        assert_eq!(packages[1].name, "kb");
        assert_eq!(packages[1].dir, kb.to_string_lossy());
        let include = &packages[1].build_matrix.as_ref().unwrap().include;
        assert_eq!(include[1].matrix_key, "arm64");
        assert_eq!(include[1].matrix_values_json, r#"{"arch":"arm64"}"#);
    }

    #[tokio::test]
    async fn test_invalid_descriptor_fails_plan() {
        let root = tempfile::tempdir().unwrap();
        let kb = package(root.path(), "apps/kb", r#"{"matrix":{"arch":[]}}"#);

        let result = plan_packages(&[kb], root.path()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_planned_package_omits_missing_matrix() {
        let planned = PlannedPackage {
            dir: "/w/apps/site".to_string(),
            name: "site".to_string(),
            build_matrix: None,
        };

        assert_eq!(
            serde_json::to_string(&PlanMatrix {
                include: &[planned]
            })
            .unwrap(),
            r#"{"include":[{"dir":"/w/apps/site","name":"site"}]}"#
        );
    }
}
