//! Artifact path resolution
//!
//! A build records artifact paths relative to its own working directory. On
//! the deploy side the platform has placed each job's files under a
//! `<prefix><key>-artifacts` directory, so each recorded path is looked up
//! in those directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Locates `relative` inside one of `candidates`
///
/// The path with any leading `./` removed is tried first, then the path as
/// recorded, in every candidate directory in order. The first existing match
/// wins. An absolute path is looked up below each candidate, never on its
/// own. If nothing exists the recorded path is returned unchanged, leaving
/// the deploy step to decide whether a missing artifact matters.
pub async fn resolve_artifact(relative: &str, candidates: &[PathBuf]) -> PathBuf {
    let normalized = relative.strip_prefix("./").unwrap_or(relative);
    let mut forms = vec![normalized];
    if normalized != relative {
        forms.push(relative);
    }

    for dir in candidates {
        for form in &forms {
            let full = dir.join(form.trim_start_matches('/'));
            if exists(&full).await {
                debug!("Resolved artifact '{}' to {}", relative, full.display());
                return full;
            }
        }
    }

    warn!(
        "Artifact '{}' not found in {} artifact director{}; passing it through unresolved",
        relative,
        candidates.len(),
        if candidates.len() == 1 { "y" } else { "ies" }
    );
    PathBuf::from(relative)
}

async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn test_resolves_in_later_directory() {
        let root = tempfile::tempdir().unwrap();
        let d1 = root.path().join("d1");
        let d2 = root.path().join("d2");
        fs::create_dir_all(&d1).unwrap();
        fs::create_dir_all(d2.join("out")).unwrap();
        fs::write(d2.join("out/index.html"), "<html></html>").unwrap();

        let resolved = resolve_artifact("./out/index.html", &[d1, d2.clone()]).await;
        assert_eq!(resolved, d2.join("out/index.html"));
    }

    #[tokio::test]
    async fn test_first_directory_wins() {
        let root = tempfile::tempdir().unwrap();
        let d1 = root.path().join("d1");
        let d2 = root.path().join("d2");
        fs::create_dir_all(&d1).unwrap();
        fs::create_dir_all(&d2).unwrap();
        fs::write(d1.join("app.tar"), "1").unwrap();
        fs::write(d2.join("app.tar"), "2").unwrap();

        let resolved = resolve_artifact("app.tar", &[d1.clone(), d2]).await;
        assert_eq!(resolved, d1.join("app.tar"));
    }

    #[tokio::test]
    async fn test_unresolved_returns_recorded_path() {
        let root = tempfile::tempdir().unwrap();
        let candidates = vec![root.path().join("d1"), root.path().join("d2")];

        assert_eq!(
            resolve_artifact("out/index.html", &candidates).await,
            PathBuf::from("out/index.html")
        );
        assert_eq!(
            resolve_artifact("./out/index.html", &candidates).await,
            PathBuf::from("./out/index.html")
        );
        assert_eq!(
            resolve_artifact("./out/index.html", &[]).await,
            PathBuf::from("./out/index.html")
        );
    }

    #[tokio::test]
    async fn test_absolute_path_stays_inside_candidates() {
        let root = tempfile::tempdir().unwrap();
        let source = root.path().join("workspace/apps/site/index.html");
        fs::create_dir_all(source.parent().unwrap()).unwrap();
        fs::write(&source, "checkout").unwrap();

        let recorded = source.to_string_lossy().to_string();
        let d1 = root.path().join("site-a-artifacts");
        let d2 = root.path().join("site-b-artifacts");
        let uploaded = d2.join(recorded.trim_start_matches('/'));
        fs::create_dir_all(&d1).unwrap();
        fs::create_dir_all(uploaded.parent().unwrap()).unwrap();
        fs::write(&uploaded, "artifact").unwrap();

        let resolved = resolve_artifact(&recorded, &[d1.clone(), d2.clone()]).await;
        assert_eq!(resolved, uploaded);

        fs::remove_file(&uploaded).unwrap();
        let resolved = resolve_artifact(&recorded, &[d1, d2]).await;
        assert_eq!(resolved, PathBuf::from(&recorded));
    }

    #[tokio::test]
    async fn test_resolves_directories() {
        let root = tempfile::tempdir().unwrap();
        let d1 = root.path().join("d1");
        fs::create_dir_all(d1.join("dist/assets")).unwrap();

        let resolved = resolve_artifact("./dist", &[d1.clone()]).await;
        assert_eq!(resolved, d1.join("dist"));
    }
}
