//! Build results and their persisted form
//!
//! A build step returns a [`BuildResult`]; the runner flattens it into a
//! [`MetadataUnit`] which the platform stores as `metadata.json` inside the
//! job's `<prefix><key>-metadata` artifact directory.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;

/// File name of a metadata unit inside its directory
pub const METADATA_FILE: &str = "metadata.json";

/// Directory suffix of a job's metadata unit
pub const METADATA_SUFFIX: &str = "-metadata";

/// Directory suffix of a job's uploaded artifact files
pub const ARTIFACTS_SUFFIX: &str = "-artifacts";

/// Where a named artifact lives after the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactSpec {
    /// A file or directory path
    Path(String),
    /// A directory path with glob patterns selecting what to upload
    Filtered {
        path: String,
        #[serde(default)]
        include: Vec<String>,
    },
}

impl ArtifactSpec {
    pub fn filtered<I, S>(path: impl Into<String>, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Filtered {
            path: path.into(),
            include: include.into_iter().map(Into::into).collect(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Path(path) | Self::Filtered { path, .. } => path,
        }
    }

    pub fn include(&self) -> &[String] {
        match self {
            Self::Path(_) => &[],
            Self::Filtered { include, .. } => include,
        }
    }
}

impl From<&str> for ArtifactSpec {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

impl From<String> for ArtifactSpec {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

/// What a build step hands to the deploy step
#[derive(Debug, Clone)]
pub struct BuildResult<P> {
    pub payload: Option<P>,
    pub artifacts: IndexMap<String, ArtifactSpec>,
}

impl<P> Default for BuildResult<P> {
    fn default() -> Self {
        Self {
            payload: None,
            artifacts: IndexMap::new(),
        }
    }
}

impl<P> BuildResult<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Declares a named artifact
    pub fn with_artifact(mut self, name: impl Into<String>, spec: impl Into<ArtifactSpec>) -> Self {
        self.artifacts.insert(name.into(), spec.into());
        self
    }

    /// Splits the result into its persisted unit and the paths to upload
    ///
    /// Both keep artifact declaration order.
    pub fn into_metadata(self) -> (MetadataUnit<P>, Vec<String>) {
        let paths: Vec<String> = self
            .artifacts
            .values()
            .map(|spec| spec.path().to_string())
            .collect();
        let artifacts = self
            .artifacts
            .into_iter()
            .map(|(name, spec)| match spec {
                ArtifactSpec::Path(path) | ArtifactSpec::Filtered { path, .. } => (name, path),
            })
            .collect();

        (
            MetadataUnit {
                payload: self.payload,
                artifacts,
            },
            paths,
        )
    }
}

/// Durable form of a build result
///
/// The payload is written with the caller's own serde schema, so a field
/// typed as a timestamp comes back as a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataUnit<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<P>,
    /// Artifact name to the path recorded at build time
    #[serde(default, deserialize_with = "null_as_empty")]
    pub artifacts: IndexMap<String, String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IndexMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A metadata unit whose payload has not been checked against a schema
pub type RawMetadataUnit = MetadataUnit<JsonValue>;

impl<P: Serialize> MetadataUnit<P> {
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl RawMetadataUnit {
    /// Parses a metadata document without interpreting the payload
    ///
    /// Kept separate from payload decoding so a unit whose payload no longer
    /// matches the schema still contributes its artifacts.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw.trim())
    }

    /// Decodes the payload against the caller's schema
    ///
    /// Returns `None` when the unit carries no payload.
    pub fn decode_payload<P: DeserializeOwned>(&self) -> Option<serde_json::Result<P>> {
        self.payload
            .as_ref()
            .map(|value| P::deserialize(value))
    }
}
