//! Build matrix
//!
//! A [`MatrixConfig`] declares named dimensions and their values; expanding
//! it yields one [`MatrixJob`] per combination, in a deterministic order the
//! deploy side can rely on.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Declarative matrix: dimension name to its ordered values
///
/// Dimension insertion order is significant, it drives both the expansion
/// order and the job keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatrixConfig(IndexMap<String, Vec<String>>);

impl MatrixConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a dimension, replacing the values if it already exists
    pub fn with_dimension<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the first dimension that declares no values
    pub fn empty_dimension(&self) -> Option<&str> {
        self.0
            .iter()
            .find(|(_, values)| values.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Expands the matrix into its Cartesian product
    ///
    /// Starting from a single empty combination, each dimension in turn
    /// replaces every partial combination with one per value. The result is
    /// ordered by the first dimension's values, then the second's, and so on.
    /// An empty matrix yields exactly one job with an empty combination.
    pub fn expand(&self) -> Vec<MatrixJob> {
        let mut combinations = vec![Combination::default()];

        for (dimension, values) in &self.0 {
            combinations = combinations
                .into_iter()
                .flat_map(|partial| {
                    values.iter().map(move |value| {
                        let mut next = partial.clone();
                        next.0.insert(dimension.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }

        combinations
            .into_iter()
            .map(|combination| MatrixJob {
                key: combination.key(),
                combination,
            })
            .collect()
    }

    /// Expands the matrix into the platform's `include` form
    pub fn build_matrix(&self) -> BuildMatrix {
        BuildMatrix {
            include: self.expand().iter().map(MatrixJob::include).collect(),
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for MatrixConfig
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |config, (name, values)| {
                config.with_dimension(name, values)
            })
    }
}

/// One concrete value per matrix dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Combination(IndexMap<String, String>);

impl Combination {
    pub fn get(&self, dimension: &str) -> Option<&str> {
        self.0.get(dimension).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Human-readable job key: the values joined with `-`
    ///
    /// Not guaranteed unique; `{a: "x-y"}` and `{a: "x", b: "y"}` collide.
    pub fn key(&self) -> String {
        self.0.values().map(String::as_str).collect::<Vec<_>>().join("-")
    }

    /// JSON encoding in dimension order
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_else(|_| String::from("{}"))
    }

    /// Decodes the combination a job was started with
    ///
    /// An absent value or the literal `{}` means the job is not part of a
    /// matrix. A malformed value is logged and also treated as empty; it
    /// never fails the job.
    pub fn from_env_value(raw: Option<&str>) -> Self {
        match raw {
            None | Some("") | Some("{}") => Self::default(),
            Some(json) => match serde_json::from_str(json) {
                Ok(values) => Self(values),
                Err(e) => {
                    warn!(
                        "Ignoring malformed matrix values '{}': {}; running without a matrix",
                        json, e
                    );
                    Self::default()
                }
            },
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Combination {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A single expanded job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixJob {
    pub key: String,
    pub combination: Combination,
}

impl MatrixJob {
    /// JSON-encoded combination, as passed to the job in `MATRIX_VALUES_JSON`
    pub fn values_json(&self) -> String {
        self.combination.to_json()
    }

    pub fn include(&self) -> MatrixInclude {
        MatrixInclude {
            matrix_key: self.key.clone(),
            matrix_values_json: self.values_json(),
        }
    }
}

/// One entry of a workflow `strategy.matrix.include` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixInclude {
    pub matrix_key: String,
    pub matrix_values_json: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMatrix {
    pub include: Vec<MatrixInclude>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_orders_by_declaration() {
        let config = MatrixConfig::new()
            .with_dimension("arch", ["amd64", "arm64"])
            .with_dimension("os", ["linux"]);

        let jobs = config.expand();

        assert_eq!(jobs.len(), 2);
        assert_eq!(
            jobs[0].combination,
            Combination::from_iter([("arch", "amd64"), ("os", "linux")])
        );
        assert_eq!(
            jobs[1].combination,
            Combination::from_iter([("arch", "arm64"), ("os", "linux")])
        );
        assert_eq!(jobs[0].key, "amd64-linux");
        assert_eq!(jobs[1].key, "arm64-linux");
    }

    #[test]
    fn test_expand_is_lexicographic_over_dimensions() {
        let config = MatrixConfig::new()
            .with_dimension("os", ["linux", "darwin"])
            .with_dimension("arch", ["amd64", "arm64"]);

        let keys: Vec<_> = config.expand().into_iter().map(|job| job.key).collect();
        assert_eq!(
            keys,
            vec!["linux-amd64", "linux-arm64", "darwin-amd64", "darwin-arm64"]
        );
    }

    #[test]
    fn test_empty_matrix_yields_single_implicit_job() {
        let jobs = MatrixConfig::new().expand();

        assert_eq!(jobs.len(), 1);
        assert!(jobs[0].combination.is_empty());
        assert_eq!(jobs[0].key, "");
        assert_eq!(jobs[0].values_json(), "{}");
    }

    #[test]
    fn test_colliding_keys_are_kept() {
        let config = MatrixConfig::new()
            .with_dimension("a", ["x", "x-y"])
            .with_dimension("b", ["y-z", "z"]);

        let keys: Vec<_> = config.expand().into_iter().map(|job| job.key).collect();
        assert_eq!(keys, vec!["x-y-z", "x-z", "x-y-y-z", "x-y-z"]);
    }

    #[test]
    fn test_values_json_preserves_dimension_order() {
        let config = MatrixConfig::new()
            .with_dimension("os", ["linux"])
            .with_dimension("arch", ["arm64"]);

        let include = config.build_matrix().include;
        assert_eq!(include[0].matrix_key, "linux-arm64");
        assert_eq!(include[0].matrix_values_json, r#"{"os":"linux","arch":"arm64"}"#);
    }

    #[test]
    fn test_config_deserializes_in_declaration_order() {
        let config: MatrixConfig =
            serde_json::from_str(r#"{"target":["web","node"],"mode":["debug"]}"#).unwrap();

        let names: Vec<_> = config.dimensions().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["target", "mode"]);
    }

    #[test]
    fn test_empty_dimension_detection() {
        let config = MatrixConfig::new()
            .with_dimension("arch", ["amd64"])
            .with_dimension("os", Vec::<String>::new());

        assert_eq!(config.empty_dimension(), Some("os"));
        assert!(config.expand().is_empty());
    }

    #[test]
    fn test_combination_from_env_value() {
        assert!(Combination::from_env_value(None).is_empty());
        assert!(Combination::from_env_value(Some("{}")).is_empty());
        assert!(Combination::from_env_value(Some("not json")).is_empty());

        let combination = Combination::from_env_value(Some(r#"{"arch":"arm64"}"#));
        assert_eq!(combination.get("arch"), Some("arm64"));
        assert_eq!(combination.len(), 1);
    }
}
