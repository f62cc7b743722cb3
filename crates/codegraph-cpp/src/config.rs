use crate::error::BuildError;
use codegraph::StoreLimits;
use serde::{Deserialize, Serialize};

/// Configuration for graph building
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Link methods that are not marked `override` when a base exposes a
    /// virtual method with a matching signature
    pub infer_unmarked_overrides: bool,

    /// Resolve `obj.f()` / `p->f()` calls by searching every method named `f`
    pub resolve_member_calls: bool,

    /// Maximum number of entities (implicit roots included)
    pub max_entities: usize,

    /// Maximum number of edges
    pub max_edges: usize,

    /// Number of worker threads for parallel ingestion (None = rayon default)
    pub parallel_workers: Option<usize>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            infer_unmarked_overrides: true,
            resolve_member_calls: true,
            max_entities: usize::MAX,
            max_edges: usize::MAX,
            parallel_workers: None,
        }
    }
}

impl BuildConfig {
    /// Only link methods explicitly marked `override`
    pub fn explicit_overrides_only(mut self) -> Self {
        self.infer_unmarked_overrides = false;
        self
    }

    /// Leave member calls to names the scope chain can see
    pub fn without_member_call_search(mut self) -> Self {
        self.resolve_member_calls = false;
        self
    }

    /// Cap the store size
    pub fn with_limits(mut self, max_entities: usize, max_edges: usize) -> Self {
        self.max_entities = max_entities;
        self.max_edges = max_edges;
        self
    }

    /// Set the worker count for parallel ingestion
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.parallel_workers = Some(workers);
        self
    }

    /// Store limits derived from this configuration.
    pub fn store_limits(&self) -> StoreLimits {
        StoreLimits {
            max_entities: self.max_entities,
            max_edges: self.max_edges,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.parallel_workers == Some(0) {
            return Err(BuildError::InvalidConfig(
                "parallel_workers must be greater than 0".to_string(),
            ));
        }
        // Both implicit roots always exist.
        if self.max_entities < 2 {
            return Err(BuildError::InvalidConfig(
                "max_entities must leave room for the two implicit roots".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert!(config.infer_unmarked_overrides);
        assert!(config.resolve_member_calls);
        assert_eq!(config.parallel_workers, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = BuildConfig::default()
            .explicit_overrides_only()
            .with_limits(100, 200)
            .with_workers(4);
        assert!(!config.infer_unmarked_overrides);
        assert_eq!(config.store_limits().max_entities, 100);
        assert_eq!(config.store_limits().max_edges, 200);
        assert_eq!(config.parallel_workers, Some(4));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = BuildConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(BuildError::InvalidConfig(_))));
        let config = BuildConfig::default().with_limits(1, 10);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BuildConfig =
            serde_json::from_str(r#"{"resolve_member_calls": false}"#).unwrap();
        assert!(!config.resolve_member_calls);
        assert!(config.infer_unmarked_overrides);
    }
}
