use crate::error::StoreError;
use bucketfs_core::{Config, PathPrefix};
use serde::{Deserialize, Serialize};

/// Where an [`OssAdapter`](crate::OssAdapter) points and what it writes by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub bucket: String,
    #[serde(default)]
    pub prefix: PathPrefix,
    /// Defaults merged under the per-call options of every write.
    #[serde(default)]
    pub options: Config,
}

impl AdapterConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: PathPrefix::none(),
            options: Config::default(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<PathPrefix>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_options(mut self, options: Config) -> Self {
        self.options = options;
        self
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Configuration(e.to_string()))
    }

    /// Reads `BUCKETFS_BUCKET` (required), `BUCKETFS_PREFIX` and
    /// `BUCKETFS_VISIBILITY`.
    pub fn from_env() -> Result<Self, StoreError> {
        let bucket = std::env::var("BUCKETFS_BUCKET")
            .map_err(|_| StoreError::Configuration("BUCKETFS_BUCKET not set".into()))?;
        let mut config = Self::new(bucket);
        if let Ok(prefix) = std::env::var("BUCKETFS_PREFIX") {
            config.prefix = PathPrefix::new(prefix);
        }
        if let Ok(visibility) = std::env::var("BUCKETFS_VISIBILITY") {
            let visibility = visibility
                .parse()
                .map_err(|e| StoreError::Configuration(format!("BUCKETFS_VISIBILITY: {e}")))?;
            config.options.visibility = Some(visibility);
        }
        Ok(config)
    }
}
