//! Content storage configuration

use std::path::PathBuf;

use serde::Deserialize;

use super::error::ValidationError;

/// Where pack files live on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory that `content_items.storage_ref` paths are resolved against
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.root.as_os_str().is_empty() {
            return Err(ValidationError::MissingRequired("STORAGE__ROOT"));
        }
        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { root: default_root() }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("./uploads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_root_is_uploads() {
        let config = StorageConfig::default();
        assert_eq!(config.root, PathBuf::from("./uploads"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_root_is_rejected() {
        let config = StorageConfig {
            root: PathBuf::new(),
        };
        assert!(config.validate().is_err());
    }
}
