//! The YAML file that used to record which admin role and group names
//! were last applied.
//!
//! The store's admin binding is authoritative. This file is read once to
//! seed a store that has no binding yet, and rewritten after each
//! convergence so tools that still read it stay current.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NameCacheError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid admin name cache at {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminNameCache {
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub role_name: String,
}

impl AdminNameCache {
    /// Read the cache. A missing file is the valid empty state and yields
    /// `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, NameCacheError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(NameCacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if contents.trim().is_empty() {
            return Ok(Some(Self::default()));
        }

        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(|e| NameCacheError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    pub fn save(&self, path: &Path) -> Result<(), NameCacheError> {
        let io_err = |source| NameCacheError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|e| NameCacheError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, yaml).map_err(io_err)
    }

    pub fn is_empty(&self) -> bool {
        self.group_name.is_empty() && self.role_name.is_empty()
    }
}
