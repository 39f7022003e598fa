//! Settings shared by the models and the backends.
//!
//! Settings are read from a TOML file and may be overridden from the environment:
//!
//! ```toml
//! prefix = "/v2"
//!
//! [database]
//! uri = "mongodb://localhost:27017"
//! name = "citybikes"
//! ```

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use tracing::{debug, info};

use crate::error::{DocumentStoreError, DocumentStoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// URL prefix used to build resource hrefs, without a trailing slash.
    pub prefix: String,
    pub database: DatabaseSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub uri: String,
    pub name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: "/v2".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            name: "citybikes".to_string(),
        }
    }
}

impl Settings {
    /// Parses settings from TOML text. Missing keys take their default value.
    pub fn from_toml_str(contents: &str) -> DocumentStoreResult<Self> {
        toml::from_str(contents).map_err(|e| DocumentStoreError::Configuration(e.to_string()))
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> DocumentStoreResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading settings");

        let contents = fs::read_to_string(path)
            .map_err(|e| DocumentStoreError::Configuration(format!("{}: {}", path.display(), e)))?;

        Self::from_toml_str(&contents)
    }

    /// Applies `BIKESHARE_PREFIX`, `MONGODB_URI` and `MONGODB_DATABASE` on top of `self`.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(prefix) = std::env::var("BIKESHARE_PREFIX") {
            debug!(%prefix, "prefix overridden from environment");
            self.prefix = prefix;
        }

        if let Ok(uri) = std::env::var("MONGODB_URI") {
            self.database.uri = uri;
        }

        if let Ok(name) = std::env::var("MONGODB_DATABASE") {
            self.database.name = name;
        }

        self
    }

    /// Builds the href of a resource below the configured prefix.
    pub fn href(&self, path: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
