use std::{collections::HashMap, path::Path};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Database connection settings, as read from a `-db-config` file.
///
/// ```json
/// {"driver": "sqlite3", "data_source": "certs.db"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    pub driver: String,
    pub data_source: String,
}

impl DbConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_sources(path, None)
    }

    pub fn load_with_sources(
        path: &Path,
        env_vars: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("driver", "sqlite3")?
            .add_source(File::from(path));

        // Explicit overrides stand in for the process environment, so
        // CERTDB_* variables set by the caller's shell are not read.
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // CERTDB_DRIVER, CERTDB_DATA_SOURCE
            builder = builder.add_source(
                Environment::with_prefix("CERTDB")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }
}
