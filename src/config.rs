// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::error::ErrorReport;
use crate::error::Fallible;

/// The name of the optional configuration file in the data directory.
pub const CONFIG_FILE: &str = "shizen.toml";

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// How many snapshot and content backups to keep, each.
    pub retention: usize,
    /// Default number of archive chapters processed per batch.
    pub batch_size: usize,
    /// How many never-reviewed units the feed offers.
    pub new_per_feed: usize,
    pub fetch: FetchConfig,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retention: 5,
            batch_size: 5,
            new_per_feed: 5,
            fetch: FetchConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (compatible; shizen)".to_string(),
        }
    }
}

impl Config {
    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        if config.retention == 0 {
            return Err(ErrorReport::validation("retention must be at least 1."));
        }
        if config.batch_size == 0 {
            return Err(ErrorReport::validation("batch_size must be at least 1."));
        }
        Ok(config)
    }

    /// Load the configuration from the data directory, falling back to the
    /// defaults if there is no configuration file.
    pub fn load(data_dir: &Path) -> Fallible<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No configuration file, using defaults.");
            return Ok(Self::default());
        }
        let content = read_to_string(&path)?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults_without_file() -> Fallible<()> {
        let dir = tempdir()?;
        assert_eq!(Config::load(dir.path())?, Config::default());
        Ok(())
    }

    #[test]
    fn test_partial_file() -> Fallible<()> {
        let config = Config::parse("retention = 2\n[fetch]\ntimeout_secs = 5\n")?;
        assert_eq!(config.retention, 2);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.fetch.timeout_secs, 5);
        assert_eq!(config.fetch.user_agent, FetchConfig::default().user_agent);
        Ok(())
    }

    #[test]
    fn test_invalid_file() {
        let err = Config::parse("retention = \"many\"").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Validation));
        let err = Config::parse("retention = 0").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Validation));
        assert!(Config::parse("colour = true").is_err());
    }
}
