//! Settings persistence. The model configuration is always stored locally
//! under the `api_config` key, regardless of which card store is active.

use std::io;
use std::path::Path;

use crate::fsutil::{read_text_file, write_text_file_atomic};
use crate::model::ApiConfig;

const SETTINGS_KEY: &str = "api_config";

pub fn load_api_config(config_dir: &Path) -> ApiConfig {
    let path = config_dir.join(format!("{SETTINGS_KEY}.json"));
    match read_text_file(&path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(error = %err, "stored api_config is malformed, using defaults");
                ApiConfig::default()
            }
        },
        Err(err) if err.kind() == io::ErrorKind::NotFound => ApiConfig::default(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read api_config, using defaults");
            ApiConfig::default()
        }
    }
}

pub fn save_api_config(config_dir: &Path, config: &ApiConfig) -> io::Result<()> {
    let path = config_dir.join(format!("{SETTINGS_KEY}.json"));
    let text = serde_json::to_string_pretty(config).map_err(io::Error::other)?;
    write_text_file_atomic(&path, &text)
}

#[cfg(test)]
#[path = "../tests/unit/settings_tests.rs"]
mod tests;
