use derive_more::Debug;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, instrument, Level};

use crate::error::{Error, Result};
use crate::CommandArgs;

const DEFAULT_BASE_URL: &str = "https://sintraclassicos.pt";
const DEFAULT_OUT_DIR: &str = "dist/fragments";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

// ###################################################### //
//                     Config Struct                      //
// ###################################################### //

/// Resolved run configuration: CLI arguments merged over the optional YAML
/// config file, with defaults underneath.
#[derive(Debug)]
pub struct Config {
    pub base_url: String,
    pub out_dir: String,
    pub relay_address: String,
    /// Force the content cache on even on local-development hosts.
    pub force_cache: bool,
    pub poll_interval_secs: u64,
    /// Change polling only runs in an administrative context.
    pub admin_context: bool,
}

impl Config {
    #[instrument(skip_all, ret(level = Level::TRACE), err(Display))]
    pub fn resolve(args: &CommandArgs) -> Result<Self> {
        let file = match &args.config_path {
            Some(path) => ConfigFile::new(path)?,
            None => ConfigFile::default(),
        };

        let config = Self {
            base_url: args
                .base_url
                .clone()
                .or(file.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            out_dir: args
                .out_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| DEFAULT_OUT_DIR.to_string()),
            relay_address: file
                .relay_address
                .unwrap_or_else(|| crate::forms::RELAY_ADDRESS.to_string()),
            force_cache: file.force_cache.unwrap_or(false),
            poll_interval_secs: file
                .poll_interval_secs
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            admin_context: file.admin_context.unwrap_or(false),
        };

        Ok(config)
    }
}

// ###################################################### //
//                  ConfigFile Struct                     //
// ###################################################### //

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    base_url: Option<String>,
    output_dir: Option<String>,
    relay_address: Option<String>,
    force_cache: Option<bool>,
    poll_interval_secs: Option<u64>,
    admin_context: Option<bool>,
}

impl ConfigFile {
    #[instrument(skip_all, ret(level = Level::TRACE), err(Display))]
    pub fn new(path: &str) -> Result<ConfigFile> {
        if !Path::new(path).is_file() {
            return Err(Error::InvalidFilePath(path.to_string()));
        }
        let file = fs::read_to_string(path)?;
        let yaml: ConfigFile = serde_yml::from_str(&file)?;
        Ok(yaml)
    }
}

// ###################################################### //
//              Generated runtime config                  //
// ###################################################### //

/// The single global configuration object emitted at build time and consumed
/// at page load. Write-once per build/deploy.
#[derive(Debug)]
pub struct GeneratedConfig {
    #[debug("\"<redacted>\"")]
    google_api_key: String,
}

impl GeneratedConfig {
    /// Resolution order: process environment first (CI/deploy host), then the
    /// local `.env` file.
    #[instrument(skip_all, err(Display))]
    pub fn resolve(env_path: &str) -> Result<Self> {
        if let Ok(key) = std::env::var("GOOGLE_API_KEY") {
            if !key.is_empty() {
                info!("using GOOGLE_API_KEY from environment variables");
                return Ok(Self { google_api_key: key });
            }
        }

        if Path::new(env_path).is_file() {
            let content = fs::read_to_string(env_path)?;
            if let Some(key) = env_value(&content, "GOOGLE_API_KEY") {
                info!("using GOOGLE_API_KEY from .env file");
                return Ok(Self { google_api_key: key });
            }
        }

        Err(Error::ApiKeyMissing)
    }

    #[instrument(skip(self), err(Display))]
    pub fn write(&self, out_path: &str) -> Result<()> {
        let env = serde_json::json!({ "GOOGLE_API_KEY": self.google_api_key });
        let body = format!(
            "// GENERATED FROM .env or environment variables — DO NOT COMMIT SECRETS\nwindow.__ENV = {};\n",
            serde_json::to_string_pretty(&env)?
        );
        fs::write(out_path, body)?;
        info!(out_path, "generated runtime config");
        Ok(())
    }
}

/// Minimal `.env` parsing: skips blanks and comments, trims matching quotes.
fn env_value(content: &str, wanted: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() != wanted {
            continue;
        }

        let mut value = value.trim();
        if (value.starts_with('"') && value.ends_with('"') && value.len() >= 2)
            || (value.starts_with('\'') && value.ends_with('\'') && value.len() >= 2)
        {
            value = &value[1..value.len() - 1];
        }
        return Some(value.to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_env_value_parsing() {
        let content = "# comment\n\nOTHER=1\nGOOGLE_API_KEY=\"abc-123\"\n";
        assert_eq!(env_value(content, "GOOGLE_API_KEY"), Some("abc-123".to_string()));

        let unquoted = "GOOGLE_API_KEY= plain ";
        assert_eq!(env_value(unquoted, "GOOGLE_API_KEY"), Some("plain".to_string()));

        assert_eq!(env_value("# nothing here", "GOOGLE_API_KEY"), None);
    }

    #[test]
    fn test_config_defaults() {
        let args = CommandArgs {
            base_url: None,
            out_dir: None,
            config_path: None,
            force: false,
        };
        let config = Config::resolve(&args).unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.out_dir, DEFAULT_OUT_DIR);
        assert_eq!(config.poll_interval_secs, 30);
        assert!(!config.force_cache);
    }

    #[test]
    fn test_cli_overrides_file_defaults() {
        let args = CommandArgs {
            base_url: Some("http://localhost:8080".to_string()),
            out_dir: Some("out".to_string()),
            config_path: None,
            force: true,
        };
        let config = Config::resolve(&args).unwrap();

        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.out_dir, "out");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = CommandArgs {
            base_url: None,
            out_dir: None,
            config_path: Some("does-not-exist.yaml".to_string()),
            force: false,
        };
        assert!(matches!(
            Config::resolve(&args),
            Err(Error::InvalidFilePath(_))
        ));
    }
}
