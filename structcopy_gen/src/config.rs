use std::{fs, path::Path, str::FromStr};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::Deserialize;
use structcopy::{catalog::loader::DEFAULT_INTERFACE_NAME, generator::config::GeneratorConfig};

/// Environment variable overriding `log_level`.
pub const LOG_LEVEL_ENV: &str = "STRUCTCOPY_GEN_LOG_LEVEL";

/// `structcopy-gen` settings, read from an optional TOML file.
#[derive(Clone, PartialEq, Eq, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub log_level: String,
    /// Output is written to `<stem>.<output_suffix>.rs`.
    pub output_suffix: String,
    pub header: bool,
    pub interface_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            output_suffix: "gen".to_owned(),
            header: true,
            interface_name: DEFAULT_INTERFACE_NAME.to_owned(),
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("invalid configuration")
    }

    /// Reads the configuration file, if any, then applies the environment override.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Self::from_toml(&content).with_context(|| format!("in {}", path.display()))?
            }
            None => Self::default(),
        };
        Ok(config.with_log_level(std::env::var(LOG_LEVEL_ENV).ok()))
    }

    pub fn with_log_level(mut self, level: Option<String>) -> Self {
        if let Some(level) = level {
            self.log_level = level;
        }
        self
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .with_context(|| format!("invalid log level {:?}", self.log_level))
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig::new(self.header, self.interface_name.clone())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use pretty_assertions::assert_eq;
    use std::io::Write;

    use super::*;

    #[test]
    fn should_merge_file_over_defaults() {
        let config = AppConfig::from_toml(
            r#"
output_suffix = "copy"
header = false
"#,
        )
        .unwrap();
        assert_eq!(
            config,
            AppConfig {
                output_suffix: "copy".to_owned(),
                header: false,
                ..AppConfig::default()
            }
        );
        assert!(!config.generator_config().header);
    }

    #[test]
    fn should_reject_unknown_keys() {
        assert!(AppConfig::from_toml("verbose = true").is_err());
    }

    #[test]
    fn should_load_file_and_override_level() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"warn\"").unwrap();
        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(
            config.clone().with_log_level(None).level_filter().unwrap(),
            LevelFilter::Warn
        );
        assert_eq!(
            config
                .with_log_level(Some("trace".to_owned()))
                .level_filter()
                .unwrap(),
            LevelFilter::Trace
        );
    }

    #[test]
    fn should_reject_invalid_level() {
        let config = AppConfig::default().with_log_level(Some("loud".to_owned()));
        assert!(config.level_filter().is_err());
    }
}
