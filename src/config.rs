use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{AccessionPrefixes, DecoyPolicy, MalformedRowPolicy};
use crate::error::PsmError;
use crate::parser::{ColumnLayout, DEFAULT_Q_VALUE_CUTOFF, ParserSettings};

pub const CONFIG_FILE_NAME: &str = "psm-organism.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub q_value_cutoff: Option<f64>,
    #[serde(default)]
    pub contaminant_prefix: Option<String>,
    #[serde(default)]
    pub decoy_prefix: Option<String>,
    #[serde(default)]
    pub decoy_policy: Option<DecoyPolicy>,
    #[serde(default)]
    pub malformed_row_policy: Option<MalformedRowPolicy>,
    #[serde(default)]
    pub columns: Option<ColumnLayout>,
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub q_value_cutoff: Option<f64>,
    pub decoy_policy: Option<DecoyPolicy>,
    pub malformed_row_policy: Option<MalformedRowPolicy>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedConfig {
    pub parser: ParserSettings,
    pub malformed_row_policy: MalformedRowPolicy,
    pub source: Option<PathBuf>,
}

impl ResolvedConfig {
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, PsmError> {
        if let Some(cutoff) = overrides.q_value_cutoff {
            self.parser.q_value_cutoff = cutoff;
        }
        if let Some(policy) = overrides.decoy_policy {
            self.parser.decoy_policy = policy;
        }
        if let Some(policy) = overrides.malformed_row_policy {
            self.malformed_row_policy = policy;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PsmError> {
        let cutoff = self.parser.q_value_cutoff;
        if !cutoff.is_finite() || cutoff < 0.0 {
            return Err(PsmError::InvalidConfig(format!(
                "q-value cutoff must be a finite, non-negative number (got {cutoff})"
            )));
        }
        if self.parser.prefixes.contaminant.is_empty() {
            return Err(PsmError::InvalidConfig(
                "contaminant prefix must not be empty".to_string(),
            ));
        }
        if self.parser.prefixes.decoy.is_empty() {
            return Err(PsmError::InvalidConfig(
                "decoy prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves configuration from an explicit path, `psm-organism.json` in
    /// the working directory, or the user config directory, falling back to
    /// built-in defaults when none exists.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, PsmError> {
        let config_path = match path {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::discover(),
        };
        let Some(config_path) = config_path else {
            return Ok(ResolvedConfig::default());
        };

        let content = fs::read_to_string(&config_path)
            .map_err(|_| PsmError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| PsmError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        resolved.source = Some(config_path);
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, PsmError> {
        let defaults = AccessionPrefixes::default();
        let resolved = ResolvedConfig {
            parser: ParserSettings {
                q_value_cutoff: config.q_value_cutoff.unwrap_or(DEFAULT_Q_VALUE_CUTOFF),
                prefixes: AccessionPrefixes {
                    contaminant: config.contaminant_prefix.unwrap_or(defaults.contaminant),
                    decoy: config.decoy_prefix.unwrap_or(defaults.decoy),
                },
                decoy_policy: config.decoy_policy.unwrap_or_default(),
                columns: config.columns.unwrap_or_default(),
            },
            malformed_row_policy: config.malformed_row_policy.unwrap_or_default(),
            source: None,
        };
        resolved.validate()?;
        Ok(resolved)
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.is_file() {
            return Some(local);
        }
        BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("psm-organism").join("config.json"))
            .filter(|path| path.is_file())
    }
}
