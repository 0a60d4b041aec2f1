use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use model_tunnel_core::prelude::SetupError;
use model_tunnel_instruments::SamplerKind;

use crate::types::ModelTunnelResult;

/// Environment variable naming the configuration file, used when `--config` is not given.
pub const MT_CONFIG_ENV: &str = "MT_CONFIG";

/// Harness settings for one run, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub trials: usize,
    pub workers: usize,
    pub tiers: Vec<usize>,
    pub lookup_id: Option<String>,
    pub trial_timeout: Duration,
    pub sampler: SamplerKind,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            trials: 3,
            workers: 1,
            tiers: vec![1000],
            lookup_id: None,
            trial_timeout: Duration::from_secs(300),
            sampler: SamplerKind::default(),
        }
    }
}

impl HarnessConfig {
    pub(crate) fn apply(&mut self, overrides: HarnessOverrides) {
        if let Some(trials) = overrides.trials {
            self.trials = trials;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        if let Some(tiers) = overrides.tiers {
            self.tiers = tiers;
        }
        if overrides.lookup_id.is_some() {
            self.lookup_id = overrides.lookup_id;
        }
        if let Some(timeout) = overrides.trial_timeout_s {
            self.trial_timeout = Duration::from_secs(timeout);
        }
        if let Some(sampler) = overrides.sampler {
            self.sampler = sampler;
        }
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.trials == 0 {
            return Err(SetupError::Config("trials must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(SetupError::Config("workers must be at least 1".to_string()));
        }
        if self.tiers.is_empty() {
            return Err(SetupError::Config(
                "at least one data-size tier is required".to_string(),
            ));
        }
        if self.trial_timeout.is_zero() {
            return Err(SetupError::Config(
                "trial timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Values that replace parts of a [HarnessConfig], from a config file or the command line.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HarnessOverrides {
    pub trials: Option<usize>,
    pub workers: Option<usize>,
    pub tiers: Option<Vec<usize>>,
    pub lookup_id: Option<String>,
    pub trial_timeout_s: Option<u64>,
    pub sampler: Option<SamplerKind>,
}

/// The parsed configuration file.
#[derive(Debug, Default)]
pub(crate) struct ConfigFile {
    pub harness: HarnessOverrides,
    /// Every top level table other than `[harness]`, for hooks to read.
    pub sections: toml::Table,
}

/// Pick the configuration file from the command line, then the environment.
pub(crate) fn config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    cli_path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(MT_CONFIG_ENV).map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
}

pub(crate) fn load_config_file(path: &Path) -> ModelTunnelResult<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file {}", path.display()))
}

pub(crate) fn parse_config(content: &str) -> ModelTunnelResult<ConfigFile> {
    let mut sections: toml::Table = toml::from_str(content)?;

    let harness = match sections.remove("harness") {
        Some(value) => value
            .try_into::<HarnessOverrides>()
            .context("Failed to parse [harness] section")?,
        None => HarnessOverrides::default(),
    };

    Ok(ConfigFile { harness, sections })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file = parse_config(
            r#"
            [harness]
            trials = 5
            tiers = [100, 1000]
            sampler = "disabled"

            [stores]
            backend = "memory"
            "#,
        )
        .unwrap();

        let mut config = HarnessConfig::default();
        config.apply(file.harness);

        assert_eq!(5, config.trials);
        assert_eq!(1, config.workers);
        assert_eq!(vec![100, 1000], config.tiers);
        assert_eq!(SamplerKind::Disabled, config.sampler);
        assert!(file.sections.contains_key("stores"));
        assert!(!file.sections.contains_key("harness"));
    }

    #[test]
    fn later_overrides_win() {
        let mut config = HarnessConfig::default();
        config.apply(HarnessOverrides {
            workers: Some(5),
            lookup_id: Some("from-file".to_string()),
            ..Default::default()
        });
        config.apply(HarnessOverrides {
            lookup_id: Some("from-cli".to_string()),
            trial_timeout_s: Some(10),
            ..Default::default()
        });

        assert_eq!(5, config.workers);
        assert_eq!(Some("from-cli".to_string()), config.lookup_id);
        assert_eq!(Duration::from_secs(10), config.trial_timeout);
    }

    #[test]
    fn unknown_harness_keys_are_rejected() {
        assert!(parse_config("[harness]\nagents = 10\n").is_err());
    }

    #[test]
    fn validation_rejects_degenerate_values() {
        let valid = HarnessConfig::default();
        assert!(valid.validate().is_ok());

        for invalid in [
            HarnessConfig {
                trials: 0,
                ..valid.clone()
            },
            HarnessConfig {
                workers: 0,
                ..valid.clone()
            },
            HarnessConfig {
                tiers: vec![],
                ..valid.clone()
            },
            HarnessConfig {
                trial_timeout: Duration::ZERO,
                ..valid.clone()
            },
        ] {
            assert!(matches!(invalid.validate(), Err(SetupError::Config(_))));
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_file(&dir.path().join("missing.toml")).is_err());
    }
}
