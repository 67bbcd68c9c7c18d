//! Configuration management for criteria

use lazy_static::lazy_static;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CriterionError, CriterionResult};
use crate::nn::criterion::ScratchPolicy;
use crate::tensor::DEFAULT_PARALLEL_THRESHOLD;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LossConfig {
    /// Width of the quadratic region is `1 / sigma²`
    pub sigma: f64,
    /// Fixed normalizer; `<= 0` normalizes by batch size
    pub num: i64,
    pub scratch: ScratchPolicy,
}

impl Default for LossConfig {
    fn default() -> Self {
        Self {
            sigma: 1.0,
            num: 0,
            scratch: ScratchPolicy::Reuse,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Buffers at least this long use the rayon path (`parallel` feature)
    pub parallel_threshold: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevelopmentConfig {
    pub verbose_logging: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriterionConfig {
    pub loss: LossConfig,
    pub performance: PerformanceConfig,
    pub development: DevelopmentConfig,
}

impl CriterionConfig {
    pub fn validate(&self) -> CriterionResult<()> {
        if !self.loss.sigma.is_finite() || self.loss.sigma <= 0.0 {
            return Err(CriterionError::configuration(format!(
                "loss.sigma must be a positive finite number, got {}",
                self.loss.sigma
            )));
        }
        if self.performance.parallel_threshold == 0 {
            return Err(CriterionError::configuration(
                "performance.parallel_threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Configuration manager backed by an optional JSON file
pub struct ConfigManager {
    config: Arc<RwLock<CriterionConfig>>,
    config_file: Option<PathBuf>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(CriterionConfig::default())),
            config_file: None,
        }
    }

    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    pub fn load_from_file(&mut self, path: &Path) -> CriterionResult<()> {
        let content = std::fs::read_to_string(path)?;
        let config: CriterionConfig = serde_json::from_str(&content)?;
        config.validate()?;

        *self.config.write() = config;
        self.config_file = Some(path.to_path_buf());

        tracing::info!("Configuration loaded from {:?}", path);
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> CriterionResult<()> {
        let content = serde_json::to_string_pretty(&*self.config.read())?;
        std::fs::write(path, content)?;

        tracing::info!("Configuration saved to {:?}", path);
        Ok(())
    }

    pub fn get_config(&self) -> CriterionConfig {
        self.config.read().clone()
    }

    /// Apply `f`, keeping the previous configuration if the result is invalid.
    pub fn update_config<F>(&mut self, f: F) -> CriterionResult<()>
    where
        F: FnOnce(&mut CriterionConfig),
    {
        let mut candidate = self.get_config();
        f(&mut candidate);
        candidate.validate()?;
        *self.config.write() = candidate;

        // Save to file if configured
        if let Some(ref path) = self.config_file {
            self.save_to_file(path)?;
        }

        Ok(())
    }
}

/// Global configuration instance
lazy_static! {
    static ref CONFIG_MANAGER: RwLock<ConfigManager> = RwLock::new(ConfigManager::new());
}

/// Get the global configuration
pub fn get_config() -> CriterionConfig {
    CONFIG_MANAGER.read().get_config()
}

/// Update the global configuration
pub fn update_config<F>(f: F) -> CriterionResult<()>
where
    F: FnOnce(&mut CriterionConfig),
{
    CONFIG_MANAGER.write().update_config(f)
}

/// Load the global configuration from file
pub fn load_config_from_file(path: &Path) -> CriterionResult<()> {
    CONFIG_MANAGER.write().load_from_file(path)
}

/// Create a configuration builder for easy setup
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: CriterionConfig,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loss(mut self, f: impl FnOnce(&mut LossConfig)) -> Self {
        f(&mut self.config.loss);
        self
    }

    pub fn performance(mut self, f: impl FnOnce(&mut PerformanceConfig)) -> Self {
        f(&mut self.config.performance);
        self
    }

    pub fn development(mut self, f: impl FnOnce(&mut DevelopmentConfig)) -> Self {
        f(&mut self.config.development);
        self
    }

    pub fn build(self) -> CriterionConfig {
        self.config
    }

    pub fn apply(self) -> CriterionResult<()> {
        update_config(|config| *config = self.config)
    }
}
