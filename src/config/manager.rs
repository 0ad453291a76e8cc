use super::{
    backtesting::BacktestingConfig,
    data::DataConfig,
    optimizer::{CacheConfig, OptimizerConfig},
    traits::ConfigSection,
};
use crate::error::StockfilterError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, RwLock};

/// Prefix for environment overrides, e.g. `STOCKFILTER__OPTIMIZER__CHUNK_SIZE=300`.
pub const ENV_PREFIX: &str = "STOCKFILTER";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backtesting: BacktestingConfig,
    pub optimizer: OptimizerConfig,
    pub cache: CacheConfig,
    pub data: DataConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), StockfilterError> {
        self.backtesting.validate()?;
        self.optimizer.validate()?;
        self.cache.validate()?;
        self.data.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML file, layer environment overrides on top and validate the result.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StockfilterError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StockfilterError::Configuration(format!(
                "Config file {} does not exist",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;

        *self.config.write().unwrap_or_else(|e| e.into_inner()) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), StockfilterError> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)?;

        std::fs::write(path, toml_str)
            .map_err(|e| StockfilterError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update<F>(&self, f: F) -> Result<(), StockfilterError>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(|e| e.into_inner());
        let mut candidate = config.clone();
        f(&mut candidate);
        candidate.validate()?;
        *config = candidate;
        Ok(())
    }
}
