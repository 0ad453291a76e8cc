use super::traits::ConfigSection;
use crate::error::StockfilterError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub source_dir: PathBuf,
    pub history_months: u32,
    pub symbols: Vec<String>,
    pub strategies: Vec<String>,
    pub results_file: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("data"),
            history_months: 6,
            symbols: Vec::new(),
            strategies: Vec::new(),
            results_file: None,
        }
    }
}

impl ConfigSection for DataConfig {
    fn section_name() -> &'static str {
        "data"
    }

    fn validate(&self) -> Result<(), StockfilterError> {
        if self.history_months == 0 {
            return Err(StockfilterError::Configuration(
                "History must cover at least one month".to_string()
            ));
        }
        Ok(())
    }
}
