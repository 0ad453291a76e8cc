use thiserror::Error;

#[derive(Error, Debug)]
pub enum StockfilterError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Backtest error: {0}")]
    Backtest(String),

    #[error("No feasible assignment: {0}")]
    NoFeasibleAssignment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl StockfilterError {
    /// Data, evaluation and exhaustion failures are handled locally by the
    /// optimizers (skip with a warning or penalize). Everything else aborts.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DataLoading(_)
                | Self::NotFound(_)
                | Self::Validation(_)
                | Self::Computation(_)
                | Self::Backtest(_)
                | Self::NoFeasibleAssignment(_)
                | Self::Polars(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StockfilterError>;
