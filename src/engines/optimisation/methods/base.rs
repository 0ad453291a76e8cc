use crate::engines::evaluation::BacktestEngine;
use crate::engines::optimisation::OptimizationResult;
use crate::error::Result;
use crate::functions::StrategyDescriptor;
use polars::prelude::*;

/// One symbol's series handed to an optimizer.
#[derive(Clone, Copy)]
pub struct OptimizationJob<'a> {
    pub symbol: &'a str,
    pub strategy: &'a StrategyDescriptor,
    pub data: &'a DataFrame,
    pub engine: &'a dyn BacktestEngine,
}

impl<'a> OptimizationJob<'a> {
    pub fn new(
        symbol: &'a str,
        strategy: &'a StrategyDescriptor,
        data: &'a DataFrame,
        engine: &'a dyn BacktestEngine,
    ) -> Self {
        Self { symbol, strategy, data, engine }
    }

    /// Same job over a different slice of data.
    pub fn with_data(&self, data: &'a DataFrame) -> Self {
        Self { data, ..*self }
    }

    /// Same job with a different strategy configuration.
    pub fn with_strategy(&self, strategy: &'a StrategyDescriptor) -> Self {
        Self { strategy, ..*self }
    }
}

pub trait OptimizationMethod: Send + Sync {
    fn name(&self) -> &str;

    /// Best record for the job's symbol.
    fn optimize(&self, job: &OptimizationJob<'_>) -> Result<OptimizationResult>;
}
