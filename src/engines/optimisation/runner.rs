//! Multi-symbol, multi-strategy orchestration.

use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::methods::{
    validate_chunk_size, BayesianOptimizer, ChunkedOptimizer, GridSearchOptimizer, OptimizationJob,
    OptimizationMethod, SequentialOptimizer,
};
use super::{OptimizationResult, ParameterSpace, ResultList};
use crate::config::{OptimizerConfig, SearchMethod};
use crate::data::{DataSource, DateWindow};
use crate::engines::evaluation::BacktestEngine;
use crate::engines::metrics::is_known_statistic;
use crate::error::{Result, StockfilterError};
use crate::functions::StrategyDescriptor;
use crate::types::Assignment;
use polars::prelude::*;

/// What a strategy is run with.
#[derive(Debug, Clone)]
pub enum SearchPlan {
    /// Parameters for a plain backtest, merged over the strategy defaults.
    Fixed(Assignment),
    Space(ParameterSpace),
    /// Ordered stages for sequential optimization.
    Stages(Vec<ParameterSpace>),
}

impl SearchPlan {
    fn spaces(&self) -> Vec<&ParameterSpace> {
        match self {
            Self::Fixed(_) => Vec::new(),
            Self::Space(space) => vec![space],
            Self::Stages(stages) => stages.iter().collect(),
        }
    }
}

enum Execution {
    /// One record per symbol.
    PerSymbol(SymbolRun),
    /// One aggregated record across every symbol.
    Batch(BayesianOptimizer),
}

enum SymbolRun {
    Backtest(Assignment),
    Search(Arc<dyn OptimizationMethod>),
}

pub struct OptimizationRunner {
    symbols: Vec<String>,
    jobs: Vec<(StrategyDescriptor, Execution)>,
    data_source: Arc<dyn DataSource>,
    engine: Arc<dyn BacktestEngine>,
    config: OptimizerConfig,
}

impl OptimizationRunner {
    /// Every configuration check happens here, before any data is touched.
    /// With no plans, each strategy's own defaults and optimizer space are used.
    pub fn new(
        symbols: Vec<String>,
        strategies: Vec<StrategyDescriptor>,
        plans: Vec<SearchPlan>,
        data_source: Arc<dyn DataSource>,
        engine: Arc<dyn BacktestEngine>,
        config: OptimizerConfig,
    ) -> Result<Self> {
        if !plans.is_empty() && plans.len() != strategies.len() {
            return Err(StockfilterError::Configuration(format!(
                "Mismatch between strategies ({}) and parameter plans ({})",
                strategies.len(),
                plans.len()
            )));
        }

        let plans = if plans.is_empty() {
            strategies.iter().map(|s| default_plan(s, config.method)).collect()
        } else {
            plans
        };

        let mut jobs = Vec::with_capacity(strategies.len());
        for (strategy, plan) in strategies.into_iter().zip(plans) {
            let plan = with_objective(plan, config.objective.as_deref());
            validate_objectives(plan.spaces())?;
            if let Some(chunk_size) = config.chunk_size {
                validate_chunk_size(plan.spaces(), chunk_size)?;
            }
            let execution = build_execution(strategy.name(), plan, &config)?;
            jobs.push((strategy, execution));
        }

        Ok(Self { symbols, jobs, data_source, engine, config })
    }

    pub fn method(&self) -> SearchMethod {
        self.config.method
    }

    pub fn run(&self, window: &DateWindow) -> Result<ResultList> {
        let mut results = ResultList::new();

        for (strategy, execution) in &self.jobs {
            log::info!("Starting {:?} run for {}", self.config.method, strategy.name());
            let before = results.len();

            match execution {
                Execution::Batch(optimizer) => {
                    let datasets = self.load_all(window)?;
                    match optimizer.optimize_batch(strategy, &datasets, self.engine.as_ref()) {
                        Ok(result) => results.push(result),
                        Err(e) if e.is_recoverable() => {
                            log::warn!("No result for {}: {}", strategy.name(), e)
                        }
                        Err(e) => return Err(e),
                    }
                }
                Execution::PerSymbol(symbol_run) => {
                    // all symbols finish before results are collected
                    let outcomes: Vec<(&String, Result<Option<OptimizationResult>>)> = if self.config.parallel {
                        self.symbols
                            .par_iter()
                            .map(|symbol| (symbol, self.run_symbol(strategy, symbol_run, symbol, window)))
                            .collect()
                    } else {
                        self.symbols
                            .iter()
                            .map(|symbol| (symbol, self.run_symbol(strategy, symbol_run, symbol, window)))
                            .collect()
                    };

                    for (symbol, outcome) in outcomes {
                        match outcome {
                            Ok(Some(result)) => results.push(result),
                            Ok(None) => {}
                            Err(e) if e.is_recoverable() => log::warn!("Skipping {}: {}", symbol, e),
                            Err(e) => return Err(e),
                        }
                    }
                }
            }

            for result in results.iter().skip(before) {
                log::info!(
                    "{} {}: {} earnings {:.2}% sqn {:.4}",
                    result.symbol,
                    result.strategy,
                    result.parameters,
                    result.earnings,
                    result.score
                );
            }
        }

        Ok(results)
    }

    fn run_symbol(
        &self,
        strategy: &StrategyDescriptor,
        symbol_run: &SymbolRun,
        symbol: &str,
        window: &DateWindow,
    ) -> Result<Option<OptimizationResult>> {
        log::debug!("Processing {}", symbol);
        let Some(df) = self.load(symbol, window)? else {
            return Ok(None);
        };

        let result = match symbol_run {
            SymbolRun::Backtest(parameters) => {
                let start = Instant::now();
                let stats = self.engine.run(&strategy.with_parameters(parameters), &df)?;
                OptimizationResult::from_stats(symbol, &stats, start.elapsed().as_secs_f64())
            }
            SymbolRun::Search(method) => {
                method.optimize(&OptimizationJob::new(symbol, strategy, &df, self.engine.as_ref()))?
            }
        };
        Ok(Some(result))
    }

    /// `None` for an empty series.
    fn load(&self, symbol: &str, window: &DateWindow) -> Result<Option<DataFrame>> {
        let df = self.data_source.get_stock_data(symbol, window)?;
        if df.height() == 0 {
            log::warn!("Empty dataframe for {}", symbol);
            return Ok(None);
        }
        Ok(Some(df))
    }

    fn load_all(&self, window: &DateWindow) -> Result<Vec<(String, DataFrame)>> {
        let mut datasets = Vec::with_capacity(self.symbols.len());
        for symbol in &self.symbols {
            match self.load(symbol, window) {
                Ok(Some(df)) => datasets.push((symbol.clone(), df)),
                Ok(None) => {}
                Err(e) if e.is_recoverable() => log::warn!("Skipping {}: {}", symbol, e),
                Err(e) => return Err(e),
            }
        }
        Ok(datasets)
    }
}

fn default_plan(strategy: &StrategyDescriptor, method: SearchMethod) -> SearchPlan {
    match method {
        SearchMethod::Backtest => SearchPlan::Fixed(Assignment::new()),
        SearchMethod::Grid | SearchMethod::Bayesian => {
            SearchPlan::Space(strategy.optimizer_parameters().clone())
        }
        SearchMethod::Sequential => SearchPlan::Stages(vec![strategy.optimizer_parameters().clone()]),
    }
}

/// Objective names are checked before any evaluation; a statistic that one
/// candidate leaves undefined is handled per candidate by the search.
fn validate_objectives(spaces: Vec<&ParameterSpace>) -> Result<()> {
    for space in spaces {
        let objective = space.objective_or_default();
        if !is_known_statistic(objective) {
            return Err(StockfilterError::Configuration(format!(
                "Unknown objective statistic '{}'",
                objective
            )));
        }
    }
    Ok(())
}

/// Spaces without their own objective take the configured one.
fn with_objective(plan: SearchPlan, objective: Option<&str>) -> SearchPlan {
    let Some(objective) = objective else {
        return plan;
    };
    let apply = |space: ParameterSpace| {
        if space.objective().is_some() {
            space
        } else {
            space.with_objective(objective)
        }
    };
    match plan {
        SearchPlan::Fixed(a) => SearchPlan::Fixed(a),
        SearchPlan::Space(space) => SearchPlan::Space(apply(space)),
        SearchPlan::Stages(stages) => SearchPlan::Stages(stages.into_iter().map(apply).collect()),
    }
}

fn build_execution(strategy: &str, plan: SearchPlan, config: &OptimizerConfig) -> Result<Execution> {
    let mismatch = || {
        StockfilterError::Configuration(format!(
            "{:?} runs cannot use the plan given for {}",
            config.method, strategy
        ))
    };

    let method: Arc<dyn OptimizationMethod> = match (config.method, plan) {
        (SearchMethod::Backtest, SearchPlan::Fixed(parameters)) => {
            if config.chunk_size.is_some() {
                return Err(StockfilterError::Configuration("Plain backtests cannot be chunked".to_string()));
            }
            return Ok(Execution::PerSymbol(SymbolRun::Backtest(parameters)));
        }
        (SearchMethod::Bayesian, SearchPlan::Space(space)) => {
            let optimizer = BayesianOptimizer::from_config(space, config);
            optimizer.space().validate()?;
            optimizer.space().dimensions()?;
            // unchunked runs aggregate every symbol; chunked runs search per symbol
            if config.chunk_size.is_none() {
                return Ok(Execution::Batch(optimizer));
            }
            Arc::new(optimizer)
        }
        (SearchMethod::Grid, SearchPlan::Space(space)) => {
            space.validate()?;
            Arc::new(GridSearchOptimizer::new(space))
        }
        (SearchMethod::Sequential, SearchPlan::Stages(stages)) => Arc::new(SequentialOptimizer::new(stages)?),
        (SearchMethod::Sequential, SearchPlan::Space(space)) => Arc::new(SequentialOptimizer::new(vec![space])?),
        _ => return Err(mismatch()),
    };

    match config.chunk_size {
        Some(chunk_size) => Ok(Execution::PerSymbol(SymbolRun::Search(Arc::new(
            ChunkedOptimizer::new(method, chunk_size)?.with_parallel(config.parallel),
        )))),
        None => Ok(Execution::PerSymbol(SymbolRun::Search(method))),
    }
}
