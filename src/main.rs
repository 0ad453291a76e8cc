use anyhow::{Context, Result};
use std::sync::Arc;

use stockfilter::config::ConfigManager;
use stockfilter::data::{DateWindow, LocalDataSource, MemoizationCache};
use stockfilter::engines::evaluation::Backtester;
use stockfilter::engines::optimisation::OptimizationRunner;
use stockfilter::functions::StrategyRegistry;

fn main() -> Result<()> {
    env_logger::init();

    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager
            .load_from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?;
    }
    let config = manager.get();

    if config.data.symbols.is_empty() {
        log::warn!("No symbols configured; nothing to do");
        return Ok(());
    }

    let registry = StrategyRegistry::new();
    let names: Vec<String> = if config.data.strategies.is_empty() {
        registry.names().into_iter().map(String::from).collect()
    } else {
        config.data.strategies.clone()
    };
    let strategies = names
        .iter()
        .map(|name| registry.get(name))
        .collect::<stockfilter::Result<Vec<_>>>()?;

    let cache = Arc::new(if config.cache.enabled {
        MemoizationCache::new(config.cache.capacity)
    } else {
        MemoizationCache::disabled()
    });
    let engine = Arc::new(Backtester::new(config.backtesting.clone(), cache));
    let source = Arc::new(LocalDataSource::new(config.data.source_dir.clone()));

    let runner = OptimizationRunner::new(
        config.data.symbols.clone(),
        strategies,
        Vec::new(),
        source,
        engine,
        config.optimizer.clone(),
    )?;
    let results = runner.run(&DateWindow::last_months(config.data.history_months))?;

    match &config.data.results_file {
        Some(path) => results
            .dump_optimization_results(path, true, true)
            .with_context(|| format!("writing results to {}", path.display()))?,
        None => println!("{}", results.to_json()?),
    }

    Ok(())
}
