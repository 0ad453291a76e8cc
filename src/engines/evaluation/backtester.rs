use crate::{
    config::BacktestingConfig,
    data::{frame::PriceBars, MemoizationCache},
    engines::{
        evaluation::Portfolio,
        metrics::{is_known_statistic, BacktestStats, MetricsEngine},
        optimisation::{methods::grid::exhaustive_search, ParameterSpace},
    },
    error::{Result, StockfilterError},
    functions::StrategyDescriptor,
    types::{ExitReason, Signal},
};
use polars::prelude::*;
use std::sync::Arc;

/// Turns a price frame and a configured strategy into performance statistics.
pub trait BacktestEngine: Send + Sync {
    fn run(&self, strategy: &StrategyDescriptor, data: &DataFrame) -> Result<BacktestStats>;

    /// Engine-side grid search maximising the space's objective statistic.
    fn optimize(
        &self,
        strategy: &StrategyDescriptor,
        data: &DataFrame,
        space: &ParameterSpace,
    ) -> Result<BacktestStats>;
}

pub struct Backtester {
    config: BacktestingConfig,
    cache: Arc<MemoizationCache>,
    metrics: MetricsEngine,
}

impl Backtester {
    pub fn new(config: BacktestingConfig, cache: Arc<MemoizationCache>) -> Self {
        Self {
            metrics: MetricsEngine::new(config.cash),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &BacktestingConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<MemoizationCache> {
        &self.cache
    }

    pub fn run_bars(&self, strategy: &StrategyDescriptor, bars: &PriceBars) -> Result<BacktestStats> {
        let n = bars.len();
        if n == 0 {
            return Err(StockfilterError::DataLoading("No price data to backtest".to_string()));
        }

        let run = strategy.signals(bars, &self.cache)?;
        let mut portfolio = Portfolio::new(self.config.cash, self.config.commission);
        let mut pending: Option<Signal> = None;

        for i in 0..n {
            // orders from the previous bar fill at this bar's open
            if let Some(order) = pending.take() {
                self.execute(&mut portfolio, order, i, bars.open[i])?;
            }

            match run.actions[i] {
                Signal::Hold => {}
                action if self.config.trade_on_close => self.execute(&mut portfolio, action, i, bars.close[i])?,
                action => pending = Some(action),
            }

            portfolio.mark(bars.close[i]);
        }

        if portfolio.is_long() {
            portfolio.close_position(n - 1, bars.close[n - 1], ExitReason::EndOfData)?;
            let cash = portfolio.cash;
            if let Some(last) = portfolio.equity_curve.last_mut() {
                *last = cash;
            }
        }

        let equity_curve = portfolio.get_equity_curve().to_vec();
        Ok(self.metrics.stats(
            strategy.name(),
            strategy.get_parameters(),
            run.status,
            portfolio.trades,
            &equity_curve,
        ))
    }

    fn execute(&self, portfolio: &mut Portfolio, order: Signal, bar: usize, price: f64) -> Result<()> {
        match order {
            Signal::Buy => {
                if portfolio.is_long() && self.config.exclusive_orders {
                    portfolio.close_position(bar, price, ExitReason::Signal)?;
                }
                portfolio.open_position(bar, price)
            }
            Signal::Sell => portfolio.close_position(bar, price, ExitReason::Signal),
            Signal::Hold => Ok(()),
        }
    }
}

impl BacktestEngine for Backtester {
    fn run(&self, strategy: &StrategyDescriptor, data: &DataFrame) -> Result<BacktestStats> {
        let bars = PriceBars::from_frame(data)?;
        self.run_bars(strategy, &bars)
    }

    fn optimize(
        &self,
        strategy: &StrategyDescriptor,
        data: &DataFrame,
        space: &ParameterSpace,
    ) -> Result<BacktestStats> {
        let objective = space.objective_or_default();
        if !is_known_statistic(objective) {
            return Err(StockfilterError::Configuration(format!(
                "Unknown objective statistic '{}'",
                objective
            )));
        }
        let bars = PriceBars::from_frame(data)?;

        // a run that leaves the statistic undefined (no trades, no losses) is excluded
        let best = exhaustive_search(space, |assignment| {
            let stats = self.run_bars(&strategy.with_parameters(assignment), &bars)?;
            let score = stats.metric(objective).ok_or_else(|| {
                StockfilterError::Computation(format!("{} leaves {} undefined", assignment, objective))
            })?;
            Ok((score, stats))
        })?;

        log::debug!(
            "{} engine optimum {} = {:.4} at {}",
            strategy.name(),
            objective,
            best.score,
            best.assignment
        );
        Ok(best.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::primitives::crossover;
    use polars::df;

    fn breakout() -> StrategyDescriptor {
        StrategyDescriptor::new(
            "Breakout",
            |f, i| crossover(f.series("close"), f.series("level"), i),
            |f, i| crossover(f.series("level"), f.series("close"), i),
        )
        .with_default("para_level", 101.5)
        .with_indicator("level", |bars, params, _| Ok(vec![params.get_f64("para_level")?; bars.len()]))
    }

    fn backtester(trade_on_close: bool) -> Backtester {
        let config = BacktestingConfig { commission: 0.0, trade_on_close, ..Default::default() };
        Backtester::new(config, Arc::new(MemoizationCache::new(16)))
    }

    #[test]
    fn test_backtester() {
        let df = df! {
            "open" => &[100.0, 100.5, 101.5, 102.5, 102.0, 101.0, 100.0, 99.0],
            "close" => &[100.0, 101.0, 102.0, 103.0, 101.0, 100.0, 99.0, 98.0],
        }
        .unwrap();

        let stats = backtester(true).run(&breakout(), &df).unwrap();
        assert_eq!(stats.num_trades, 1);
        let trade = &stats.trades[0];
        assert_eq!((trade.entry_bar, trade.exit_bar), (2, 4));
        assert_eq!((trade.entry_price, trade.exit_price), (102.0, 101.0));
        assert!(stats.return_pct < 0.0);
        assert_eq!(stats.parameters.get_f64("para_level").unwrap(), 101.5);

        let stats = backtester(false).run(&breakout(), &df).unwrap();
        let trade = &stats.trades[0];
        assert_eq!((trade.entry_bar, trade.exit_bar), (3, 5));
        assert_eq!((trade.entry_price, trade.exit_price), (102.5, 101.0));
    }

    #[test]
    fn test_open_position_is_closed_at_end_of_data() {
        let df = df! { "close" => &[100.0, 101.0, 102.0, 104.0] }.unwrap();
        let stats = backtester(true).run(&breakout(), &df).unwrap();

        assert_eq!(stats.num_trades, 1);
        assert_eq!(stats.trades[0].exit_reason, ExitReason::EndOfData);
        assert!((stats.equity_final - 10_000.0 * 104.0 / 102.0).abs() < 1e-6);
        assert_eq!(stats.status, Signal::Hold);
    }

    #[test]
    fn test_empty_frame_is_a_data_error() {
        let df = df! { "close" => Vec::<f64>::new() }.unwrap();
        assert!(matches!(
            backtester(true).run(&breakout(), &df),
            Err(StockfilterError::DataLoading(_))
        ));
    }

    #[test]
    fn test_unknown_objective_is_fatal() {
        let df = df! { "close" => &[100.0, 101.0, 102.0, 104.0] }.unwrap();
        let space = ParameterSpace::new()
            .with_param("para_level", crate::engines::optimisation::Domain::discrete(vec![101.5]))
            .with_objective("alpha");
        assert!(matches!(
            backtester(true).optimize(&breakout(), &df, &space),
            Err(StockfilterError::Configuration(_))
        ));
    }

    #[test]
    fn test_candidate_without_the_statistic_is_excluded() {
        let df = df! {
            "open" => &[100.0, 100.5, 101.5, 102.5, 102.0, 101.0, 100.0, 99.0],
            "close" => &[100.0, 101.0, 102.0, 103.0, 101.0, 100.0, 99.0, 98.0],
        }
        .unwrap();
        let domain = |levels: Vec<f64>| crate::engines::optimisation::Domain::discrete(levels);

        // a level of 200 never trades, so profit_factor is undefined for it
        let space = ParameterSpace::new()
            .with_param("para_level", domain(vec![101.5, 200.0]))
            .with_objective("profit_factor");
        let stats = backtester(true).optimize(&breakout(), &df, &space).unwrap();
        assert_eq!(stats.parameters.get_f64("para_level").unwrap(), 101.5);

        let space = ParameterSpace::new()
            .with_param("para_level", domain(vec![200.0]))
            .with_objective("profit_factor");
        let err = backtester(true).optimize(&breakout(), &df, &space).unwrap_err();
        assert!(matches!(err, StockfilterError::NoFeasibleAssignment(_)));
        assert!(err.is_recoverable());
    }
}
