#![allow(dead_code)]

use polars::df;
use polars::prelude::DataFrame;
use std::sync::Arc;

use stockfilter::config::BacktestingConfig;
use stockfilter::data::MemoizationCache;
use stockfilter::engines::evaluation::Backtester;
use stockfilter::engines::optimisation::{Domain, ParameterSpace};
use stockfilter::functions::indicators::SMA;
use stockfilter::functions::primitives::crossover;
use stockfilter::functions::{Indicator, StrategyDescriptor};

pub const DAY_MS: i64 = 86_400_000;

/// Upward drift with a slow oscillation so moving-average strategies trade.
pub fn rising_close(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.3 * t + 4.0 * (t * 0.35).sin()
        })
        .collect()
}

pub fn price_frame(close: &[f64]) -> DataFrame {
    let timestamp: Vec<i64> = (0..close.len() as i64).map(|i| 1_577_836_800_000 + i * DAY_MS).collect();
    let open: Vec<f64> = close
        .iter()
        .enumerate()
        .map(|(i, c)| if i == 0 { *c } else { (c + close[i - 1]) / 2.0 })
        .collect();
    df! {
        "timestamp" => timestamp,
        "open" => open,
        "close" => close.to_vec(),
    }
    .unwrap()
}

/// Close crossing an SMA of `para_x` bars.
pub fn sma_strategy() -> StrategyDescriptor {
    StrategyDescriptor::new(
        "SmaX",
        |f, i| crossover(f.series("close"), f.series("sma"), i),
        |f, i| crossover(f.series("sma"), f.series("close"), i),
    )
    .with_default("para_x", 5)
    .with_space(ParameterSpace::new().with_param("para_x", Domain::range(2, 10)))
    .with_indicator("sma", |bars, params, cache| {
        SMA::new(params.get_usize("para_x")?).calculate_cached(&bars.close, cache)
    })
}

pub fn backtester() -> Backtester {
    Backtester::new(BacktestingConfig::default(), Arc::new(MemoizationCache::new(100)))
}

/// Like [`sma_strategy`] but `para_x == 2` yields an undefined level, so that
/// candidate never trades.
pub fn gated_sma_strategy() -> StrategyDescriptor {
    StrategyDescriptor::new(
        "GatedSma",
        |f, i| crossover(f.series("close"), f.series("sma"), i),
        |f, i| crossover(f.series("sma"), f.series("close"), i),
    )
    .with_default("para_x", 5)
    .with_indicator("sma", |bars, params, cache| match params.get_usize("para_x")? {
        2 => Ok(vec![f64::NAN; bars.len()]),
        x => SMA::new(x).calculate_cached(&bars.close, cache),
    })
}
