//! Built-in strategies.

use super::indicators::{EMA, RSI, SMA};
use super::primitives::{cross, crossover, threshold};
use super::strategy::StrategyDescriptor;
use super::traits::Indicator;
use crate::engines::optimisation::{Domain, ParameterSpace};

pub const EMA_CROSS_CLOSE: &str = "EmaCrossCloseStrategy";
pub const SMA_CROSS_CLOSE: &str = "SmaCrossCloseStrategy";
pub const SMA_CROSS_SMA: &str = "SmaCrossSmaStrategy";
pub const RSI_STRATEGY: &str = "RsiStrategy";

/// Long when close crosses above its EMA, flat when they cross back.
pub fn ema_cross_close() -> StrategyDescriptor {
    StrategyDescriptor::new(
        EMA_CROSS_CLOSE,
        |f, i| crossover(f.series("close"), f.series("ema_short"), i),
        |f, i| cross(f.series("ema_short"), f.series("close"), i),
    )
    .with_default("para_ema_short", 14)
    .with_space(
        ParameterSpace::new()
            .with_param("para_ema_short", Domain::range(2, 50))
            .with_constraint(|p| p.get_i64("para_ema_short").map_or(false, |v| v > 0)),
    )
    .with_indicator("ema_short", |bars, params, cache| {
        EMA::new(params.get_usize("para_ema_short")?).calculate_cached(&bars.close, cache)
    })
}

pub fn sma_cross_close() -> StrategyDescriptor {
    StrategyDescriptor::new(
        SMA_CROSS_CLOSE,
        |f, i| crossover(f.series("close"), f.series("sma_short"), i),
        |f, i| cross(f.series("close"), f.series("sma_short"), i),
    )
    .with_default("para_sma_short", 14)
    .with_space(
        ParameterSpace::new()
            .with_param("para_sma_short", Domain::range(5, 50))
            .with_constraint(|p| p.get_i64("para_sma_short").map_or(false, |v| v > 2)),
    )
    .with_indicator("sma_short", |bars, params, cache| {
        SMA::new(params.get_usize("para_sma_short")?).calculate_cached(&bars.close, cache)
    })
}

/// Two SMAs; the long one must exceed the short one by more than ten bars.
pub fn sma_cross_sma() -> StrategyDescriptor {
    StrategyDescriptor::new(
        SMA_CROSS_SMA,
        |f, i| crossover(f.series("sma_long"), f.series("sma_short"), i),
        |f, i| cross(f.series("sma_short"), f.series("sma_long"), i),
    )
    .with_default("para_sma_short", 14)
    .with_default("para_sma_long", 50)
    .with_space(
        ParameterSpace::new()
            .with_param("para_sma_short", Domain::range(5, 30))
            .with_param("para_sma_long", Domain::range(30, 100))
            .with_constraint(|p| match (p.get_i64("para_sma_short"), p.get_i64("para_sma_long")) {
                (Ok(short), Ok(long)) => long > short && long - short > 10,
                _ => false,
            }),
    )
    .with_indicator("sma_short", |bars, params, cache| {
        SMA::new(params.get_usize("para_sma_short")?).calculate_cached(&bars.close, cache)
    })
    .with_indicator("sma_long", |bars, params, cache| {
        SMA::new(params.get_usize("para_sma_long")?).calculate_cached(&bars.close, cache)
    })
}

/// Enters when RSI falls through the enter band, exits when it rises
/// through the exit band.
pub fn rsi() -> StrategyDescriptor {
    StrategyDescriptor::new(
        RSI_STRATEGY,
        |f, i| crossover(f.series("rsi_enter"), f.series("rsi"), i),
        |f, i| crossover(f.series("rsi"), f.series("rsi_exit"), i),
    )
    .with_default("para_rsi_window", 14)
    .with_default("para_rsi_enter", 30)
    .with_default("para_rsi_exit", 70)
    .with_space(
        ParameterSpace::new()
            .with_param("para_rsi_window", Domain::range(14, 100))
            .with_param("para_rsi_enter", Domain::range(10, 50))
            .with_param("para_rsi_exit", Domain::range(50, 90))
            .with_constraint(|p| match (p.get_i64("para_rsi_enter"), p.get_i64("para_rsi_exit")) {
                (Ok(enter), Ok(exit)) => enter < exit,
                _ => false,
            }),
    )
    .with_indicator("rsi", |bars, params, cache| {
        RSI::new(params.get_usize("para_rsi_window")?).calculate_cached(&bars.close, cache)
    })
    .with_indicator("rsi_enter", |bars, params, _cache| {
        Ok(threshold(params.get_f64("para_rsi_enter")?, bars.len()))
    })
    .with_indicator("rsi_exit", |bars, params, _cache| {
        Ok(threshold(params.get_f64("para_rsi_exit")?, bars.len()))
    })
}
