use super::{quality, ProfitabilityMetrics, RiskMetrics};
use crate::types::{Assignment, Signal, Trade};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every statistic name a run can report. Some are only defined for runs
/// with trades (or with a losing trade), so a known name may still be missing
/// from a particular [`BacktestStats`].
pub const STATISTICS: [&str; 16] = [
    "avg_loss",
    "avg_trade_pct",
    "avg_win",
    "equity_final",
    "fees",
    "max_drawdown_pct",
    "net_profit",
    "net_profit_pct",
    "num_trades",
    "profit_factor",
    "return_pct",
    "sharpe_ratio",
    "sortino_ratio",
    "sqn",
    "volatility",
    "win_rate",
];

pub fn is_known_statistic(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    STATISTICS.contains(&name.as_str())
}

/// Summary of one backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestStats {
    pub strategy: String,
    pub parameters: Assignment,
    pub status: Signal,
    pub return_pct: f64,
    pub sqn: f64,
    pub equity_final: f64,
    pub num_trades: usize,
    pub win_rate: f64,
    pub max_drawdown_pct: f64,
    pub profit_factor: Option<f64>,
    /// Every computed statistic by name, including the fields above.
    pub metrics: BTreeMap<String, f64>,
    #[serde(skip)]
    pub trades: Vec<Trade>,
}

impl BacktestStats {
    /// Named statistic lookup, case-insensitive.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(&name.to_ascii_lowercase()).copied()
    }
}

pub struct MetricsEngine {
    initial_balance: f64,
}

impl MetricsEngine {
    pub fn new(initial_balance: f64) -> Self {
        Self { initial_balance }
    }

    pub fn calculate_all(&self, trades: &[Trade], equity_curve: &[f64]) -> BTreeMap<String, f64> {
        let mut all_metrics = BTreeMap::new();

        all_metrics.extend(ProfitabilityMetrics::calculate(trades, self.initial_balance));
        all_metrics.extend(RiskMetrics::calculate(equity_curve));

        let equity_final = equity_curve.last().copied().unwrap_or(self.initial_balance);
        let return_pct = (equity_final - self.initial_balance) / self.initial_balance * 100.0;

        all_metrics.insert("return_pct".to_string(), return_pct);
        all_metrics.insert("equity_final".to_string(), equity_final);
        all_metrics.insert("num_trades".to_string(), trades.len() as f64);
        all_metrics.insert("sqn".to_string(), quality::sqn(trades));
        all_metrics.entry("win_rate".to_string()).or_insert(0.0);
        all_metrics.entry("max_drawdown_pct".to_string()).or_insert(0.0);

        all_metrics
    }

    pub fn stats(
        &self,
        strategy: &str,
        parameters: &Assignment,
        status: Signal,
        trades: Vec<Trade>,
        equity_curve: &[f64],
    ) -> BacktestStats {
        let metrics = self.calculate_all(&trades, equity_curve);
        let get = |name: &str| metrics.get(name).copied().unwrap_or(0.0);

        BacktestStats {
            strategy: strategy.to_string(),
            parameters: parameters.clone(),
            status,
            return_pct: get("return_pct"),
            sqn: get("sqn"),
            equity_final: get("equity_final"),
            num_trades: trades.len(),
            win_rate: get("win_rate"),
            max_drawdown_pct: get("max_drawdown_pct"),
            profit_factor: metrics.get("profit_factor").copied(),
            metrics,
            trades,
        }
    }
}
