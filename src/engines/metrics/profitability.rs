use crate::types::Trade;
use std::collections::BTreeMap;

pub struct ProfitabilityMetrics;

impl ProfitabilityMetrics {
    pub fn calculate(trades: &[Trade], initial_balance: f64) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        if trades.is_empty() {
            return metrics;
        }

        let total_profit: f64 = trades.iter().map(|t| t.profit).sum();
        let winning_trades: Vec<&Trade> = trades.iter().filter(|t| t.profit > 0.0).collect();
        let losing_trades: Vec<&Trade> = trades.iter().filter(|t| t.profit <= 0.0).collect();

        metrics.insert("net_profit".to_string(), total_profit);
        metrics.insert("net_profit_pct".to_string(), total_profit / initial_balance * 100.0);

        let win_rate = (winning_trades.len() as f64 / trades.len() as f64) * 100.0;
        metrics.insert("win_rate".to_string(), win_rate);

        if !winning_trades.is_empty() {
            let avg_win: f64 = winning_trades.iter().map(|t| t.profit).sum::<f64>()
                / winning_trades.len() as f64;
            metrics.insert("avg_win".to_string(), avg_win);
        }

        if !losing_trades.is_empty() {
            let avg_loss: f64 = losing_trades.iter().map(|t| t.profit.abs()).sum::<f64>()
                / losing_trades.len() as f64;
            metrics.insert("avg_loss".to_string(), avg_loss);
        }

        let avg_trade_pct = trades.iter().map(|t| t.return_pct).sum::<f64>() / trades.len() as f64;
        metrics.insert("avg_trade_pct".to_string(), avg_trade_pct);

        // Only defined when something was lost
        let gross_profit: f64 = winning_trades.iter().map(|t| t.profit).sum();
        let gross_loss: f64 = losing_trades.iter().map(|t| t.profit.abs()).sum();
        if gross_loss > 0.0 {
            metrics.insert("profit_factor".to_string(), gross_profit / gross_loss);
        }

        let fees: f64 = trades.iter().map(|t| t.fees).sum();
        metrics.insert("fees".to_string(), fees);

        metrics
    }
}
