use std::collections::BTreeMap;

pub struct RiskMetrics;

impl RiskMetrics {
    pub fn calculate(equity_curve: &[f64]) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        if equity_curve.len() < 2 {
            return metrics;
        }

        metrics.insert("max_drawdown_pct".to_string(), Self::max_drawdown(equity_curve));

        let returns = Self::calculate_returns(equity_curve);
        let volatility = std_dev(&returns, 0);
        metrics.insert("volatility".to_string(), volatility);

        // Risk-free rate of zero
        let avg_return = returns.iter().sum::<f64>() / returns.len() as f64;
        if volatility > 0.0 {
            metrics.insert("sharpe_ratio".to_string(), avg_return / volatility);
        }

        let downside_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
        if !downside_returns.is_empty() {
            let downside_dev = std_dev(&downside_returns, 0);
            if downside_dev > 0.0 {
                metrics.insert("sortino_ratio".to_string(), avg_return / downside_dev);
            }
        }

        metrics
    }

    pub fn max_drawdown(equity: &[f64]) -> f64 {
        let Some(&first) = equity.first() else {
            return 0.0;
        };
        let mut max_dd = 0.0;
        let mut peak = first;

        for &value in equity {
            if value > peak {
                peak = value;
            }
            if peak > 0.0 {
                let dd = (peak - value) / peak * 100.0;
                if dd > max_dd {
                    max_dd = dd;
                }
            }
        }

        max_dd
    }

    fn calculate_returns(equity: &[f64]) -> Vec<f64> {
        equity
            .windows(2)
            .filter(|w| w[0] != 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }
}

/// Standard deviation with `ddof` delta degrees of freedom.
pub(crate) fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|&v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - ddof) as f64;

    variance.sqrt()
}
