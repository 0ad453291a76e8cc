use super::risk::std_dev;
use crate::types::Trade;

/// System quality number over per-trade percentage returns.
///
/// `sqrt(n) * mean / stdev`, using the sample standard deviation. Defined as
/// 0.0 for fewer than two trades or when every trade returned the same.
pub fn sqn(trades: &[Trade]) -> f64 {
    let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
    sqn_of_returns(&returns)
}

pub fn sqn_of_returns(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let stdev = std_dev(returns, 1);
    if stdev == 0.0 || !stdev.is_finite() {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    n.sqrt() * mean / stdev
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqn_known_value() {
        // mean 2, sample stdev 4 / sqrt(3)
        let value = sqn_of_returns(&[0.0, 4.0, 0.0, 4.0]);
        assert!((value - 3.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_sqn_degenerate_cases() {
        assert_eq!(sqn_of_returns(&[]), 0.0);
        assert_eq!(sqn_of_returns(&[5.0]), 0.0);
        assert_eq!(sqn_of_returns(&[1.5, 1.5, 1.5]), 0.0);
    }
}
