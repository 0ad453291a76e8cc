use crate::{
    error::{Result, StockfilterError},
    types::{ExitReason, Trade},
};

/// All-in, long-only account.
pub struct Portfolio {
    pub initial_capital: f64,
    pub cash: f64,
    pub commission: f64,
    pub position: Option<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,

    pub peak_equity: f64,
    pub max_drawdown: f64,
}

pub struct Position {
    pub entry_bar: usize,
    pub entry_price: f64,
    pub size: f64,
    pub entry_fee: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64, commission: f64) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            commission,
            position: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity: initial_capital,
            max_drawdown: 0.0,
        }
    }

    pub fn is_long(&self) -> bool {
        self.position.is_some()
    }

    /// Spend all cash on the asset; the commission comes out of the same cash.
    pub fn open_position(&mut self, bar: usize, price: f64) -> Result<()> {
        if self.position.is_some() {
            return Ok(());
        }
        if !(price.is_finite() && price > 0.0) {
            return Err(StockfilterError::Backtest(format!("Invalid fill price {} at bar {}", price, bar)));
        }

        let size = self.cash / (price * (1.0 + self.commission));
        let entry_fee = size * price * self.commission;
        self.cash -= size * price + entry_fee;

        self.position = Some(Position { entry_bar: bar, entry_price: price, size, entry_fee });
        Ok(())
    }

    pub fn close_position(&mut self, bar: usize, price: f64, reason: ExitReason) -> Result<()> {
        let Some(pos) = self.position.take() else {
            return Ok(());
        };
        if !price.is_finite() {
            return Err(StockfilterError::Backtest(format!("Invalid exit price {} at bar {}", price, bar)));
        }

        let proceeds = pos.size * price;
        let exit_fee = proceeds * self.commission;
        self.cash += proceeds - exit_fee;

        let cost = pos.size * pos.entry_price + pos.entry_fee;
        let fees = pos.entry_fee + exit_fee;
        let profit = proceeds - exit_fee - cost;

        self.trades.push(Trade {
            entry_bar: pos.entry_bar,
            exit_bar: bar,
            entry_price: pos.entry_price,
            exit_price: price,
            size: pos.size,
            profit,
            return_pct: if cost > 0.0 { profit / cost * 100.0 } else { 0.0 },
            exit_reason: reason,
            fees,
        });

        Ok(())
    }

    /// Mark the account to `price` and record the bar's equity.
    pub fn mark(&mut self, price: f64) {
        let equity = self.equity(price);
        self.equity_curve.push(equity);

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        if self.peak_equity > 0.0 {
            let drawdown = (self.peak_equity - equity) / self.peak_equity;
            if drawdown > self.max_drawdown {
                self.max_drawdown = drawdown;
            }
        }
    }

    /// Cash plus the open position valued at `price`.
    pub fn equity(&self, price: f64) -> f64 {
        match &self.position {
            Some(pos) if price.is_finite() => self.cash + pos.size * price,
            Some(pos) => self.cash + pos.size * pos.entry_price,
            None => self.cash,
        }
    }

    pub fn get_trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn get_equity_curve(&self) -> &[f64] {
        &self.equity_curve
    }

    pub fn final_balance(&self) -> f64 {
        self.cash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_pays_commission_twice() {
        let mut portfolio = Portfolio::new(10_000.0, 0.01);
        portfolio.open_position(0, 100.0).unwrap();
        assert!(portfolio.cash.abs() < 1e-9);

        portfolio.close_position(1, 100.0, ExitReason::Signal).unwrap();
        let trade = &portfolio.get_trades()[0];
        assert!(trade.profit < 0.0);
        assert!((trade.fees - (trade.size * 100.0 * 0.02)).abs() < 1e-9);
        assert!((portfolio.final_balance() - (10_000.0 + trade.profit)).abs() < 1e-9);
    }

    #[test]
    fn test_second_entry_is_ignored_while_long() {
        let mut portfolio = Portfolio::new(1_000.0, 0.0);
        portfolio.open_position(0, 10.0).unwrap();
        portfolio.open_position(1, 5.0).unwrap();
        assert_eq!(portfolio.position.as_ref().unwrap().entry_price, 10.0);

        portfolio.mark(12.0);
        assert!((portfolio.get_equity_curve()[0] - 1_200.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_non_positive_fill() {
        let mut portfolio = Portfolio::new(1_000.0, 0.0);
        assert!(portfolio.open_position(0, 0.0).is_err());
        assert!(portfolio.open_position(0, f64::NAN).is_err());
    }
}
