use super::check_window;
use crate::error::Result;
use crate::functions::traits::Indicator;
use crate::types::ParamValue;

/// Relative strength index with Wilder smoothing
pub struct RSI {
    pub period: usize,
}

impl RSI {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for RSI {
    fn alias(&self) -> &'static str { "RSI" }
    fn args(&self) -> Vec<ParamValue> { vec![ParamValue::Int(self.period as i64)] }

    fn calculate(&self, values: &[f64]) -> Result<Vec<f64>> {
        // one extra bar for the first price change
        check_window(self.alias(), self.period + 1, values.len())?;

        let period = self.period as f64;
        let mut out = vec![f64::NAN; values.len()];

        let (mut avg_gain, mut avg_loss) = (0.0, 0.0);
        for i in 1..=self.period {
            let change = values[i] - values[i - 1];
            avg_gain += change.max(0.0);
            avg_loss += (-change).max(0.0);
        }
        avg_gain /= period;
        avg_loss /= period;
        out[self.period] = rsi_value(avg_gain, avg_loss);

        for i in (self.period + 1)..values.len() {
            let change = values[i] - values[i - 1];
            avg_gain = (avg_gain * (period - 1.0) + change.max(0.0)) / period;
            avg_loss = (avg_loss * (period - 1.0) + (-change).max(0.0)) / period;
            out[i] = rsi_value(avg_gain, avg_loss);
        }

        Ok(out)
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 { 50.0 } else { 100.0 }
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
