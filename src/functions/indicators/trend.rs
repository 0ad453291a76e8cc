use super::check_window;
use crate::error::Result;
use crate::functions::traits::Indicator;
use crate::types::ParamValue;

/// Simple moving average
pub struct SMA {
    pub period: usize,
}

impl SMA {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for SMA {
    fn alias(&self) -> &'static str { "SMA" }
    fn args(&self) -> Vec<ParamValue> { vec![ParamValue::Int(self.period as i64)] }

    fn calculate(&self, values: &[f64]) -> Result<Vec<f64>> {
        check_window(self.alias(), self.period, values.len())?;

        let mut out = vec![f64::NAN; values.len()];
        let mut sum: f64 = values[..self.period].iter().sum();
        out[self.period - 1] = sum / self.period as f64;
        for i in self.period..values.len() {
            sum += values[i] - values[i - self.period];
            out[i] = sum / self.period as f64;
        }
        Ok(out)
    }
}

/// Exponential moving average seeded with the SMA of the first window.
pub struct EMA {
    pub period: usize,
}

impl EMA {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Indicator for EMA {
    fn alias(&self) -> &'static str { "EMA" }
    fn args(&self) -> Vec<ParamValue> { vec![ParamValue::Int(self.period as i64)] }

    fn calculate(&self, values: &[f64]) -> Result<Vec<f64>> {
        check_window(self.alias(), self.period, values.len())?;

        let alpha = 2.0 / (self.period as f64 + 1.0);
        let mut out = vec![f64::NAN; values.len()];
        let mut prev = values[..self.period].iter().sum::<f64>() / self.period as f64;
        out[self.period - 1] = prev;
        for i in self.period..values.len() {
            prev = alpha * values[i] + (1.0 - alpha) * prev;
            out[i] = prev;
        }
        Ok(out)
    }
}
