use crate::data::MemoizationCache;
use crate::error::Result;
use crate::types::ParamValue;

/// Indicator over a single input series.
pub trait Indicator: Send + Sync {
    /// Identity used in cache fingerprints
    fn alias(&self) -> &'static str;

    /// Arguments besides the input series
    fn args(&self) -> Vec<ParamValue>;

    /// Output has the input's length; warm-up bars are NaN.
    fn calculate(&self, values: &[f64]) -> Result<Vec<f64>>;

    /// `calculate` routed through the memoization cache.
    fn calculate_cached(&self, values: &[f64], cache: &MemoizationCache) -> Result<Vec<f64>> {
        cache.get_or_compute(self.alias(), values, &self.args(), || self.calculate(values))
    }
}
