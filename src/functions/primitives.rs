//! Bar-wise comparisons used by strategy predicates.
//!
//! All helpers look at bar `i` and the bar before it. Any NaN involved makes
//! the comparison false, so indicator warm-up never fires a signal.

/// `a` moved from below `b` to above it on bar `i`.
pub fn crossover(a: &[f64], b: &[f64], i: usize) -> bool {
    if i == 0 || i >= a.len() || i >= b.len() {
        return false;
    }
    a[i - 1] < b[i - 1] && a[i] > b[i]
}

/// `a` and `b` crossed on bar `i`, in either direction.
pub fn cross(a: &[f64], b: &[f64], i: usize) -> bool {
    crossover(a, b, i) || crossover(b, a, i)
}

/// Constant series, used for threshold lines such as RSI bands.
pub fn threshold(value: f64, len: usize) -> Vec<f64> {
    vec![value; len]
}
