//! Ranked optimization records and their JSON persistence.

use std::ops::Add;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use crate::engines::metrics::BacktestStats;
use crate::error::{Result, StockfilterError};
use crate::types::{Assignment, Signal};

/// Symbol used for records aggregated over every symbol of a run.
pub const OVERALL_SYMBOL: &str = "overall";

/// Ranking rule shared by every optimizer: higher score wins, equal scores go
/// to the lexicographically smallest assignment.
pub fn outranks(score: f64, assignment: &Assignment, best_score: f64, best_assignment: &Assignment) -> bool {
    score > best_score || (score == best_score && assignment < best_assignment)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub symbol: String,
    pub strategy: String,
    #[serde(rename = "parameter")]
    pub parameters: Assignment,
    /// Percentage return
    pub earnings: f64,
    /// Ranking statistic (SQN)
    #[serde(rename = "sqn")]
    pub score: f64,
    /// Wall time in seconds
    pub time_taken: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<String, f64>>,
}

impl OptimizationResult {
    pub fn new(symbol: &str, strategy: &str, parameters: Assignment, earnings: f64, score: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            strategy: strategy.to_string(),
            parameters,
            earnings,
            score,
            time_taken: 0.0,
            status: None,
            stats: None,
        }
    }

    pub fn from_stats(symbol: &str, stats: &BacktestStats, time_taken: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            strategy: stats.strategy.clone(),
            parameters: stats.parameters.clone(),
            earnings: stats.return_pct,
            score: stats.sqn,
            time_taken,
            status: Some(stats.status),
            stats: Some(stats.metrics.clone()),
        }
    }

    pub fn with_time_taken(mut self, time_taken: f64) -> Self {
        self.time_taken = time_taken;
        self
    }

    pub fn outranks(&self, other: &OptimizationResult) -> bool {
        outranks(self.score, &self.parameters, other.score, &other.parameters)
    }

    /// Entry stored under `{symbol: {strategy: ...}}` in a results document.
    pub fn to_optimization_entry(&self) -> Value {
        json!({
            "parameter": self.parameters,
            "earnings": self.earnings,
            "sqn": self.score,
            "calculation_time": chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Sums earnings, score and time; identity fields come from the left side.
impl Add for OptimizationResult {
    type Output = OptimizationResult;

    fn add(mut self, other: OptimizationResult) -> OptimizationResult {
        self.earnings += other.earnings;
        self.score += other.score;
        self.time_taken += other.time_taken;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultList(Vec<OptimizationResult>);

impl ResultList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, result: OptimizationResult) {
        self.0.push(result);
    }

    pub fn extend(&mut self, other: ResultList) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, OptimizationResult> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[OptimizationResult] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<OptimizationResult> {
        self.0
    }

    pub fn total_earnings(&self) -> f64 {
        self.0.iter().map(|r| r.earnings).sum()
    }

    /// Element-wise sum of two collections of the same length.
    pub fn checked_add(&self, other: &ResultList) -> Result<ResultList> {
        if self.len() != other.len() {
            return Err(StockfilterError::Validation(format!(
                "Cannot add result lists of length {} and {}",
                self.len(),
                other.len()
            )));
        }
        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| a.clone() + b.clone())
            .collect())
    }

    /// Compares collections by summed earnings.
    pub fn outperforms(&self, other: &ResultList) -> bool {
        self.total_earnings() > other.total_earnings()
    }

    pub fn best(&self) -> Option<&OptimizationResult> {
        self.0.iter().fold(None, |best, r| match best {
            Some(b) if !r.outranks(b) => Some(b),
            _ => Some(r),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write `{symbol: {strategy: {parameter, earnings, sqn, calculation_time}}}`.
    /// With `append`, entries are merged into an existing document and
    /// unrelated keys are preserved.
    pub fn dump_optimization_results<P: AsRef<Path>>(&self, path: P, append: bool, pretty: bool) -> Result<()> {
        let path = path.as_ref();

        let mut document = Map::new();
        if append && path.exists() {
            let raw = std::fs::read_to_string(path)?;
            match serde_json::from_str::<Value>(&raw)? {
                Value::Object(existing) => document = existing,
                _ => {
                    return Err(StockfilterError::Validation(format!(
                        "{} does not hold a JSON object",
                        path.display()
                    )))
                }
            }
        }

        for result in &self.0 {
            let symbol = document
                .entry(result.symbol.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !symbol.is_object() {
                *symbol = Value::Object(Map::new());
            }
            if let Value::Object(strategies) = symbol {
                strategies.insert(result.strategy.clone(), result.to_optimization_entry());
            }
        }

        let document = Value::Object(document);
        let body = if pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        std::fs::write(path, body)?;
        log::info!("Wrote {} optimization results to {}", self.len(), path.display());
        Ok(())
    }
}

impl FromIterator<OptimizationResult> for ResultList {
    fn from_iter<T: IntoIterator<Item = OptimizationResult>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ResultList {
    type Item = OptimizationResult;
    type IntoIter = std::vec::IntoIter<OptimizationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultList {
    type Item = &'a OptimizationResult;
    type IntoIter = std::slice::Iter<'a, OptimizationResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
