//! Surrogate-model search over a [`ParameterSpace`].
//!
//! The search minimizes; the batch objective is the negative median score
//! across every symbol. Constraint violations and failed evaluations cost
//! [`PENALTY`] instead of aborting the run.

use std::collections::BTreeMap;
use std::time::Instant;

use polars::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use super::base::{OptimizationJob, OptimizationMethod};
use crate::config::OptimizerConfig;
use crate::engines::evaluation::BacktestEngine;
use crate::engines::metrics::is_known_statistic;
use crate::engines::optimisation::space::Dimension;
use crate::engines::optimisation::{outranks, OptimizationResult, ParameterSpace, OVERALL_SYMBOL};
use crate::error::{Result, StockfilterError};
use crate::functions::StrategyDescriptor;
use crate::types::Assignment;

/// Objective value for infeasible or failed proposals.
pub const PENALTY: f64 = 1e6;

/// Random candidates scored by the acquisition function per proposal.
const CANDIDATES: usize = 1000;
/// Exploration weight of the lower confidence bound.
const KAPPA: f64 = 1.96;
const LENGTH_SCALE: f64 = 0.3;
const NOISE_VARIANCE: f64 = 1e-4;

/// Every evaluation of a search plus its minimum.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub best: Assignment,
    pub best_value: f64,
    pub evaluations: Vec<(Assignment, f64)>,
}

pub struct BayesianOptimizer {
    space: ParameterSpace,
    n_calls: usize,
    n_initial_points: usize,
    random_state: u64,
    parallel: bool,
}

impl BayesianOptimizer {
    pub fn new(space: ParameterSpace) -> Self {
        Self { space, n_calls: 50, n_initial_points: 10, random_state: 0, parallel: false }
    }

    pub fn from_config(space: ParameterSpace, config: &OptimizerConfig) -> Self {
        Self {
            space,
            n_calls: config.bayesian_calls,
            n_initial_points: config.bayesian_initial_points,
            random_state: config.random_state,
            parallel: config.parallel,
        }
    }

    pub fn with_calls(mut self, n_calls: usize) -> Self {
        self.n_calls = n_calls;
        self
    }

    pub fn with_initial_points(mut self, n_initial_points: usize) -> Self {
        self.n_initial_points = n_initial_points;
        self
    }

    pub fn with_random_state(mut self, random_state: u64) -> Self {
        self.random_state = random_state;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Minimize `objective` with a fixed evaluation budget.
    ///
    /// Proposals that fail the space's checks are charged [`PENALTY`] without
    /// calling `objective`. A repeated proposal reuses its earlier value and
    /// still counts toward the budget.
    pub fn minimize<F>(&self, objective: F) -> Result<SearchOutcome>
    where
        F: Fn(&Assignment) -> f64,
    {
        self.space.validate()?;
        let dims = self.space.dimensions()?;
        if dims.is_empty() {
            return Err(StockfilterError::Configuration(
                "Bayesian search needs at least one parameter".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.random_state);
        let mut points: Vec<Vec<f64>> = Vec::with_capacity(self.n_calls);
        let mut values: Vec<f64> = Vec::with_capacity(self.n_calls);
        let mut seen: BTreeMap<Assignment, f64> = BTreeMap::new();
        let mut evaluations = Vec::with_capacity(self.n_calls);

        for call in 0..self.n_calls {
            let point = if call < self.n_initial_points || points.is_empty() {
                random_point(&dims, &mut rng)
            } else {
                propose(&dims, &points, &values, &seen, &mut rng)
            };
            let assignment = decode(&dims, &point);

            let value = match seen.get(&assignment) {
                Some(value) => *value,
                None => {
                    let value = if self.space.is_valid(&assignment) {
                        objective(&assignment)
                    } else {
                        log::debug!("{} fails the constraint", assignment);
                        PENALTY
                    };
                    let value = if value.is_finite() { value.min(PENALTY) } else { PENALTY };
                    seen.insert(assignment.clone(), value);
                    value
                }
            };
            log::debug!("call {}: {} -> {:.4}", call, assignment, value);

            points.push(encode(&dims, &assignment));
            values.push(value);
            evaluations.push((assignment, value));
        }

        // minimum value, smallest assignment on ties
        let (best, best_value) = seen
            .iter()
            .fold(None::<(&Assignment, f64)>, |acc, (a, v)| match acc {
                Some((ba, bv)) if !outranks(-*v, a, -bv, ba) => Some((ba, bv)),
                _ => Some((a, *v)),
            })
            .map(|(a, v)| (a.clone(), v))
            .ok_or_else(|| StockfilterError::NoFeasibleAssignment("Evaluation budget is zero".to_string()))?;

        if best_value >= PENALTY {
            return Err(StockfilterError::NoFeasibleAssignment(format!(
                "All {} proposals were infeasible or failed",
                evaluations.len()
            )));
        }

        Ok(SearchOutcome { best, best_value, evaluations })
    }

    /// Search one assignment for every dataset at once, then re-run it per
    /// symbol and average earnings and score into a single record.
    ///
    /// The search ranks on the space's objective statistic, but the record's
    /// score is always the mean SQN of the re-runs, like every other record.
    pub fn optimize_batch(
        &self,
        strategy: &StrategyDescriptor,
        datasets: &[(String, DataFrame)],
        engine: &dyn BacktestEngine,
    ) -> Result<OptimizationResult> {
        if datasets.is_empty() {
            return Err(StockfilterError::DataLoading(format!(
                "No data to optimize {} on",
                strategy.name()
            )));
        }

        let start = Instant::now();
        let objective = self.space.objective_or_default();
        if !is_known_statistic(objective) {
            return Err(StockfilterError::Configuration(format!(
                "Unknown objective statistic '{}'",
                objective
            )));
        }

        let outcome = self.minimize(|assignment| {
            let configured = strategy.with_parameters(assignment);
            let score = |(symbol, df): &(String, DataFrame)| -> Result<f64> {
                let stats = engine.run(&configured, df)?;
                stats.metric(objective).filter(|v| v.is_finite()).ok_or_else(|| {
                    StockfilterError::Computation(format!("{}: no finite {} statistic", symbol, objective))
                })
            };
            let scores: Result<Vec<f64>> = if self.parallel {
                datasets.par_iter().map(score).collect()
            } else {
                datasets.iter().map(score).collect()
            };
            match scores {
                Ok(scores) => -median(&scores),
                Err(e) => {
                    log::debug!("{} penalized: {}", assignment, e);
                    PENALTY
                }
            }
        })?;

        log::info!(
            "Best parameters for {}: {} with {} {:.4}",
            strategy.name(),
            outcome.best,
            objective,
            -outcome.best_value
        );

        let configured = strategy.with_parameters(&outcome.best);
        let (mut earnings, mut score, mut count) = (0.0, 0.0, 0usize);
        for (symbol, df) in datasets {
            match engine.run(&configured, df) {
                Ok(stats) => {
                    earnings += stats.return_pct;
                    score += stats.sqn;
                    count += 1;
                }
                Err(e) => log::warn!("{}: re-evaluation of {} failed: {}", symbol, outcome.best, e),
            }
        }
        if count == 0 {
            return Err(StockfilterError::NoFeasibleAssignment(format!(
                "{} failed on every symbol",
                outcome.best
            )));
        }

        Ok(OptimizationResult::new(
            OVERALL_SYMBOL,
            strategy.name(),
            configured.get_parameters().clone(),
            earnings / count as f64,
            score / count as f64,
        )
        .with_time_taken(start.elapsed().as_secs_f64()))
    }
}

impl OptimizationMethod for BayesianOptimizer {
    fn name(&self) -> &str {
        "bayesian"
    }

    fn optimize(&self, job: &OptimizationJob<'_>) -> Result<OptimizationResult> {
        let datasets = [(job.symbol.to_string(), job.data.clone())];
        let mut result = self.optimize_batch(job.strategy, &datasets, job.engine)?;
        result.symbol = job.symbol.to_string();
        Ok(result)
    }
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len();
    (sorted[n / 2] + sorted[(n - 1) / 2]) / 2.0
}

fn random_point(dims: &[Dimension], rng: &mut StdRng) -> Vec<f64> {
    dims.iter().map(|_| rng.gen::<f64>()).collect()
}

fn decode(dims: &[Dimension], point: &[f64]) -> Assignment {
    dims.iter()
        .zip(point)
        .map(|(dim, unit)| (dim.name.clone(), dim.decode(*unit)))
        .collect()
}

fn encode(dims: &[Dimension], assignment: &Assignment) -> Vec<f64> {
    dims.iter()
        .map(|dim| assignment.get(&dim.name).map_or(0.0, |v| dim.encode(v)))
        .collect()
}

/// Lowest lower-confidence-bound among random unseen candidates.
fn propose(
    dims: &[Dimension],
    points: &[Vec<f64>],
    values: &[f64],
    seen: &BTreeMap<Assignment, f64>,
    rng: &mut StdRng,
) -> Vec<f64> {
    // penalties are clipped just above the worst feasible value so they do
    // not flatten the rest of the surface
    let worst_feasible = values.iter().copied().filter(|v| *v < PENALTY).fold(f64::NEG_INFINITY, f64::max);
    let ceiling = if worst_feasible.is_finite() { worst_feasible + 1.0 } else { 0.0 };
    let targets: Vec<f64> = values.iter().map(|v| if *v >= PENALTY { ceiling } else { *v }).collect();

    let gp = GaussianProcess::fit(points.to_vec(), &targets, LENGTH_SCALE, NOISE_VARIANCE);

    let mut best: Option<(f64, Vec<f64>)> = None;
    for _ in 0..CANDIDATES {
        let candidate = random_point(dims, rng);
        let assignment = decode(dims, &candidate);
        if seen.contains_key(&assignment) {
            continue;
        }
        let snapped = encode(dims, &assignment);
        let (mean, std) = gp.predict(&snapped);
        let lcb = mean - KAPPA * std;
        if best.as_ref().map_or(true, |(b, _)| lcb < *b) {
            best = Some((lcb, snapped));
        }
    }

    match best {
        Some((_, point)) => point,
        // space exhausted; any proposal repeats a known value
        None => random_point(dims, rng),
    }
}

/// Gaussian process with an RBF kernel over unit-cube coordinates.
struct GaussianProcess {
    points: Vec<Vec<f64>>,
    alpha: Vec<f64>,
    k_inv: Vec<f64>,
    length_scale: f64,
    noise_variance: f64,
    y_mean: f64,
    y_std: f64,
}

impl GaussianProcess {
    fn fit(points: Vec<Vec<f64>>, values: &[f64], length_scale: f64, noise_variance: f64) -> Self {
        let n = points.len();
        let y_mean = values.iter().sum::<f64>() / n as f64;
        let var = values.iter().map(|v| (v - y_mean).powi(2)).sum::<f64>() / n as f64;
        let y_std = if var > 0.0 { var.sqrt() } else { 1.0 };
        let y: Vec<f64> = values.iter().map(|v| (v - y_mean) / y_std).collect();

        let mut k_matrix = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                k_matrix[i * n + j] = rbf(&points[i], &points[j], length_scale);
            }
            k_matrix[i * n + i] += noise_variance;
        }
        let k_inv = invert(k_matrix, n);

        let mut alpha = vec![0.0; n];
        for i in 0..n {
            for j in 0..n {
                alpha[i] += k_inv[i * n + j] * y[j];
            }
        }

        Self { points, alpha, k_inv, length_scale, noise_variance, y_mean, y_std }
    }

    /// Mean and standard deviation in the original value scale.
    fn predict(&self, x: &[f64]) -> (f64, f64) {
        let n = self.points.len();
        let k_star: Vec<f64> = self.points.iter().map(|p| rbf(x, p, self.length_scale)).collect();

        let mean: f64 = k_star.iter().zip(&self.alpha).map(|(k, a)| k * a).sum();

        let mut reduction = 0.0;
        for i in 0..n {
            for j in 0..n {
                reduction += k_star[i] * self.k_inv[i * n + j] * k_star[j];
            }
        }
        let variance = (1.0 + self.noise_variance - reduction).max(1e-12);

        (self.y_mean + mean * self.y_std, variance.sqrt() * self.y_std)
    }
}

fn rbf(a: &[f64], b: &[f64], length_scale: f64) -> f64 {
    let sq_dist: f64 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    (-sq_dist / (2.0 * length_scale * length_scale)).exp()
}

/// Gauss-Jordan inverse with partial pivoting and a small ridge.
fn invert(mut a: Vec<f64>, n: usize) -> Vec<f64> {
    let mut inv = vec![0.0; n * n];
    for i in 0..n {
        inv[i * n + i] = 1.0;
        a[i * n + i] += 1e-8;
    }

    for i in 0..n {
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k * n + i].abs() > a[max_row * n + i].abs() {
                max_row = k;
            }
        }
        if max_row != i {
            for j in 0..n {
                a.swap(i * n + j, max_row * n + j);
                inv.swap(i * n + j, max_row * n + j);
            }
        }

        let pivot = a[i * n + i];
        if pivot.abs() < 1e-12 {
            continue;
        }
        for j in 0..n {
            a[i * n + j] /= pivot;
            inv[i * n + j] /= pivot;
        }

        for k in 0..n {
            if k != i {
                let factor = a[k * n + i];
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a[k * n + j] -= factor * a[i * n + j];
                    inv[k * n + j] -= factor * inv[i * n + j];
                }
            }
        }
    }

    inv
}
