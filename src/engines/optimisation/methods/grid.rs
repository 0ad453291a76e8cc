use std::time::Instant;

use super::base::{OptimizationJob, OptimizationMethod};
use crate::engines::optimisation::{outranks, OptimizationResult, ParameterSpace};
use crate::error::{Result, StockfilterError};
use crate::types::Assignment;

/// Winner of a search together with whatever the evaluation produced.
#[derive(Debug, Clone)]
pub struct Scored<T> {
    pub assignment: Assignment,
    pub score: f64,
    pub value: T,
}

/// Evaluate every valid assignment of `space` and keep the best score.
///
/// Recoverable evaluation failures and non-finite scores exclude the
/// assignment; other errors abort the search. An empty feasible set is
/// reported as [`StockfilterError::NoFeasibleAssignment`].
pub fn exhaustive_search<T, F>(space: &ParameterSpace, mut evaluate: F) -> Result<Scored<T>>
where
    F: FnMut(&Assignment) -> Result<(f64, T)>,
{
    space.validate()?;

    let mut best: Option<Scored<T>> = None;
    let mut evaluated = 0usize;
    for assignment in space.enumerate() {
        evaluated += 1;
        match evaluate(&assignment) {
            Ok((score, value)) if score.is_finite() => {
                log::trace!("{} -> {:.4}", assignment, score);
                let better = best
                    .as_ref()
                    .map_or(true, |b| outranks(score, &assignment, b.score, &b.assignment));
                if better {
                    best = Some(Scored { assignment, score, value });
                }
            }
            Ok((score, _)) => log::debug!("Excluding {}: score {}", assignment, score),
            Err(e) if e.is_recoverable() => log::debug!("Excluding {}: {}", assignment, e),
            Err(e) => return Err(e),
        }
    }

    best.ok_or_else(|| {
        StockfilterError::NoFeasibleAssignment(format!(
            "{} of {} candidates satisfied the space, none produced a score",
            evaluated,
            space.grid_size()
        ))
    })
}

/// Exhaustive search over one space. A space that names its objective is
/// handed to the engine's own optimizer; otherwise candidates are run one by
/// one and ranked on SQN.
pub struct GridSearchOptimizer {
    space: ParameterSpace,
}

impl GridSearchOptimizer {
    pub fn new(space: ParameterSpace) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }
}

impl OptimizationMethod for GridSearchOptimizer {
    fn name(&self) -> &str {
        "grid"
    }

    fn optimize(&self, job: &OptimizationJob<'_>) -> Result<OptimizationResult> {
        let start = Instant::now();

        let stats = if self.space.objective().is_some() {
            job.engine.optimize(job.strategy, job.data, &self.space)?
        } else {
            exhaustive_search(&self.space, |assignment| {
                let stats = job.engine.run(&job.strategy.with_parameters(assignment), job.data)?;
                Ok((stats.sqn, stats))
            })?
            .value
        };

        let result = OptimizationResult::from_stats(job.symbol, &stats, start.elapsed().as_secs_f64());
        log::debug!(
            "{} {} grid best {} (score {:.4}, earnings {:.2}%)",
            job.symbol,
            job.strategy.name(),
            result.parameters,
            result.score,
            result.earnings
        );
        Ok(result)
    }
}
