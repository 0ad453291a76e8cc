use std::collections::BTreeSet;
use std::time::Instant;

use super::base::{OptimizationJob, OptimizationMethod};
use super::grid::GridSearchOptimizer;
use crate::engines::optimisation::{OptimizationResult, ParameterSpace};
use crate::error::{Result, StockfilterError};
use crate::types::Assignment;

/// Optimizes an ordered list of spaces, fixing each stage's winners before
/// the next stage runs.
pub struct SequentialOptimizer {
    stages: Vec<GridSearchOptimizer>,
}

impl SequentialOptimizer {
    /// Stages must not share parameter names.
    pub fn new(stages: Vec<ParameterSpace>) -> Result<Self> {
        if stages.is_empty() {
            return Err(StockfilterError::Configuration(
                "Sequential optimization needs at least one stage".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for (idx, stage) in stages.iter().enumerate() {
            stage.validate()?;
            for name in stage.names() {
                if !seen.insert(name.to_string()) {
                    return Err(StockfilterError::Configuration(format!(
                        "Stage {} re-declares {} already optimized by an earlier stage",
                        idx, name
                    )));
                }
            }
        }

        Ok(Self { stages: stages.into_iter().map(GridSearchOptimizer::new).collect() })
    }

    pub fn stages(&self) -> impl Iterator<Item = &ParameterSpace> {
        self.stages.iter().map(GridSearchOptimizer::space)
    }
}

impl OptimizationMethod for SequentialOptimizer {
    fn name(&self) -> &str {
        "sequential"
    }

    fn optimize(&self, job: &OptimizationJob<'_>) -> Result<OptimizationResult> {
        let start = Instant::now();
        let mut fixed = Assignment::new();
        let mut last: Option<OptimizationResult> = None;

        for (idx, stage) in self.stages.iter().enumerate() {
            let strategy = job.strategy.with_parameters(&fixed);
            let result = stage.optimize(&job.with_strategy(&strategy))?;

            let won = result.parameters.project(stage.space().names());
            log::debug!("{} stage {} fixed {}", job.symbol, idx, won);
            fixed.merge(&won);
            last = Some(result);
        }

        let mut result = last.ok_or_else(|| {
            StockfilterError::Configuration("Sequential optimization needs at least one stage".to_string())
        })?;
        result.parameters = job.strategy.with_parameters(&fixed).get_parameters().clone();
        result.time_taken = start.elapsed().as_secs_f64();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::optimisation::Domain;

    #[test]
    fn test_overlapping_stages_are_rejected() {
        let stage = || ParameterSpace::new().with_param("para_a", Domain::range(1, 5));
        assert!(matches!(
            SequentialOptimizer::new(vec![stage(), stage()]),
            Err(StockfilterError::Configuration(_))
        ));
        assert!(SequentialOptimizer::new(vec![]).is_err());
    }
}
