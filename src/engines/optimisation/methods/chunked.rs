use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use super::base::{OptimizationJob, OptimizationMethod};
use crate::engines::optimisation::splitters::{ChunkPartitioner, DataChunk, DataSplitter};
use crate::engines::optimisation::{OptimizationResult, ParameterSpace, PARAMETER_PREFIX};
use crate::error::{Result, StockfilterError};
use crate::types::Assignment;

/// Reject spaces whose lookback-style parameters can exceed the rows of a
/// chunk. Enter/exit thresholds are exempt.
pub fn validate_chunk_size<'a>(spaces: impl IntoIterator<Item = &'a ParameterSpace>, chunk_size: usize) -> Result<()> {
    for space in spaces {
        for (name, domain) in space.params() {
            if !name.starts_with(PARAMETER_PREFIX) || name.contains("enter") || name.contains("exit") {
                continue;
            }
            if domain.max_numeric().map_or(false, |max| max > chunk_size as f64) {
                return Err(StockfilterError::Configuration(format!(
                    "{} must be lower than data chunk size ({}).",
                    name, chunk_size
                )));
            }
        }
    }
    Ok(())
}

/// Runs an inner optimizer on every chunk independently, then re-scores each
/// chunk winner on the full series.
pub struct ChunkedOptimizer {
    inner: Arc<dyn OptimizationMethod>,
    partitioner: ChunkPartitioner,
    parallel: bool,
}

impl ChunkedOptimizer {
    pub fn new(inner: Arc<dyn OptimizationMethod>, chunk_size: usize) -> Result<Self> {
        Ok(Self { inner, partitioner: ChunkPartitioner::new(chunk_size)?, parallel: false })
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.partitioner.chunk_size()
    }

    fn optimize_chunk(&self, job: &OptimizationJob<'_>, piece: &DataChunk) -> Result<OptimizationResult> {
        self.inner.optimize(&job.with_data(&piece.data))
    }
}

impl OptimizationMethod for ChunkedOptimizer {
    fn name(&self) -> &str {
        "chunked"
    }

    fn optimize(&self, job: &OptimizationJob<'_>) -> Result<OptimizationResult> {
        let start = Instant::now();
        let chunks = self.partitioner.split(job.data)?;
        if chunks.is_empty() {
            return Err(StockfilterError::DataLoading(format!("No rows to chunk for {}", job.symbol)));
        }

        // every chunk finishes before any winner is selected
        let outcomes: Vec<Result<OptimizationResult>> = if self.parallel {
            chunks.par_iter().map(|piece| self.optimize_chunk(job, piece)).collect()
        } else {
            chunks.iter().map(|piece| self.optimize_chunk(job, piece)).collect()
        };

        let mut winners: Vec<Assignment> = Vec::new();
        for (piece, outcome) in chunks.iter().zip(outcomes) {
            match outcome {
                Ok(result) => {
                    log::debug!(
                        "{} chunk {} [{}..{}): {} score {:.4}",
                        job.symbol,
                        piece.chunk.index,
                        piece.chunk.offset,
                        piece.chunk.end(),
                        result.parameters,
                        result.score
                    );
                    if !winners.contains(&result.parameters) {
                        winners.push(result.parameters);
                    }
                }
                Err(e) if e.is_recoverable() => log::warn!(
                    "{} chunk {} skipped: {}",
                    job.symbol,
                    piece.chunk.index,
                    e
                ),
                Err(e) => return Err(e),
            }
        }

        let mut best: Option<OptimizationResult> = None;
        for parameters in winners {
            let strategy = job.strategy.with_parameters(&parameters);
            let stats = match job.engine.run(&strategy, job.data) {
                Ok(stats) => stats,
                Err(e) if e.is_recoverable() => {
                    log::warn!("{} full-series check of {} failed: {}", job.symbol, parameters, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let candidate = OptimizationResult::from_stats(job.symbol, &stats, 0.0);
            if best.as_ref().map_or(true, |b| candidate.outranks(b)) {
                best = Some(candidate);
            }
        }

        let best = best.ok_or_else(|| {
            StockfilterError::NoFeasibleAssignment(format!(
                "No chunk of {} produced a usable assignment",
                job.symbol
            ))
        })?;
        Ok(best.with_time_taken(start.elapsed().as_secs_f64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::optimisation::Domain;

    #[test]
    fn test_chunk_size_validation() {
        let wide = ParameterSpace::new().with_param("para_x", Domain::range(1, 51));
        let err = validate_chunk_size([&wide], 10).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: para_x must be lower than data chunk size (10)."
        );

        let narrow = ParameterSpace::new().with_param("para_x", Domain::range(1, 6));
        assert!(validate_chunk_size([&narrow], 10).is_ok());
    }

    #[test]
    fn test_thresholds_and_foreign_names_are_exempt() {
        let space = ParameterSpace::new()
            .with_param("para_rsi_enter", Domain::range(10, 50))
            .with_param("para_rsi_exit", Domain::range(50, 90))
            .with_param("window", Domain::range(1, 500));
        assert!(validate_chunk_size([&space], 5).is_ok());
    }
}
