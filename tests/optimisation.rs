mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use polars::df;
use polars::prelude::DataFrame;

use common::{backtester, price_frame, rising_close, sma_strategy};
use stockfilter::data::frame::column_values;
use stockfilter::engines::evaluation::{BacktestEngine, Backtester};
use stockfilter::engines::metrics::BacktestStats;
use stockfilter::engines::optimisation::methods::{
    validate_chunk_size, BayesianOptimizer, ChunkedOptimizer, GridSearchOptimizer, OptimizationJob,
    OptimizationMethod, SequentialOptimizer,
};
use stockfilter::engines::optimisation::splitters::ChunkPartitioner;
use stockfilter::engines::optimisation::{outranks, Domain, ParameterSpace, OVERALL_SYMBOL};
use stockfilter::functions::StrategyDescriptor;
use stockfilter::types::{Assignment, Signal};
use stockfilter::{Result, StockfilterError};

/// Delegates to a real backtester and remembers every `para_x` it ran.
struct RecordingEngine {
    inner: Backtester,
    seen: Mutex<Vec<i64>>,
}

impl BacktestEngine for RecordingEngine {
    fn run(&self, strategy: &StrategyDescriptor, data: &DataFrame) -> Result<BacktestStats> {
        let x = strategy.get_parameters().get_i64("para_x")?;
        self.seen.lock().unwrap().push(x);
        self.inner.run(strategy, data)
    }

    fn optimize(&self, strategy: &StrategyDescriptor, data: &DataFrame, space: &ParameterSpace) -> Result<BacktestStats> {
        self.inner.optimize(strategy, data, space)
    }
}

/// Scores a concave bowl peaking at para_a = 3, para_b = 2 without touching prices.
struct BowlEngine {
    calls: Mutex<Vec<(i64, i64)>>,
}

impl BacktestEngine for BowlEngine {
    fn run(&self, strategy: &StrategyDescriptor, _data: &DataFrame) -> Result<BacktestStats> {
        let params = strategy.get_parameters();
        let (a, b) = (params.get_i64("para_a")?, params.get_i64("para_b")?);
        self.calls.lock().unwrap().push((a, b));

        let score = -((a - 3).pow(2) as f64) - ((b - 2).pow(2) as f64);
        Ok(stats(strategy, score, score))
    }

    fn optimize(&self, _: &StrategyDescriptor, _: &DataFrame, _: &ParameterSpace) -> Result<BacktestStats> {
        Err(StockfilterError::Configuration("not supported".to_string()))
    }
}

fn stats(strategy: &StrategyDescriptor, sqn: f64, return_pct: f64) -> BacktestStats {
    BacktestStats {
        strategy: strategy.name().to_string(),
        parameters: strategy.get_parameters().clone(),
        status: Signal::Hold,
        return_pct,
        sqn,
        equity_final: 0.0,
        num_trades: 0,
        win_rate: 0.0,
        max_drawdown_pct: 0.0,
        profit_factor: None,
        metrics: BTreeMap::from([("sqn".to_string(), sqn)]),
        trades: Vec::new(),
    }
}

/// Per-symbol scores from a fixed table. A frame's single close value is the
/// symbol's row; `fails` names a (row, para_x) pair that errors.
struct TableEngine {
    fails: Option<(usize, i64)>,
}

impl TableEngine {
    const EARNINGS: [f64; 3] = [1.0, 2.0, 6.0];

    fn sqn(row: usize, x: i64) -> f64 {
        let x = x as f64;
        let curve = match row {
            0 => 1.0 - (x - 2.0).powi(2),
            1 => 2.0 - (x - 2.0).powi(2),
            _ => 10.0 - 3.0 * (x - 4.0).powi(2),
        };
        curve - 0.1 * x
    }

    fn datasets() -> Vec<(String, DataFrame)> {
        ["AAA", "BBB", "CCC"]
            .iter()
            .enumerate()
            .map(|(row, symbol)| (symbol.to_string(), df! { "close" => &[row as f64] }.unwrap()))
            .collect()
    }
}

impl BacktestEngine for TableEngine {
    fn run(&self, strategy: &StrategyDescriptor, data: &DataFrame) -> Result<BacktestStats> {
        let row = column_values(data, "close")?[0] as usize;
        let x = strategy.get_parameters().get_i64("para_x")?;
        if self.fails == Some((row, x)) {
            return Err(StockfilterError::Computation(format!("row {} fails at {}", row, x)));
        }
        Ok(stats(strategy, Self::sqn(row, x), Self::EARNINGS[row]))
    }

    fn optimize(&self, _: &StrategyDescriptor, _: &DataFrame, _: &ParameterSpace) -> Result<BacktestStats> {
        Err(StockfilterError::Configuration("not supported".to_string()))
    }
}

fn table_search() -> BayesianOptimizer {
    BayesianOptimizer::new(ParameterSpace::new().with_param("para_x", Domain::range(0, 5)))
        .with_calls(15)
        .with_initial_points(3)
        .with_random_state(1)
}

#[test]
fn test_partition_covers_every_row_once() {
    for size in [1usize, 7, 50, 300] {
        let partitioner = ChunkPartitioner::new(size).unwrap();
        for n in [0usize, 1, 49, 50, 51, 305, 1000] {
            let chunks = partitioner.partition(n);
            assert_eq!(chunks.len(), n.div_ceil(size));

            let mut next = 0;
            for (i, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, i);
                assert_eq!(chunk.offset, next);
                assert!(chunk.len >= 1 && chunk.len <= size);
                next = chunk.end();
            }
            assert_eq!(next, n);
        }
    }
}

#[test]
fn test_chunk_size_must_exceed_lookbacks() {
    let space = ParameterSpace::new().with_param("para_x", Domain::range(2, 51));
    let err = validate_chunk_size([&space], 10).unwrap_err();
    assert!(matches!(err, StockfilterError::Configuration(_)));
    assert!(err.to_string().contains("para_x must be lower than data chunk size (10)."));

    let space = ParameterSpace::new().with_param("para_x", Domain::range(2, 6));
    assert!(validate_chunk_size([&space], 10).is_ok());
}

#[test]
fn test_higher_score_ranks_first() {
    let a = Assignment::new().with("para_x", 9);
    let b = Assignment::new().with("para_x", 3);
    assert!(outranks(3.0, &a, 2.0, &b));
    assert!(!outranks(2.0, &b, 3.0, &a));
    // ties go to the smaller assignment
    assert!(outranks(2.0, &b, 2.0, &a));
    assert!(!outranks(2.0, &a, 2.0, &b));
}

#[test]
fn test_grid_search_evaluates_exactly_the_feasible_set() {
    let df = price_frame(&rising_close(120));
    let strategy = sma_strategy();
    let engine = RecordingEngine { inner: backtester(), seen: Mutex::new(Vec::new()) };

    let space = ParameterSpace::new()
        .with_param("para_x", Domain::range(2, 10))
        .with_constraint(|a| a.get_i64("para_x").map_or(false, |x| x > 4));
    let optimizer = GridSearchOptimizer::new(space);

    let result = optimizer.optimize(&OptimizationJob::new("AAA", &strategy, &df, &engine)).unwrap();

    let mut seen = engine.seen.lock().unwrap().clone();
    seen.sort_unstable();
    assert_eq!(seen, vec![5, 6, 7, 8, 9]);

    // reference winner from independent runs
    let reference = backtester();
    let mut expected: Option<(f64, Assignment)> = None;
    for x in 5..10 {
        let params = Assignment::new().with("para_x", x);
        let stats = reference.run(&strategy.with_parameters(&params), &df).unwrap();
        let better = expected.as_ref().map_or(true, |(s, a)| outranks(stats.sqn, &params, *s, a));
        if better {
            expected = Some((stats.sqn, params));
        }
    }
    let (score, params) = expected.unwrap();
    assert_eq!(result.parameters, params);
    assert_eq!(result.score, score);

    let again = optimizer.optimize(&OptimizationJob::new("AAA", &strategy, &df, &engine)).unwrap();
    assert_eq!(again.parameters, result.parameters);
    assert_eq!(again.score.to_bits(), result.score.to_bits());
    assert_eq!(again.earnings.to_bits(), result.earnings.to_bits());
}

#[test]
fn test_sequential_fixes_each_stage_winner() {
    let df = price_frame(&rising_close(10));
    let strategy = StrategyDescriptor::new("Bowl", |_, _| false, |_, _| false)
        .with_default("para_a", 0)
        .with_default("para_b", 0);
    let engine = BowlEngine { calls: Mutex::new(Vec::new()) };

    let optimizer = SequentialOptimizer::new(vec![
        ParameterSpace::new().with_param("para_a", Domain::range(0, 6)),
        ParameterSpace::new().with_param("para_b", Domain::range(0, 5)),
    ])
    .unwrap();

    let result = optimizer.optimize(&OptimizationJob::new("AAA", &strategy, &df, &engine)).unwrap();
    assert_eq!(result.parameters, Assignment::new().with("para_a", 3).with("para_b", 2));

    let calls = engine.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 6 + 5);
    // stage one runs with the default b, stage two with the winning a
    assert!(calls[..6].iter().all(|(_, b)| *b == 0));
    assert!(calls[6..].iter().all(|(a, _)| *a == 3));
}

#[test]
fn test_sequential_rejects_overlapping_stages() {
    let stage = ParameterSpace::new().with_param("para_a", Domain::range(0, 3));
    let result = SequentialOptimizer::new(vec![stage.clone(), stage]);
    assert!(matches!(result, Err(StockfilterError::Configuration(_))));
}

#[test]
fn test_failing_chunk_is_skipped() {
    // 199 bars in chunks of 66 leave a single-bar tail no SMA window fits
    let df = price_frame(&rising_close(199));
    let strategy = sma_strategy();
    let engine = backtester();
    let inner: Arc<dyn OptimizationMethod> = Arc::new(GridSearchOptimizer::new(strategy.optimizer_parameters().clone()));
    let chunked = ChunkedOptimizer::new(inner, 66).unwrap();

    let result = chunked.optimize(&OptimizationJob::new("AAA", &strategy, &df, &engine)).unwrap();

    let full = engine.run(&strategy.with_parameters(&result.parameters), &df).unwrap();
    assert_eq!(result.earnings, full.return_pct);
    assert_eq!(result.score, full.sqn);
}

#[test]
fn test_all_chunks_failing_is_no_feasible_assignment() {
    let df = price_frame(&rising_close(5));
    let strategy = sma_strategy();
    let engine = backtester();
    let space = ParameterSpace::new().with_param("para_x", Domain::range(6, 10));
    let chunked = ChunkedOptimizer::new(Arc::new(GridSearchOptimizer::new(space)), 9).unwrap();

    let err = chunked.optimize(&OptimizationJob::new("AAA", &strategy, &df, &engine)).unwrap_err();
    assert!(matches!(err, StockfilterError::NoFeasibleAssignment(_)));
}

#[test]
fn test_batch_ranks_on_median_and_averages_reruns() {
    let strategy = StrategyDescriptor::new("Table", |_, _| false, |_, _| false).with_default("para_x", 0);
    let engine = TableEngine { fails: None };

    let result = table_search().optimize_batch(&strategy, &TableEngine::datasets(), &engine).unwrap();

    // median peaks at 2 while the mean would pick 3
    assert_eq!(result.symbol, OVERALL_SYMBOL);
    assert_eq!(result.parameters, Assignment::new().with("para_x", 2));
    assert!((result.earnings - 3.0).abs() < 1e-12);
    let mean_sqn = (0..3).map(|row| TableEngine::sqn(row, 2)).sum::<f64>() / 3.0;
    assert!((result.score - mean_sqn).abs() < 1e-12);
}

#[test]
fn test_batch_penalizes_candidate_failing_on_any_symbol() {
    let strategy = StrategyDescriptor::new("Table", |_, _| false, |_, _| false).with_default("para_x", 0);
    let engine = TableEngine { fails: Some((1, 2)) };

    let result = table_search().optimize_batch(&strategy, &TableEngine::datasets(), &engine).unwrap();

    assert_eq!(result.parameters, Assignment::new().with("para_x", 3));
    let mean_sqn = (0..3).map(|row| TableEngine::sqn(row, 3)).sum::<f64>() / 3.0;
    assert!((result.score - mean_sqn).abs() < 1e-12);
    assert!((result.earnings - 3.0).abs() < 1e-12);
}
