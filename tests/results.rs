use serde_json::Value;

use stockfilter::data::MemoizationCache;
use stockfilter::engines::optimisation::{OptimizationResult, ResultList};
use stockfilter::types::{Assignment, ParamValue};

fn record(symbol: &str, strategy: &str, x: i64, earnings: f64) -> OptimizationResult {
    OptimizationResult::new(symbol, strategy, Assignment::new().with("para_x", x), earnings, 1.5)
}

#[test]
fn test_dump_appends_and_preserves_unrelated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    std::fs::write(&path, r#"{"NOTES": {"kept": true}, "AAA": {"Old": {"sqn": 0.1}}}"#).unwrap();

    let results: ResultList = vec![record("AAA", "SmaCrossClose", 12, 4.5), record("BBB", "SmaCrossClose", 20, -1.0)]
        .into_iter()
        .collect();
    results.dump_optimization_results(&path, true, true).unwrap();

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(doc["NOTES"]["kept"], Value::Bool(true));
    assert_eq!(doc["AAA"]["Old"]["sqn"], 0.1);

    let entry = &doc["AAA"]["SmaCrossClose"];
    assert_eq!(entry["parameter"]["para_x"], 12);
    assert_eq!(entry["earnings"], 4.5);
    assert_eq!(entry["sqn"], 1.5);
    assert!(entry["calculation_time"].is_string());
    assert_eq!(doc["BBB"]["SmaCrossClose"]["earnings"], -1.0);
}

#[test]
fn test_dump_without_append_overwrites() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    std::fs::write(&path, r#"{"NOTES": 1}"#).unwrap();

    let results: ResultList = vec![record("AAA", "Rsi", 14, 2.0)].into_iter().collect();
    results.dump_optimization_results(&path, false, false).unwrap();

    let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert!(doc.get("NOTES").is_none());
    assert_eq!(doc["AAA"]["Rsi"]["parameter"]["para_x"], 14);
}

#[test]
fn test_result_lists_add_element_wise() {
    let a: ResultList = vec![record("AAA", "S", 1, 1.0), record("BBB", "S", 1, 2.0)].into_iter().collect();
    let b: ResultList = vec![record("AAA", "S", 1, 3.0), record("BBB", "S", 1, 4.0)].into_iter().collect();

    let sum = a.checked_add(&b).unwrap();
    let earnings: Vec<f64> = sum.iter().map(|r| r.earnings).collect();
    assert_eq!(earnings, vec![4.0, 6.0]);
    assert_eq!(sum.as_slice()[0].score, 3.0);
    assert!(b.outperforms(&a));

    let short: ResultList = vec![record("AAA", "S", 1, 1.0)].into_iter().collect();
    assert!(a.checked_add(&short).is_err());
}

#[test]
fn test_cache_evicts_least_recently_used_entry() {
    let cache: MemoizationCache = MemoizationCache::new(2);
    let series = [1.0, 2.0, 3.0, 4.0];
    let compute = |p: i64| {
        cache
            .get_or_compute("sma", &series, &[ParamValue::Int(p)], || Ok(vec![p as f64]))
            .unwrap()
    };

    compute(1);
    compute(2);
    compute(1);
    compute(3);

    assert_eq!(cache.len(), 2);
    let kept = cache
        .get_or_compute("sma", &series, &[ParamValue::Int(1)], || Ok(vec![-1.0]))
        .unwrap();
    assert_eq!(kept, vec![1.0]);
    let recomputed = cache
        .get_or_compute("sma", &series, &[ParamValue::Int(2)], || Ok(vec![-1.0]))
        .unwrap();
    assert_eq!(recomputed, vec![-1.0]);
}
