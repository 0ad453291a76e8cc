//! Typed parameter spaces: per-parameter domains plus an optional constraint
//! over a full assignment.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Result, StockfilterError};
use crate::types::{Assignment, ParamValue};

/// Statistic maximised when a space names no objective.
pub const DEFAULT_OBJECTIVE: &str = "sqn";

/// Prefix shared by every strategy tunable.
pub const PARAMETER_PREFIX: &str = "para_";

/// Finite set of candidate values for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Domain {
    /// Half-open `[start, end)` walked with `step`.
    IntegerRange { start: i64, end: i64, step: i64 },
    Discrete { values: Vec<f64> },
    Categorical { values: Vec<ParamValue> },
}

impl Domain {
    pub fn range(start: i64, end: i64) -> Self {
        Self::IntegerRange { start, end, step: 1 }
    }

    pub fn range_step(start: i64, end: i64, step: i64) -> Self {
        Self::IntegerRange { start, end, step }
    }

    pub fn discrete(values: Vec<f64>) -> Self {
        Self::Discrete { values }
    }

    pub fn categorical(values: Vec<ParamValue>) -> Self {
        Self::Categorical { values }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        match self {
            Self::IntegerRange { step, .. } if *step <= 0 => Err(StockfilterError::Configuration(
                format!("{} must use a positive step, got {}", name, step),
            )),
            Self::Discrete { values } if values.iter().any(|v| !v.is_finite()) => {
                Err(StockfilterError::Configuration(format!(
                    "{} contains non-finite candidate values",
                    name
                )))
            }
            _ => Ok(()),
        }
    }

    /// Candidate values in declaration order.
    pub fn candidates(&self) -> Vec<ParamValue> {
        match self {
            Self::IntegerRange { start, end, step } => {
                if *step <= 0 {
                    return Vec::new();
                }
                let mut out = Vec::new();
                let mut v = *start;
                while v < *end {
                    out.push(ParamValue::Int(v));
                    v += step;
                }
                out
            }
            Self::Discrete { values } => values.iter().map(|v| ParamValue::Float(*v)).collect(),
            Self::Categorical { values } => values.clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::IntegerRange { start, end, step } => {
                if *step <= 0 || end <= start {
                    0
                } else {
                    ((end - start + step - 1) / step) as usize
                }
            }
            Self::Discrete { values } => values.len(),
            Self::Categorical { values } => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: &ParamValue) -> bool {
        match self {
            Self::IntegerRange { start, end, step } => match value.as_i64() {
                Some(v) => *step > 0 && v >= *start && v < *end && (v - start) % step == 0,
                None => false,
            },
            Self::Discrete { values } => match value.as_f64() {
                Some(v) => values.iter().any(|c| *c == v),
                None => false,
            },
            Self::Categorical { values } => values.iter().any(|c| c == value),
        }
    }

    /// Largest numeric candidate, if any.
    pub fn max_numeric(&self) -> Option<f64> {
        self.candidates()
            .iter()
            .filter_map(ParamValue::as_f64)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }
}

/// Pure predicate over a full assignment.
#[derive(Clone)]
pub struct Constraint(Arc<dyn Fn(&Assignment) -> bool + Send + Sync>);

impl Constraint {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Assignment) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn check(&self, assignment: &Assignment) -> bool {
        (self.0)(assignment)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Constraint(<fn>)")
    }
}

impl PartialEq for Constraint {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// One named tunable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub domain: Domain,
}

/// Search-dimension descriptor for surrogate-model search.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    pub name: String,
    pub kind: DimensionKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DimensionKind {
    /// Inclusive bounds.
    Integer { low: i64, high: i64 },
    Categorical { values: Vec<ParamValue> },
}

impl Dimension {
    pub fn cardinality(&self) -> usize {
        match &self.kind {
            DimensionKind::Integer { low, high } => (high - low + 1) as usize,
            DimensionKind::Categorical { values } => values.len(),
        }
    }

    /// Map a unit-interval coordinate to a concrete value.
    pub fn decode(&self, unit: f64) -> ParamValue {
        let unit = unit.clamp(0.0, 1.0);
        match &self.kind {
            DimensionKind::Integer { low, high } => {
                let span = (high - low) as f64;
                ParamValue::Int(low + (unit * span).round() as i64)
            }
            DimensionKind::Categorical { values } => {
                let last = values.len().saturating_sub(1);
                let idx = (unit * last as f64).round() as usize;
                values[idx.min(last)].clone()
            }
        }
    }

    /// Inverse of [`Dimension::decode`] for values inside the dimension.
    pub fn encode(&self, value: &ParamValue) -> f64 {
        match &self.kind {
            DimensionKind::Integer { low, high } => {
                let span = (high - low) as f64;
                if span == 0.0 {
                    return 0.0;
                }
                let v = value.as_f64().unwrap_or(*low as f64);
                ((v - *low as f64) / span).clamp(0.0, 1.0)
            }
            DimensionKind::Categorical { values } => {
                let last = values.len().saturating_sub(1);
                if last == 0 {
                    return 0.0;
                }
                let idx = values.iter().position(|c| c == value).unwrap_or(0);
                idx as f64 / last as f64
            }
        }
    }
}

/// Parameter name -> domain, plus the constraint and the objective statistic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpace {
    params: BTreeMap<String, Domain>,
    #[serde(skip)]
    constraint: Option<Constraint>,
    #[serde(default)]
    objective: Option<String>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_param(mut self, name: &str, domain: Domain) -> Self {
        self.params.insert(name.to_string(), domain);
        self
    }

    pub fn with_constraint<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Assignment) -> bool + Send + Sync + 'static,
    {
        self.constraint = Some(Constraint::new(predicate));
        self
    }

    pub fn with_objective(mut self, objective: &str) -> Self {
        self.objective = Some(objective.to_string());
        self
    }

    pub fn specs(&self) -> Vec<ParameterSpec> {
        self.params
            .iter()
            .map(|(name, domain)| ParameterSpec { name: name.clone(), domain: domain.clone() })
            .collect()
    }

    pub fn params(&self) -> impl Iterator<Item = (&String, &Domain)> {
        self.params.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Domain> {
        self.params.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    pub fn objective(&self) -> Option<&str> {
        self.objective.as_deref()
    }

    pub fn objective_or_default(&self) -> &str {
        self.objective().unwrap_or(DEFAULT_OBJECTIVE)
    }

    /// Structural checks run before any search starts.
    pub fn validate(&self) -> Result<()> {
        for (name, domain) in &self.params {
            domain.validate(name)?;
        }
        Ok(())
    }

    /// Number of raw combinations, before the constraint is applied.
    pub fn grid_size(&self) -> usize {
        self.params.values().map(Domain::len).product()
    }

    /// Domain checks first; the constraint only sees assignments that pass them.
    pub fn is_valid(&self, assignment: &Assignment) -> bool {
        let in_domain = self.params.iter().all(|(name, domain)| {
            assignment.get(name).map_or(false, |v| domain.contains(v))
        });
        in_domain && self.constraint.as_ref().map_or(true, |c| c.check(assignment))
    }

    /// Every raw combination in lexicographic parameter order, last name
    /// varying fastest. A space without parameters yields one empty assignment.
    pub fn candidates(&self) -> Candidates {
        Candidates::new(self)
    }

    /// Lazily enumerate every combination that passes [`ParameterSpace::is_valid`].
    pub fn enumerate(&self) -> impl Iterator<Item = Assignment> + '_ {
        self.candidates().filter(move |a| self.is_valid(a))
    }

    /// Surrogate-search dimensions. Unit-step integer ranges become integer
    /// dimensions; everything else is categorical over its candidates.
    pub fn dimensions(&self) -> Result<Vec<Dimension>> {
        self.params
            .iter()
            .map(|(name, domain)| {
                if domain.is_empty() {
                    return Err(StockfilterError::Configuration(format!(
                        "Domain of {} has no candidate values",
                        name
                    )));
                }
                let kind = match domain {
                    Domain::IntegerRange { start, end, step: 1 } => {
                        DimensionKind::Integer { low: *start, high: end - 1 }
                    }
                    other => DimensionKind::Categorical { values: other.candidates() },
                };
                Ok(Dimension { name: name.clone(), kind })
            })
            .collect()
    }
}

/// Odometer over the cartesian product of a space's domains.
pub struct Candidates {
    names: Vec<String>,
    values: Vec<Vec<ParamValue>>,
    cursor: Vec<usize>,
    done: bool,
}

impl Candidates {
    fn new(space: &ParameterSpace) -> Self {
        let names: Vec<String> = space.params.keys().cloned().collect();
        let values: Vec<Vec<ParamValue>> = space.params.values().map(Domain::candidates).collect();
        let done = values.iter().any(Vec::is_empty);
        Self {
            cursor: vec![0; names.len()],
            names,
            values,
            done,
        }
    }
}

impl Iterator for Candidates {
    type Item = Assignment;

    fn next(&mut self) -> Option<Assignment> {
        if self.done {
            return None;
        }

        let current: Assignment = self
            .names
            .iter()
            .zip(&self.values)
            .zip(&self.cursor)
            .map(|((name, values), &i)| (name.clone(), values[i].clone()))
            .collect();

        // advance, last position fastest
        self.done = true;
        for pos in (0..self.cursor.len()).rev() {
            self.cursor[pos] += 1;
            if self.cursor[pos] < self.values[pos].len() {
                self.done = false;
                break;
            }
            self.cursor[pos] = 0;
        }

        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_range_is_half_open() {
        let d = Domain::range(2, 10);
        assert_eq!(d.len(), 8);
        assert_eq!(d.candidates().first(), Some(&ParamValue::Int(2)));
        assert_eq!(d.candidates().last(), Some(&ParamValue::Int(9)));
        assert_eq!(d.max_numeric(), Some(9.0));
        assert!(!d.contains(&ParamValue::Int(10)));

        let stepped = Domain::range_step(0, 10, 3);
        assert_eq!(stepped.len(), 4);
        assert!(stepped.contains(&ParamValue::Int(9)));
        assert!(!stepped.contains(&ParamValue::Int(4)));
    }

    #[test]
    fn test_enumerate_applies_constraint() {
        let space = ParameterSpace::new()
            .with_param("para_x", Domain::range(2, 10))
            .with_constraint(|a| a.get_i64("para_x").map_or(false, |x| x > 4));

        let xs: Vec<i64> = space.enumerate().map(|a| a.get_i64("para_x").unwrap()).collect();
        assert_eq!(xs, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_cartesian_order_and_size() {
        let space = ParameterSpace::new()
            .with_param("para_a", Domain::range(0, 2))
            .with_param("para_b", Domain::discrete(vec![0.5, 1.5, 2.5]));
        assert_eq!(space.grid_size(), 6);

        let all: Vec<Assignment> = space.candidates().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0], Assignment::new().with("para_a", 0).with("para_b", 0.5));
        assert_eq!(all[1], Assignment::new().with("para_a", 0).with("para_b", 1.5));
        assert_eq!(all[5], Assignment::new().with("para_a", 1).with("para_b", 2.5));
    }

    #[test]
    fn test_empty_domain_yields_nothing() {
        let space = ParameterSpace::new()
            .with_param("para_a", Domain::range(0, 3))
            .with_param("para_b", Domain::range(5, 5));
        assert_eq!(space.enumerate().count(), 0);
        assert!(space.dimensions().is_err());
    }

    #[test]
    fn test_domain_failure_never_reaches_constraint() {
        let space = ParameterSpace::new()
            .with_param("para_a", Domain::range(0, 3))
            .with_constraint(|a| {
                assert!(a.get_i64("para_a").unwrap() < 3, "constraint saw out-of-domain value");
                true
            });
        assert!(!space.is_valid(&Assignment::new().with("para_a", 7)));
        assert!(!space.is_valid(&Assignment::new()));
        assert!(space.is_valid(&Assignment::new().with("para_a", 2)));
    }

    #[test]
    fn test_dimensions_round_trip() {
        let space = ParameterSpace::new()
            .with_param("para_n", Domain::range(14, 100))
            .with_param("para_mode", Domain::categorical(vec!["fast".into(), "slow".into()]));
        let dims = space.dimensions().unwrap();

        let mode = &dims[0];
        assert_eq!(mode.cardinality(), 2);
        assert_eq!(mode.decode(1.0), ParamValue::Text("slow".into()));

        let n = &dims[1];
        assert_eq!(n.kind, DimensionKind::Integer { low: 14, high: 99 });
        assert_eq!(n.decode(n.encode(&ParamValue::Int(42))), ParamValue::Int(42));
    }

    #[test]
    fn test_space_serializes_without_constraint() {
        let space = ParameterSpace::new()
            .with_param("para_x", Domain::range(1, 5))
            .with_objective("equity_final")
            .with_constraint(|_| true);
        let json = serde_json::to_string(&space).unwrap();
        let back: ParameterSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("para_x"), Some(&Domain::range(1, 5)));
        assert_eq!(back.objective(), Some("equity_final"));
        assert!(back.constraint().is_none());
    }

    #[test]
    fn test_zero_step_is_rejected() {
        let space = ParameterSpace::new().with_param("para_x", Domain::range_step(1, 5, 0));
        assert!(space.validate().is_err());
    }
}
