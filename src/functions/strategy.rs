//! Strategies as composition: named indicator bindings plus buy/sell
//! predicates evaluated over the resulting indicator frame.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::data::frame::{PriceBars, CLOSE, OPEN};
use crate::data::MemoizationCache;
use crate::engines::optimisation::ParameterSpace;
use crate::error::{Result, StockfilterError};
use crate::types::{Assignment, ParamValue, Signal};

pub type IndicatorFn =
    Arc<dyn Fn(&PriceBars, &Assignment, &MemoizationCache) -> Result<Vec<f64>> + Send + Sync>;
pub type SignalFn = Arc<dyn Fn(&IndicatorFrame, usize) -> bool + Send + Sync>;

/// Named series of equal length. `close` and `open` are always present.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    columns: HashMap<String, Vec<f64>>,
    len: usize,
}

impl IndicatorFrame {
    pub fn from_bars(bars: &PriceBars) -> Self {
        let mut columns = HashMap::new();
        columns.insert(CLOSE.to_string(), bars.close.clone());
        columns.insert(OPEN.to_string(), bars.open.clone());
        Self { columns, len: bars.len() }
    }

    pub fn insert(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.len {
            return Err(StockfilterError::Computation(format!(
                "Indicator {} has {} values for {} bars",
                name,
                values.len(),
                self.len
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Missing columns read as an empty series, which never crosses anything.
    pub fn series(&self, name: &str) -> &[f64] {
        self.get(name).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Per-bar actions and the status of the final bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRun {
    pub actions: Vec<Signal>,
    pub status: Signal,
}

#[derive(Clone)]
struct IndicatorBinding {
    name: String,
    compute: IndicatorFn,
}

#[derive(Clone)]
pub struct StrategyDescriptor {
    name: String,
    parameters: Assignment,
    space: ParameterSpace,
    indicators: Vec<IndicatorBinding>,
    buy: SignalFn,
    sell: SignalFn,
}

impl StrategyDescriptor {
    pub fn new<B, S>(name: &str, buy: B, sell: S) -> Self
    where
        B: Fn(&IndicatorFrame, usize) -> bool + Send + Sync + 'static,
        S: Fn(&IndicatorFrame, usize) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            parameters: Assignment::new(),
            space: ParameterSpace::new(),
            indicators: Vec::new(),
            buy: Arc::new(buy),
            sell: Arc::new(sell),
        }
    }

    pub fn with_default(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name, value);
        self
    }

    pub fn with_space(mut self, space: ParameterSpace) -> Self {
        self.space = space;
        self
    }

    /// Bindings are computed in registration order.
    pub fn with_indicator<F>(mut self, name: &str, compute: F) -> Self
    where
        F: Fn(&PriceBars, &Assignment, &MemoizationCache) -> Result<Vec<f64>> + Send + Sync + 'static,
    {
        self.indicators.push(IndicatorBinding { name: name.to_string(), compute: Arc::new(compute) });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_parameters(&mut self, parameters: &Assignment) {
        self.parameters.merge(parameters);
    }

    pub fn get_parameters(&self) -> &Assignment {
        &self.parameters
    }

    /// Configured copy; the receiver is left untouched.
    pub fn with_parameters(&self, parameters: &Assignment) -> Self {
        let mut copy = self.clone();
        copy.set_parameters(parameters);
        copy
    }

    pub fn optimizer_parameters(&self) -> &ParameterSpace {
        &self.space
    }

    pub fn compute_indicators(&self, bars: &PriceBars, cache: &MemoizationCache) -> Result<IndicatorFrame> {
        let mut frame = IndicatorFrame::from_bars(bars);
        for binding in &self.indicators {
            let values = (binding.compute)(bars, &self.parameters, cache)?;
            frame.insert(&binding.name, values)?;
        }
        Ok(frame)
    }

    /// Walk the bars with a single long/flat flag: a buy only fires when flat
    /// and a sell only when long.
    pub fn signals(&self, bars: &PriceBars, cache: &MemoizationCache) -> Result<SignalRun> {
        let frame = self.compute_indicators(bars, cache)?;

        let mut bought = false;
        let mut actions = Vec::with_capacity(frame.len());
        for i in 0..frame.len() {
            let action = if !bought && (self.buy)(&frame, i) {
                bought = true;
                Signal::Buy
            } else if bought && (self.sell)(&frame, i) {
                bought = false;
                Signal::Sell
            } else {
                Signal::Hold
            };
            actions.push(action);
        }

        let status = match frame.len().checked_sub(1) {
            Some(last) if (self.buy)(&frame, last) => Signal::Buy,
            Some(last) if (self.sell)(&frame, last) => Signal::Sell,
            _ => Signal::Hold,
        };

        Ok(SignalRun { actions, status })
    }
}

impl fmt::Debug for StrategyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("space", &self.space)
            .field("indicators", &self.indicators.iter().map(|b| b.name.as_str()).collect::<Vec<_>>())
            .finish()
    }
}
