use chrono::{DateTime, Months, Utc};
use polars::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

use super::connectors::CsvConnector;
use super::frame::filter_window;
use crate::error::{Result, StockfilterError};

/// Inclusive time range requested from a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// `months` of history ending at `end`.
    pub fn months_before(end: DateTime<Utc>, months: u32) -> Self {
        let start = end.checked_sub_months(Months::new(months)).unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { start, end }
    }

    pub fn last_months(months: u32) -> Self {
        Self::months_before(Utc::now(), months)
    }

    /// Unbounded window; sources return everything they hold.
    pub fn all() -> Self {
        Self {
            start: DateTime::<Utc>::MIN_UTC,
            end: DateTime::<Utc>::MAX_UTC,
        }
    }
}

/// Provider of OHLCV series indexed by timestamp.
pub trait DataSource: Send + Sync {
    fn name(&self) -> &str;

    /// Columns `open`, `high`, `low`, `close` (optionally `volume`) plus
    /// `timestamp` in epoch milliseconds, ascending.
    fn get_stock_data(&self, symbol: &str, window: &DateWindow) -> Result<DataFrame>;
}

/// Reads `<dir>/<SYMBOL>.csv` exports.
pub struct LocalDataSource {
    dir: PathBuf,
}

impl LocalDataSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for LocalDataSource {
    fn name(&self) -> &str {
        "local"
    }

    fn get_stock_data(&self, symbol: &str, window: &DateWindow) -> Result<DataFrame> {
        if !self.dir.exists() {
            return Err(StockfilterError::NotFound(format!(
                "Stock data path {} does not exist",
                self.dir.display()
            )));
        }
        let path = self.dir.join(format!("{}.csv", symbol.to_uppercase()));
        if !path.exists() {
            return Err(StockfilterError::NotFound(format!(
                "Stock data file {} does not exist",
                path.display()
            )));
        }

        let df = CsvConnector::load_prices(&path)?;
        filter_window(&df, window.start.timestamp_millis(), window.end.timestamp_millis())
    }
}

/// Series held in memory, keyed by upper-cased symbol.
#[derive(Default)]
pub struct InMemoryDataSource {
    frames: HashMap<String, DataFrame>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: &str, df: DataFrame) -> Self {
        self.insert(symbol, df);
        self
    }

    pub fn insert(&mut self, symbol: &str, df: DataFrame) {
        self.frames.insert(symbol.to_uppercase(), df);
    }
}

impl DataSource for InMemoryDataSource {
    fn name(&self) -> &str {
        "memory"
    }

    fn get_stock_data(&self, symbol: &str, window: &DateWindow) -> Result<DataFrame> {
        let df = self
            .frames
            .get(&symbol.to_uppercase())
            .ok_or_else(|| StockfilterError::NotFound(format!("No data for symbol {}", symbol)))?;
        filter_window(df, window.start.timestamp_millis(), window.end.timestamp_millis())
    }
}
