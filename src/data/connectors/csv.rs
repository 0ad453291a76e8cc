use crate::data::frame::TIMESTAMP;
use crate::error::{Result, StockfilterError};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::path::Path;
use super::{types::DATE_ALIASES, validator::DataValidator};

pub struct CsvConnector;

impl CsvConnector {
    /// Load CSV file into DataFrame
    pub fn load<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()
            .map_err(|e| StockfilterError::DataLoading(format!("Failed to read CSV: {}", e)))?;

        Ok(df)
    }

    /// Load a price export, normalise its columns and attach an epoch-millisecond
    /// `timestamp` column sorted ascending.
    pub fn load_prices<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
        let df = Self::load(&path)?;
        let df = Self::normalize_columns(df)?;
        let df = Self::with_timestamps(df)?;

        let nulls = DataValidator::check_nulls(&df);
        if !nulls.is_empty() {
            log::warn!("Null values detected in {}: {:?}", path.as_ref().display(), nulls);
        }

        Ok(df)
    }

    /// Rename OHLC(V) columns to standard lowercase names
    pub fn normalize_columns(mut df: DataFrame) -> Result<DataFrame> {
        let column_map = DataValidator::validate_ohlcv(&df)?;

        for (standard_name, actual_name) in column_map {
            if actual_name != standard_name {
                df.rename(&actual_name, standard_name.into())
                    .map_err(|e| StockfilterError::DataLoading(format!("Failed to rename column: {}", e)))?;
            }
        }

        Ok(df)
    }

    /// Replace the date column with epoch milliseconds under `timestamp`.
    pub fn with_timestamps(df: DataFrame) -> Result<DataFrame> {
        let Some(date_col) = Self::detect_datetime_column(&df) else {
            return Err(StockfilterError::DataLoading(
                "No date column found (expected one of Date, date, Datetime, timestamp)".to_string(),
            ));
        };

        let column = df.column(&date_col)?;
        let millis: Vec<i64> = match column.dtype() {
            DataType::Int64 => column.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect(),
            DataType::String => column
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.and_then(parse_timestamp_millis).ok_or_else(|| {
                        StockfilterError::DataLoading(format!(
                            "Unparseable date at row {}: {:?}",
                            row, v
                        ))
                    })
                })
                .collect::<Result<_>>()?,
            other => {
                return Err(StockfilterError::DataLoading(format!(
                    "Date column '{}' has unsupported type {:?}",
                    date_col, other
                )))
            }
        };

        let mut df = df.drop(&date_col)?;
        df.with_column(Series::new(TIMESTAMP.into(), millis))?;
        let df = df.sort([TIMESTAMP], SortMultipleOptions::default())?;
        Ok(df)
    }

    fn detect_datetime_column(df: &DataFrame) -> Option<String> {
        let columns = df.get_column_names();
        DATE_ALIASES
            .iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == **alias))
            .map(|alias| alias.to_string())
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[+offset]` and plain `YYYY-MM-DD`.
pub fn parse_timestamp_millis(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}
