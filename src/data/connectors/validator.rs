use crate::error::{Result, StockfilterError};
use polars::prelude::*;
use super::types::{RequiredColumn, VOLUME_ALIASES};
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    /// Resolve OHLC columns (and volume when present) to their actual names
    /// and check that prices are numeric and consistent.
    pub fn validate_ohlcv(df: &DataFrame) -> Result<HashMap<&'static str, String>> {
        let mut column_map = HashMap::new();

        for required in RequiredColumn::all() {
            let aliases = required.aliases();
            let name = Self::find_column(df, &aliases).ok_or_else(|| {
                StockfilterError::DataLoading(format!(
                    "Missing required column: {} (tried aliases: {:?})",
                    required.as_str(),
                    aliases
                ))
            })?;
            column_map.insert(required.as_str(), name.to_string());
        }

        if let Some(volume) = Self::find_column(df, &VOLUME_ALIASES) {
            column_map.insert("volume", volume.to_string());
        }

        for (standard, actual_name) in &column_map {
            let column = df.column(actual_name)?;
            if !matches!(
                column.dtype(),
                DataType::Float64 | DataType::Float32 | DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32
            ) {
                return Err(StockfilterError::DataLoading(format!(
                    "Column '{}' ({}) must be numeric, found {:?}",
                    actual_name,
                    standard,
                    column.dtype()
                )));
            }
        }

        Self::validate_ohlc_relationships(df, &column_map)?;

        Ok(column_map)
    }

    fn find_column<'a>(df: &DataFrame, aliases: &[&'a str]) -> Option<&'a str> {
        let columns = df.get_column_names();
        aliases
            .iter()
            .find(|alias| columns.iter().any(|col| col.as_str() == **alias))
            .copied()
    }

    /// high must bound open/close/low from above, low from below
    fn validate_ohlc_relationships(
        df: &DataFrame,
        column_map: &HashMap<&'static str, String>,
    ) -> Result<()> {
        let get = |key: &str| -> Result<Column> {
            let name = column_map.get(key).ok_or_else(|| {
                StockfilterError::DataLoading(format!("Column {} was not resolved", key))
            })?;
            Ok(df.column(name)?.cast(&DataType::Float64)?)
        };

        let (open, high, low, close) = (get("open")?, get("high")?, get("low")?, get("close")?);
        let (open, high, low, close) = (open.f64()?, high.f64()?, low.f64()?, close.f64()?);

        for i in 0..df.height() {
            if let (Some(o), Some(h), Some(l), Some(c)) =
                (open.get(i), high.get(i), low.get(i), close.get(i))
            {
                if h < l || h < o || h < c || l > o || l > c {
                    return Err(StockfilterError::DataLoading(format!(
                        "Inconsistent prices at row {}: open {}, high {}, low {}, close {}",
                        i, o, h, l, c
                    )));
                }
            }
        }

        Ok(())
    }

    /// Check for null values in any column
    pub fn check_nulls(df: &DataFrame) -> Vec<(String, usize)> {
        df.get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect()
    }
}
