use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::rates;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;

/// Outcome of resolving the rate for one (year, month) period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLookup {
    Exact(f64),
    /// No direct rate; inherited from the latest earlier period that has one.
    Filled { rate: f64, from: (i32, u32) },
    Missing,
}

impl RateLookup {
    pub fn rate(&self) -> Option<f64> {
        match self {
            RateLookup::Exact(rate) | RateLookup::Filled { rate, .. } => Some(*rate),
            RateLookup::Missing => None,
        }
    }
}

/// Monthly reference-currency rates keyed by (year, month), in calendar order.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRateTable {
    rates: BTreeMap<(i32, u32), f64>,
}

impl ExchangeRateTable {
    pub fn from_entries<I>(entries: I) -> PipelineResult<Self>
    where
        I: IntoIterator<Item = (i32, u32, f64)>,
    {
        let mut rates = BTreeMap::new();
        for (year, month, rate) in entries {
            if !(1..=12).contains(&month) {
                return Err(PipelineError::ExchangeRates(format!(
                    "month {} of year {} is outside 1-12",
                    month, year
                )));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(PipelineError::ExchangeRates(format!(
                    "rate for {}-{:02} must be positive, got {}",
                    year, month, rate
                )));
            }
            if rates.insert((year, month), rate).is_some() {
                return Err(PipelineError::ExchangeRates(format!(
                    "duplicate rate for {}-{:02}",
                    year, month
                )));
            }
        }
        Ok(Self { rates })
    }

    /// Build the table from a frame with `year`, `month` and `rate_column`.
    /// Header names are compared trimmed and lower-cased.
    pub fn from_dataframe(df: &DataFrame, rate_column: &str) -> PipelineResult<Self> {
        let mut df = df.clone();
        let normalized: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();
        df.set_column_names(normalized.as_slice())?;

        let rate_column = rate_column.trim().to_lowercase();
        let missing: Vec<&str> = [rates::YEAR, rates::MONTH, rate_column.as_str()]
            .into_iter()
            .filter(|c| df.column(c).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::ExchangeRates(format!(
                "missing columns: {}",
                missing.join(", ")
            )));
        }

        let years = df.column(rates::YEAR)?.cast(&DataType::Int32)?;
        let months = df.column(rates::MONTH)?.cast(&DataType::Int32)?;
        let values = df.column(&rate_column)?.cast(&DataType::Float64)?;

        let mut entries = Vec::with_capacity(df.height());
        for (row, ((year, month), rate)) in years
            .i32()?
            .into_iter()
            .zip(months.i32()?.into_iter())
            .zip(values.f64()?.into_iter())
            .enumerate()
        {
            match (year, month, rate) {
                (Some(year), Some(month), Some(rate)) if month > 0 => {
                    entries.push((year, month as u32, rate))
                }
                _ => {
                    return Err(PipelineError::ExchangeRates(format!(
                        "row {} has an empty or invalid year/month/rate",
                        row
                    )));
                }
            }
        }

        Self::from_entries(entries)
    }

    pub fn from_csv_bytes(bytes: &[u8], rate_column: &str) -> PipelineResult<Self> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
            .finish()?;
        Self::from_dataframe(&df, rate_column)
    }

    pub fn exact(&self, year: i32, month: u32) -> Option<f64> {
        self.rates.get(&(year, month)).copied()
    }

    /// Exact rate, or the rate of the latest earlier period in calendar order.
    pub fn resolve(&self, year: i32, month: u32) -> RateLookup {
        if let Some(rate) = self.exact(year, month) {
            return RateLookup::Exact(rate);
        }
        match self.rates.range(..(year, month)).next_back() {
            Some((&from, &rate)) => RateLookup::Filled { rate, from },
            None => RateLookup::Missing,
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}
