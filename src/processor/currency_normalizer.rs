use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::{bronze, partition, silver};
use crate::models::{ExchangeRateTable, RateLookup};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::{error, info, warn};

/// A period whose rate could not be resolved even after forward-fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPeriod {
    pub year: i32,
    pub month: u32,
    pub rows: usize,
}

impl UnresolvedPeriod {
    pub fn to_error(&self) -> PipelineError {
        PipelineError::RateResolution {
            year: self.year,
            month: self.month,
            rows: self.rows,
        }
    }
}

#[derive(Debug)]
pub struct NormalizedBatch {
    /// Rated rows only, with local and reference-currency metrics.
    pub frame: DataFrame,
    /// Rows that had no direct rate and inherited an earlier one.
    pub filled_rows: usize,
    /// Periods excluded because no rate exists at or before them.
    pub unresolved: Vec<UnresolvedPeriod>,
}

pub struct CurrencyNormalizer<'a> {
    rates: &'a ExchangeRateTable,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(rates: &'a ExchangeRateTable) -> Self {
        Self { rates }
    }

    /// Compute local metrics, attach the (forward-filled) monthly rate taken
    /// from the row's partition year/month, and convert to the reference currency.
    pub fn normalize(&self, df: DataFrame) -> PipelineResult<NormalizedBatch> {
        let quantity = col(bronze::QUANTITY).cast(DataType::Float64);
        let mut df = df
            .lazy()
            .with_columns([
                (quantity.clone() * col(bronze::UNIT_VALUE).cast(DataType::Float64))
                    .alias(silver::REVENUE_LOCAL),
                (quantity * col(bronze::UNIT_COST).cast(DataType::Float64))
                    .alias(silver::COST_LOCAL),
            ])
            .with_column((col(silver::REVENUE_LOCAL) - col(silver::COST_LOCAL)).alias(silver::MARGIN_LOCAL))
            .collect()?;

        let (row_rates, filled_rows, unresolved) = self.resolve_rows(&df)?;

        if filled_rows > 0 {
            warn!(
                "⚠️ {} rows had no exchange rate for their month; forward-filled from earlier periods",
                filled_rows
            );
        }
        for period in &unresolved {
            error!(
                "❌ No exchange rate at or before {}-{:02}; excluding {} rows",
                period.year, period.month, period.rows
            );
        }

        df.with_column(Series::new(silver::EXCHANGE_RATE.into(), row_rates))?;

        let frame = df
            .lazy()
            .filter(col(silver::EXCHANGE_RATE).is_not_null())
            .with_columns([
                (col(silver::REVENUE_LOCAL) / col(silver::EXCHANGE_RATE)).alias(silver::REVENUE_REF),
                (col(silver::COST_LOCAL) / col(silver::EXCHANGE_RATE)).alias(silver::COST_REF),
                (col(silver::MARGIN_LOCAL) / col(silver::EXCHANGE_RATE)).alias(silver::MARGIN_REF),
            ])
            .collect()?;

        info!(
            "💱 Converted {} rows to reference currency ({} forward-filled, {} excluded)",
            frame.height(),
            filled_rows,
            unresolved.iter().map(|p| p.rows).sum::<usize>()
        );

        Ok(NormalizedBatch {
            frame,
            filled_rows,
            unresolved,
        })
    }

    fn resolve_rows(
        &self,
        df: &DataFrame,
    ) -> PipelineResult<(Vec<Option<f64>>, usize, Vec<UnresolvedPeriod>)> {
        let years = df.column(partition::YEAR)?.cast(&DataType::Int32)?;
        let months = df.column(partition::MONTH)?.cast(&DataType::Int32)?;

        let mut lookups: HashMap<(i32, i32), RateLookup> = HashMap::new();
        let mut unresolved: BTreeMap<(i32, u32), usize> = BTreeMap::new();
        let mut row_rates = Vec::with_capacity(df.height());
        let mut filled_rows = 0;

        for (year, month) in years.i32()?.into_iter().zip(months.i32()?.into_iter()) {
            let (Some(year), Some(month)) = (year, month) else {
                return Err(PipelineError::Computation(
                    "row without partition year/month cannot be rated".to_string(),
                ));
            };
            if !(1..=12).contains(&month) {
                return Err(PipelineError::Computation(format!(
                    "partition month {} is outside 1-12",
                    month
                )));
            }

            let lookup = *lookups
                .entry((year, month))
                .or_insert_with(|| self.rates.resolve(year, month as u32));

            match lookup {
                RateLookup::Exact(rate) => row_rates.push(Some(rate)),
                RateLookup::Filled { rate, .. } => {
                    filled_rows += 1;
                    row_rates.push(Some(rate));
                }
                RateLookup::Missing => {
                    *unresolved.entry((year, month as u32)).or_insert(0) += 1;
                    row_rates.push(None);
                }
            }
        }

        let unresolved = unresolved
            .into_iter()
            .map(|((year, month), rows)| UnresolvedPeriod { year, month, rows })
            .collect();

        Ok((row_rates, filled_rows, unresolved))
    }
}
