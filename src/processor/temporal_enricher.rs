use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::{bronze, silver};
use crate::models::weekday_label;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use tracing::info;

// 1970-01-01 counted from 0001-01-01 (day 1).
const EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct TemporalEnricher;

impl TemporalEnricher {
    /// Add day-of-month (1-31) and the localized weekday label from the transaction date.
    pub fn enrich(&self, df: &mut DataFrame) -> PipelineResult<()> {
        let dates = self.transaction_dates(df)?;

        let days: Vec<i32> = dates.iter().map(|d| d.day() as i32).collect();
        let weekdays: Vec<&str> = dates.iter().map(|d| weekday_label(d.weekday())).collect();

        df.with_column(Series::new(silver::DAY_OF_MONTH.into(), days))?;
        df.with_column(Series::new(silver::WEEKDAY.into(), weekdays))?;

        info!("🕒 Added {} and {} for {} rows", silver::DAY_OF_MONTH, silver::WEEKDAY, df.height());
        Ok(())
    }

    /// Every row's date; an unparseable or empty date fails the batch.
    pub fn transaction_dates(&self, df: &DataFrame) -> PipelineResult<Vec<NaiveDate>> {
        let days = df
            .column(bronze::DATE)?
            .cast(&DataType::Date)?
            .cast(&DataType::Int32)?;

        days.i32()?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value
                    .and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + EPOCH_DAYS_FROM_CE))
                    .ok_or_else(|| {
                        PipelineError::Computation(format!(
                            "unparseable {} at row {}",
                            bronze::DATE,
                            row
                        ))
                    })
            })
            .collect()
    }
}
