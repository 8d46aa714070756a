//! Weekly and monthly sales-seasonality detection.
//!
//! Each branch's average reference-currency sales per bucket (weekday or
//! day of month) is correlated against the profile of all lines of the
//! period pooled together.

use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::{partition, silver};
use crate::models::{BranchTrend, TrendOutcome, weekday_index};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Fewest shared buckets for which a correlation is defined.
pub const MIN_OVERLAP: usize = 2;

/// Monday = 0 position of each line's weekday label.
const WEEKDAY_BUCKET: &str = "weekday_bucket";

/// Mean sales per bucket, ordered by bucket key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrendProfile {
    buckets: BTreeMap<i64, f64>,
}

impl TrendProfile {
    /// Mean reference-currency revenue per value of the `bucket` column.
    pub fn from_frame(lines: &DataFrame, bucket: &str) -> PipelineResult<Self> {
        let means = lines
            .clone()
            .lazy()
            .group_by([col(bucket)])
            .agg([col(silver::REVENUE_REF).mean()])
            .collect()?;

        let keys = means.column(bucket)?.cast(&DataType::Int64)?;
        let values = means.column(silver::REVENUE_REF)?.cast(&DataType::Float64)?;
        let buckets = keys
            .i64()?
            .into_iter()
            .zip(values.f64()?.into_iter())
            .filter_map(|(key, mean)| Some((key?, mean?)))
            .collect();
        Ok(Self { buckets })
    }

    pub fn get(&self, key: i64) -> Option<f64> {
        self.buckets.get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Pearson correlation over the buckets both profiles define.
    pub fn correlation(&self, global: &TrendProfile) -> Option<f64> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = self
            .buckets
            .iter()
            .filter_map(|(key, value)| global.get(*key).map(|g| (*value, g)))
            .unzip();
        pearson(&xs, &ys)
    }
}

/// `None` for fewer than [`MIN_OVERLAP`] points or a flat series.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_OVERLAP {
        return None;
    }

    let x = Array1::from(xs.to_vec());
    let y = Array1::from(ys.to_vec());
    let dx = &x - x.mean()?;
    let dy = &y - y.mean()?;

    let denominator = (dx.dot(&dx) * dy.dot(&dy)).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }

    let r = dx.dot(&dy) / denominator;
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Lines with their weekday label turned into a sortable bucket.
fn with_weekday_bucket(lines: &DataFrame) -> PipelineResult<DataFrame> {
    for column in [silver::DAY_OF_MONTH, silver::REVENUE_REF] {
        if lines.column(column)?.null_count() > 0 {
            return Err(PipelineError::Computation(format!(
                "{} has empty values",
                column
            )));
        }
    }

    let labels = lines.column(silver::WEEKDAY)?.cast(&DataType::String)?;
    let buckets = labels
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label
                .and_then(weekday_index)
                .map(|index| index as i64)
                .ok_or_else(|| {
                    PipelineError::Computation(format!("row {} has an unknown weekday label", row))
                })
        })
        .collect::<PipelineResult<Vec<i64>>>()?;

    let mut lines = lines.clone();
    lines.with_column(Series::new(WEEKDAY_BUCKET.into(), buckets))?;
    Ok(lines)
}

pub struct TrendDetector {
    threshold: f64,
}

impl TrendDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Weekly and monthly trend flags for every branch in `lines`, which
    /// must hold a single reporting period.
    pub fn detect(&self, lines: &DataFrame) -> PipelineResult<HashMap<String, BranchTrend>> {
        let lines = with_weekday_bucket(lines)?;
        let global_weekly = TrendProfile::from_frame(&lines, WEEKDAY_BUCKET)?;
        let global_monthly = TrendProfile::from_frame(&lines, silver::DAY_OF_MONTH)?;

        let mut trends = HashMap::new();
        for branch_lines in lines.partition_by_stable([partition::BRANCH], true)? {
            let branch = branch_lines
                .column(partition::BRANCH)?
                .cast(&DataType::String)?
                .str()?
                .get(0)
                .map(str::to_owned);
            let Some(branch) = branch else {
                continue;
            };

            let weekly = TrendProfile::from_frame(&branch_lines, WEEKDAY_BUCKET)?;
            let monthly = TrendProfile::from_frame(&branch_lines, silver::DAY_OF_MONTH)?;

            let trend = BranchTrend {
                weekly: TrendOutcome::from_correlation(
                    weekly.correlation(&global_weekly),
                    self.threshold,
                ),
                monthly: TrendOutcome::from_correlation(
                    monthly.correlation(&global_monthly),
                    self.threshold,
                ),
            };
            trends.insert(branch, trend);
        }
        Ok(trends)
    }
}
