use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::{bronze, gold, partition, silver};
use crate::models::{BranchTrend, ObjectiveClass, PartitionKey, PartitionSummary, partition_keys};
use crate::processor::trend_detector::TrendDetector;
use polars::prelude::*;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationSettings {
    /// Target margin ratio for objective compliance.
    pub objective_margin_ratio: f64,
    /// Minimum correlation for a branch to follow the global trend.
    pub trend_correlation_threshold: f64,
}

impl Default for AggregationSettings {
    fn default() -> Self {
        Self {
            objective_margin_ratio: 0.20,
            trend_correlation_threshold: 0.70,
        }
    }
}

/// Best candidate per key in a single stable pass; on ties the first one seen wins.
pub fn first_max<K: Ord, V>(candidates: impl IntoIterator<Item = (K, V, f64)>) -> BTreeMap<K, V> {
    let mut best: BTreeMap<K, (V, f64)> = BTreeMap::new();
    for (key, value, score) in candidates {
        if score.is_nan() {
            continue;
        }
        match best.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert((value, score));
            }
            Entry::Occupied(mut slot) => {
                if score > slot.get().1 {
                    slot.insert((value, score));
                }
            }
        }
    }
    best.into_iter().map(|(key, (value, _))| (key, value)).collect()
}

fn margin_ratio(margin: &str, revenue: &str) -> Expr {
    when(col(revenue).neq(lit(0.0)))
        .then(col(margin) / col(revenue))
        .otherwise(lit(0.0))
}

pub struct AggregationEngine {
    settings: AggregationSettings,
}

impl AggregationEngine {
    pub fn new(settings: AggregationSettings) -> Self {
        Self { settings }
    }

    /// Roll enriched lines (with partition columns) up to one row per
    /// partition and product, carrying the partition summary on every row.
    pub fn aggregate(&self, lines: &DataFrame) -> PipelineResult<DataFrame> {
        let products = self.product_aggregates(lines)?;
        let summaries = self.partition_summaries(lines, &products)?;
        let result = self.attach_summaries(products, &summaries)?;

        info!(
            "🏁 Aggregated {} lines into {} product rows across {} partitions",
            lines.height(),
            result.height(),
            summaries.len()
        );
        Ok(result)
    }

    pub fn product_aggregates(&self, lines: &DataFrame) -> PipelineResult<DataFrame> {
        let df = lines
            .clone()
            .lazy()
            .group_by_stable([
                col(partition::BRANCH),
                col(partition::YEAR),
                col(partition::MONTH),
                col(bronze::PRODUCT_ID),
                col(bronze::PRODUCT_NAME),
            ])
            .agg([
                col(bronze::QUANTITY).cast(DataType::Int64).sum(),
                col(silver::REVENUE_LOCAL).sum(),
                col(silver::COST_LOCAL).sum(),
                col(silver::MARGIN_LOCAL).sum(),
                col(silver::REVENUE_REF).sum(),
                col(silver::COST_REF).sum(),
                col(silver::MARGIN_REF).sum(),
            ])
            .with_columns([
                margin_ratio(silver::MARGIN_LOCAL, silver::REVENUE_LOCAL).alias(gold::MARGIN_RATIO_LOCAL),
                margin_ratio(silver::MARGIN_REF, silver::REVENUE_REF).alias(gold::MARGIN_RATIO_REF),
            ])
            .collect()?;
        Ok(df)
    }

    pub fn partition_summaries(
        &self,
        lines: &DataFrame,
        products: &DataFrame,
    ) -> PipelineResult<BTreeMap<PartitionKey, PartitionSummary>> {
        let top_products = self.top_margin_products(products)?;
        let top_days = self.top_days_of_month(lines)?;
        let top_weekdays = self.top_weekdays(lines)?;
        let trends = self.trends(lines)?;

        let mut summaries = BTreeMap::new();
        for key in partition_keys(products)? {
            if summaries.contains_key(&key) {
                continue;
            }
            let trend = trends
                .get(&key.period())
                .and_then(|branches| branches.get(&key.branch))
                .copied()
                .unwrap_or_default();

            let summary = PartitionSummary {
                top_margin_product: top_products.get(&key).cloned(),
                top_sales_day_of_month: top_days.get(&key).copied(),
                top_sales_weekday: top_weekdays.get(&key).cloned(),
                trend,
            };
            summaries.insert(key, summary);
        }
        Ok(summaries)
    }

    fn top_margin_products(
        &self,
        products: &DataFrame,
    ) -> PipelineResult<BTreeMap<PartitionKey, String>> {
        let keys = partition_keys(products)?;
        let names = products.column(bronze::PRODUCT_NAME)?.cast(&DataType::String)?;
        let margins = products.column(silver::MARGIN_REF)?.cast(&DataType::Float64)?;

        let candidates = keys
            .into_iter()
            .zip(names.str()?.into_iter())
            .zip(margins.f64()?.into_iter())
            .filter_map(|((key, name), margin)| Some((key, name?.to_string(), margin?)));
        Ok(first_max(candidates))
    }

    /// Reference-currency revenue summed per partition and bucket, buckets in first-seen order.
    fn bucket_totals(&self, lines: &DataFrame, bucket: &str) -> PipelineResult<DataFrame> {
        let df = lines
            .clone()
            .lazy()
            .group_by_stable([
                col(partition::BRANCH),
                col(partition::YEAR),
                col(partition::MONTH),
                col(bucket),
            ])
            .agg([col(silver::REVENUE_REF).sum()])
            .collect()?;
        Ok(df)
    }

    fn top_days_of_month(&self, lines: &DataFrame) -> PipelineResult<BTreeMap<PartitionKey, i32>> {
        let totals = self.bucket_totals(lines, silver::DAY_OF_MONTH)?;
        let keys = partition_keys(&totals)?;
        let days = totals.column(silver::DAY_OF_MONTH)?.cast(&DataType::Int32)?;
        let sums = totals.column(silver::REVENUE_REF)?.cast(&DataType::Float64)?;

        let candidates = keys
            .into_iter()
            .zip(days.i32()?.into_iter())
            .zip(sums.f64()?.into_iter())
            .filter_map(|((key, day), total)| Some((key, day?, total?)));
        Ok(first_max(candidates))
    }

    fn top_weekdays(&self, lines: &DataFrame) -> PipelineResult<BTreeMap<PartitionKey, String>> {
        let totals = self.bucket_totals(lines, silver::WEEKDAY)?;
        let keys = partition_keys(&totals)?;
        let weekdays = totals.column(silver::WEEKDAY)?.cast(&DataType::String)?;
        let sums = totals.column(silver::REVENUE_REF)?.cast(&DataType::Float64)?;

        let candidates = keys
            .into_iter()
            .zip(weekdays.str()?.into_iter())
            .zip(sums.f64()?.into_iter())
            .filter_map(|((key, weekday), total)| Some((key, weekday?.to_string(), total?)));
        Ok(first_max(candidates))
    }

    /// Trend flags per reporting period, then per branch.
    fn trends(
        &self,
        lines: &DataFrame,
    ) -> PipelineResult<BTreeMap<(i32, u32), HashMap<String, BranchTrend>>> {
        let detector = TrendDetector::new(self.settings.trend_correlation_threshold);

        let mut trends = BTreeMap::new();
        for period_lines in lines.partition_by_stable([partition::YEAR, partition::MONTH], true)? {
            let Some(key) = partition_keys(&period_lines)?.into_iter().next() else {
                continue;
            };
            trends.insert(key.period(), detector.detect(&period_lines)?);
        }
        Ok(trends)
    }

    /// Broadcast each partition's summary onto its product rows and classify objectives.
    fn attach_summaries(
        &self,
        mut products: DataFrame,
        summaries: &BTreeMap<PartitionKey, PartitionSummary>,
    ) -> PipelineResult<DataFrame> {
        let keys = partition_keys(&products)?;
        let n = keys.len();

        let mut top_product = Vec::with_capacity(n);
        let mut top_day = Vec::with_capacity(n);
        let mut top_weekday = Vec::with_capacity(n);
        let mut weekly_corr = Vec::with_capacity(n);
        let mut weekly_follows = Vec::with_capacity(n);
        let mut monthly_corr = Vec::with_capacity(n);
        let mut monthly_follows = Vec::with_capacity(n);

        for key in &keys {
            let summary = summaries.get(key).ok_or_else(|| {
                PipelineError::Computation(format!("no partition summary for {}", key))
            })?;
            top_product.push(summary.top_margin_product.clone());
            top_day.push(summary.top_sales_day_of_month);
            top_weekday.push(summary.top_sales_weekday.clone());
            weekly_corr.push(summary.trend.weekly.correlation);
            weekly_follows.push(summary.trend.weekly.follows);
            monthly_corr.push(summary.trend.monthly.correlation);
            monthly_follows.push(summary.trend.monthly.follows);
        }

        let objective: Vec<&str> = products
            .column(gold::MARGIN_RATIO_REF)?
            .f64()?
            .into_iter()
            .map(|ratio| ObjectiveClass::classify(ratio, self.settings.objective_margin_ratio).label())
            .collect();

        products.with_column(Series::new(gold::TOP_MARGIN_PRODUCT.into(), top_product))?;
        products.with_column(Series::new(gold::TOP_SALES_DAY_OF_MONTH.into(), top_day))?;
        products.with_column(Series::new(gold::TOP_SALES_WEEKDAY.into(), top_weekday))?;
        products.with_column(Series::new(gold::OBJECTIVE_COMPLIANCE.into(), objective))?;
        products.with_column(Series::new(gold::WEEKLY_CORRELATION.into(), weekly_corr))?;
        products.with_column(Series::new(gold::FOLLOWS_WEEKLY_TREND.into(), weekly_follows))?;
        products.with_column(Series::new(gold::MONTHLY_CORRELATION.into(), monthly_corr))?;
        products.with_column(Series::new(gold::FOLLOWS_MONTHLY_TREND.into(), monthly_follows))?;

        Ok(products)
    }
}
