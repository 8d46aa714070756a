use crate::error::PipelineResult;
use crate::models::columns::{bronze, silver};
use polars::prelude::*;
use tracing::info;

#[derive(Debug)]
pub struct DedupOutcome {
    pub frame: DataFrame,
    pub duplicates_removed: usize,
    pub non_positive_removed: usize,
}

/// Columns identifying one sale line.
const LINE_KEY: [&str; 3] = [bronze::DATE, bronze::TICKET_NUMBER, bronze::PRODUCT_ID];

/// Drops repeated (date, ticket, product) lines, then non-positive revenue lines.
pub struct Deduplicator;

impl Deduplicator {
    pub fn apply(&self, df: &DataFrame) -> PipelineResult<DedupOutcome> {
        let deduped = self.drop_duplicate_lines(df)?;
        let duplicates_removed = df.height() - deduped.height();

        let frame = self.drop_non_positive_revenue(deduped)?;
        let non_positive_removed = df.height() - duplicates_removed - frame.height();

        info!(
            "🧹 Cleaned batch: {} duplicates and {} non-positive revenue lines removed, {} remain",
            duplicates_removed,
            non_positive_removed,
            frame.height()
        );

        Ok(DedupOutcome {
            frame,
            duplicates_removed,
            non_positive_removed,
        })
    }

    /// Keep the first occurrence of each (date, ticket, product id).
    pub fn drop_duplicate_lines(&self, df: &DataFrame) -> PipelineResult<DataFrame> {
        let subset: Vec<String> = LINE_KEY.iter().map(|c| c.to_string()).collect();
        Ok(df.unique_stable(Some(subset.as_slice()), UniqueKeepStrategy::First, None)?)
    }

    pub fn drop_non_positive_revenue(&self, df: DataFrame) -> PipelineResult<DataFrame> {
        Ok(df
            .lazy()
            .filter(col(silver::REVENUE_LOCAL).gt(lit(0.0)))
            .collect()?)
    }
}
