use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::{bronze, silver};
use crate::models::weekday_index;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

/// Named required-column sets checked at each layer boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchSchema {
    Bronze,
    Silver,
}

impl BatchSchema {
    pub fn name(&self) -> &'static str {
        match self {
            BatchSchema::Bronze => "bronze",
            BatchSchema::Silver => "silver",
        }
    }

    pub fn required_columns(&self) -> Vec<&'static str> {
        match self {
            BatchSchema::Bronze => bronze::REQUIRED.to_vec(),
            BatchSchema::Silver => bronze::REQUIRED
                .iter()
                .chain(silver::DERIVED.iter())
                .copied()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaReport {
    pub schema: &'static str,
    pub missing: Vec<String>,
    /// Advisory only.
    pub unexpected: Vec<String>,
}

impl SchemaReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
    }

    /// Fail on missing columns; log unexpected ones and carry on.
    pub fn into_result(self) -> PipelineResult<Self> {
        if !self.is_ok() {
            return Err(PipelineError::Schema {
                schema: self.schema.to_string(),
                missing: self.missing,
            });
        }
        if !self.unexpected.is_empty() {
            warn!(
                "⚠️ Columns not expected in {} schema: {}",
                self.schema,
                self.unexpected.join(", ")
            );
        }
        Ok(self)
    }
}

pub struct SchemaValidator;

impl SchemaValidator {
    pub fn validate(&self, df: &DataFrame, schema: BatchSchema) -> SchemaReport {
        let required = schema.required_columns();
        let present: HashSet<&str> = df.get_column_names_str().into_iter().collect();
        let expected: HashSet<&str> = required.iter().copied().collect();

        let missing = required
            .iter()
            .filter(|c| !present.contains(*c))
            .map(|c| c.to_string())
            .collect();
        let unexpected = df
            .get_column_names_str()
            .into_iter()
            .filter(|c| !expected.contains(c))
            .map(|c| c.to_string())
            .collect();

        SchemaReport {
            schema: schema.name(),
            missing,
            unexpected,
        }
    }

    /// Validate and fail the batch if any required column is absent.
    pub fn ensure(&self, df: &DataFrame, schema: BatchSchema) -> PipelineResult<SchemaReport> {
        let report = self.validate(df, schema).into_result()?;
        info!(
            "✅ {} schema check passed: {} required columns present",
            report.schema,
            schema.required_columns().len()
        );
        Ok(report)
    }

    /// Row-level checks on an enriched (silver) batch: a known weekday label,
    /// a day of month in 1-31 and a reference revenue on every line.
    pub fn check_enriched_values(&self, df: &DataFrame) -> PipelineResult<()> {
        let weekdays = df.column(silver::WEEKDAY)?.cast(&DataType::String)?;
        if let Some(row) = weekdays
            .str()?
            .into_iter()
            .position(|label| label.and_then(weekday_index).is_none())
        {
            return Err(PipelineError::Computation(format!(
                "row {} has an unknown {} label",
                row,
                silver::WEEKDAY
            )));
        }

        let days = df.column(silver::DAY_OF_MONTH)?.cast(&DataType::Int32)?;
        if let Some(row) = days
            .i32()?
            .into_iter()
            .position(|day| !day.is_some_and(|d| (1..=31).contains(&d)))
        {
            return Err(PipelineError::Computation(format!(
                "row {} has an empty or out-of-range {}",
                row,
                silver::DAY_OF_MONTH
            )));
        }

        let revenue = df.column(silver::REVENUE_REF)?;
        if revenue.null_count() > 0 {
            return Err(PipelineError::Computation(format!(
                "{} empty values in {}",
                revenue.null_count(),
                silver::REVENUE_REF
            )));
        }

        Ok(())
    }

    /// Trim and upper-case column names, as ingestion delivers them.
    pub fn normalize_column_names(&self, df: &mut DataFrame) -> PipelineResult<()> {
        let normalized: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_uppercase())
            .collect();
        df.set_column_names(normalized.as_slice())?;
        Ok(())
    }
}
