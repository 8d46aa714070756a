use polars::error::PolarsError;
use serde::Serialize;
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Schema '{schema}' is missing columns: {}", missing.join(", "))]
    Schema { schema: String, missing: Vec<String> },

    #[error("No exchange rate for {year}-{month:02} and no earlier period to fill from ({rows} rows excluded)")]
    RateResolution { year: i32, month: u32, rows: usize },

    #[error("Computation failed: {0}")]
    Computation(String),

    #[error("Failed to write {key}: {reason}")]
    Write { key: String, reason: String },

    #[error("Failed to read {key}: {reason}")]
    Read { key: String, reason: String },

    #[error("Invalid exchange rate table: {0}")]
    ExchangeRates(String),

    #[error("Invalid partition key: {0}")]
    PartitionKey(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// Failure category recorded in a run report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Schema,
    RateResolution,
    Computation,
    Write,
    Read,
}

impl PipelineError {
    pub fn kind(&self) -> FailureKind {
        match self {
            PipelineError::Schema { .. } => FailureKind::Schema,
            PipelineError::RateResolution { .. } => FailureKind::RateResolution,
            PipelineError::Write { .. } => FailureKind::Write,
            PipelineError::Read { .. } | PipelineError::PartitionKey(_) => FailureKind::Read,
            PipelineError::Computation(_)
            | PipelineError::ExchangeRates(_)
            | PipelineError::Polars(_) => FailureKind::Computation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_lists_missing_columns() {
        let err = PipelineError::Schema {
            schema: "bronze".to_string(),
            missing: vec!["FECHA".to_string(), "MONTO_IVA".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Schema 'bronze' is missing columns: FECHA, MONTO_IVA"
        );
        assert_eq!(err.kind(), FailureKind::Schema);
    }

    #[test]
    fn test_polars_errors_are_computation_failures() {
        let err: PipelineError = PolarsError::ComputeError("boom".into()).into();
        assert_eq!(err.kind(), FailureKind::Computation);
    }
}
