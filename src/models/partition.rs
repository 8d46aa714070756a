use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::partition;
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static PARTITION_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"branch=([^/]+)/year=(\d+)/month=(\d+)/").expect("partition path regex is valid")
});

/// The (branch, year, month) triple that scopes grouping, layout and trends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionKey {
    pub branch: String,
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    pub fn new(branch: impl Into<String>, year: i32, month: u32) -> PipelineResult<Self> {
        let branch = branch.into();
        if branch.trim().is_empty() {
            return Err(PipelineError::PartitionKey("branch name is empty".to_string()));
        }
        if branch.contains('/') || branch.contains('\\') {
            return Err(PipelineError::PartitionKey(format!(
                "branch name '{}' contains a path separator",
                branch
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(PipelineError::PartitionKey(format!(
                "month {} is outside 1-12 for branch '{}'",
                month, branch
            )));
        }
        Ok(Self { branch, year, month })
    }

    /// Parse the key out of an object path such as
    /// `silver/ventas/branch=Centro/year=2024/month=3/ventas_Centro_2024-3.parquet`.
    pub fn from_path(path: &str) -> PipelineResult<Self> {
        let captures = PARTITION_PATH.captures(path).ok_or_else(|| {
            PipelineError::PartitionKey(format!("no branch/year/month segment in path: {}", path))
        })?;

        let year = captures[2]
            .parse::<i32>()
            .map_err(|e| PipelineError::PartitionKey(format!("bad year in {}: {}", path, e)))?;
        let month = captures[3]
            .parse::<u32>()
            .map_err(|e| PipelineError::PartitionKey(format!("bad month in {}: {}", path, e)))?;

        Self::new(&captures[1], year, month)
    }

    /// Directory segment `branch=<name>/year=<yyyy>/month=<m>/`.
    pub fn prefix(&self) -> String {
        format!(
            "branch={}/year={}/month={}/",
            self.branch, self.year, self.month
        )
    }

    pub fn period(&self) -> (i32, u32) {
        (self.year, self.month)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}-{:02}", self.branch, self.year, self.month)
    }
}

/// Read the partition key of every row; rows without a complete key are an error.
pub fn partition_keys(df: &DataFrame) -> PipelineResult<Vec<PartitionKey>> {
    let branches = df.column(partition::BRANCH)?.cast(&DataType::String)?;
    let years = df.column(partition::YEAR)?.cast(&DataType::Int32)?;
    let months = df.column(partition::MONTH)?.cast(&DataType::Int32)?;

    let mut keys = Vec::with_capacity(df.height());
    for (row, ((branch, year), month)) in branches
        .str()?
        .into_iter()
        .zip(years.i32()?.into_iter())
        .zip(months.i32()?.into_iter())
        .enumerate()
    {
        match (branch, year, month) {
            (Some(branch), Some(year), Some(month)) if month > 0 => {
                keys.push(PartitionKey::new(branch, year, month as u32)?);
            }
            _ => {
                return Err(PipelineError::Computation(format!(
                    "row {} has an incomplete partition key",
                    row
                )));
            }
        }
    }

    Ok(keys)
}

/// Stamp every row with the key's branch/year/month columns, replacing any present.
pub fn with_partition_columns(df: DataFrame, key: &PartitionKey) -> PipelineResult<DataFrame> {
    Ok(df
        .lazy()
        .with_columns([
            lit(key.branch.as_str()).alias(partition::BRANCH),
            lit(key.year).alias(partition::YEAR),
            lit(key.month as i32).alias(partition::MONTH),
        ])
        .collect()?)
}
