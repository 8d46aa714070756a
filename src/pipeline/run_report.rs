use crate::error::{FailureKind, PipelineError};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct FailedUnit {
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one job run: what succeeded, what failed and why.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub job: String,
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub success_count: usize,
    pub failure_count: usize,
    pub succeeded: Vec<String>,
    pub failures: Vec<FailedUnit>,
    pub warnings: Vec<String>,
}

impl RunReport {
    pub fn start(job: &str) -> Self {
        Self {
            job: job.to_string(),
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            success_count: 0,
            failure_count: 0,
            succeeded: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn record_success(&mut self, unit: impl Into<String>) {
        self.success_count += 1;
        self.succeeded.push(unit.into());
    }

    pub fn record_failure(&mut self, unit: impl Into<String>, err: &PipelineError) {
        let unit = unit.into();
        error!("❌ {} failed: {}", unit, err);
        self.failure_count += 1;
        self.failures.push(FailedUnit {
            unit,
            kind: err.kind(),
            message: err.to_string(),
        });
    }

    pub fn record_warning(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("⚠️ {}", message);
        self.warnings.push(message);
    }

    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn failed_units(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.unit.as_str()).collect()
    }

    pub fn log_summary(&self) {
        info!("\n=== {} Run Summary ({}) ===", self.job, self.run_id);
        info!("✅ Succeeded units: {}", self.success_count);
        if self.failure_count == 0 {
            info!("🎉 {} run completed without failures", self.job);
        } else {
            warn!(
                "⚠️ {} units failed: {}",
                self.failure_count,
                self.failed_units().join(", ")
            );
        }
        if !self.warnings.is_empty() {
            info!("📋 {} warnings recorded", self.warnings.len());
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
