use crate::config::{MinioConfig, MinioSection};
use crate::processor::AggregationSettings;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PipelineConfigFile {
    minio: MinioSection,
    #[serde(default)]
    pipeline: PathsSection,
    #[serde(default)]
    thresholds: ThresholdsSection,
}

/// Object-store layout and reference-table location (`[pipeline]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub bronze_prefix: String,
    pub silver_prefix: String,
    pub gold_prefix: String,
    pub reports_prefix: String,
    /// Stem of every partition file name, e.g. `ventas_<branch>_<yyyy>-<m>.parquet`.
    pub dataset_name: String,
    pub exchange_rates_key: String,
    pub exchange_rate_column: String,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            bronze_prefix: "bronze/ventas/".to_string(),
            silver_prefix: "silver/ventas/".to_string(),
            gold_prefix: "gold/ventas/".to_string(),
            reports_prefix: "reports/ventas/".to_string(),
            dataset_name: "ventas".to_string(),
            exchange_rates_key: "reference/exchange_rates/exchange_rates.csv".to_string(),
            exchange_rate_column: "exchange_rate".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsSection {
    pub objective_margin_ratio: f64,
    pub trend_correlation_threshold: f64,
}

impl Default for ThresholdsSection {
    fn default() -> Self {
        let defaults = AggregationSettings::default();
        Self {
            objective_margin_ratio: defaults.objective_margin_ratio,
            trend_correlation_threshold: defaults.trend_correlation_threshold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub minio: MinioConfig,
    pub paths: PathsSection,
    pub thresholds: ThresholdsSection,
}

impl PipelineConfig {
    /// Load the file and the MinIO credentials from the environment.
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline config file: {}", path))?;

        let mut config = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse pipeline config file: {}", path))?;

        config.minio.load_credentials()?;

        Ok(config)
    }

    /// Parse and validate the settings; credentials are left unloaded.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: PipelineConfigFile = toml::from_str(content)?;
        let config = Self {
            minio: MinioConfig::from_section(file.minio),
            paths: file.pipeline,
            thresholds: file.thresholds,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.minio.validate()?;

        for (name, prefix) in [
            ("bronze_prefix", &self.paths.bronze_prefix),
            ("silver_prefix", &self.paths.silver_prefix),
            ("gold_prefix", &self.paths.gold_prefix),
            ("reports_prefix", &self.paths.reports_prefix),
        ] {
            if prefix.is_empty() || !prefix.ends_with('/') {
                return Err(anyhow!("{} must be a non-empty prefix ending in '/': {:?}", name, prefix));
            }
        }

        if self.paths.dataset_name.is_empty() || self.paths.dataset_name.contains('/') {
            return Err(anyhow!("dataset_name must be a plain file stem"));
        }
        if self.paths.exchange_rates_key.is_empty() {
            return Err(anyhow!("exchange_rates_key cannot be empty"));
        }

        let objective = self.thresholds.objective_margin_ratio;
        if !objective.is_finite() {
            return Err(anyhow!("objective_margin_ratio must be finite, got {}", objective));
        }
        let threshold = self.thresholds.trend_correlation_threshold;
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(anyhow!(
                "trend_correlation_threshold must lie in [-1, 1], got {}",
                threshold
            ));
        }

        Ok(())
    }

    pub fn aggregation_settings(&self) -> AggregationSettings {
        AggregationSettings {
            objective_margin_ratio: self.thresholds.objective_margin_ratio,
            trend_correlation_threshold: self.thresholds.trend_correlation_threshold,
        }
    }
}
