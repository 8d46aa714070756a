use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::columns::partition;
use crate::models::{PartitionKey, with_partition_columns};
use crate::pipeline::RunReport;
use crate::processor::{AggregationEngine, BatchSchema, SchemaValidator};
use crate::storage::{ObjectStore, PartitionWriter, StorageManager, decode_parquet};
use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

type PeriodFiles = BTreeMap<(i32, u32), Vec<(PartitionKey, String)>>;

/// Silver to gold: one aggregation per reporting period (year, month).
pub struct GoldJob<'a> {
    store: &'a dyn ObjectStore,
    config: &'a PipelineConfig,
    layout: StorageManager,
    engine: AggregationEngine,
}

impl<'a> GoldJob<'a> {
    pub fn new(store: &'a dyn ObjectStore, config: &'a PipelineConfig) -> Self {
        Self {
            store,
            config,
            layout: StorageManager::new(config.paths.clone()),
            engine: AggregationEngine::new(config.aggregation_settings()),
        }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::start("gold");
        info!("🚀 Starting silver → gold run {}", report.run_id);

        let silver_prefix = &self.config.paths.silver_prefix;
        let keys = self
            .store
            .list_keys(silver_prefix)
            .await
            .with_context(|| format!("Failed to list silver files under {}", silver_prefix))?;

        let periods = group_by_period(keys, &mut report);
        if periods.is_empty() {
            report.record_warning(format!("No silver files found under {}", silver_prefix));
        }
        info!("📁 Found {} reporting periods to aggregate", periods.len());

        for ((year, month), files) in &periods {
            self.process_period(*year, *month, files, &mut report).await;
        }

        let report = report.finish();
        report.log_summary();
        Ok(report)
    }

    async fn process_period(
        &self,
        year: i32,
        month: u32,
        files: &[(PartitionKey, String)],
        report: &mut RunReport,
    ) {
        let period = format!("{}-{:02}", year, month);
        info!("\n=== Aggregating period {} ({} files) ===", period, files.len());

        let mut combined: Option<DataFrame> = None;
        for (key, path) in files {
            let appended = match self.read_silver(path, key).await {
                Ok(df) => match combined.as_mut() {
                    Some(acc) => acc.vstack_mut(&df).map(|_| ()).map_err(PipelineError::from),
                    None => {
                        combined = Some(df);
                        Ok(())
                    }
                },
                Err(e) => Err(e),
            };
            if let Err(e) = appended {
                report.record_failure(path.as_str(), &e);
            }
        }

        let Some(lines) = combined else {
            report.record_warning(format!("Period {}: no readable silver files", period));
            return;
        };

        let aggregated = match self.engine.aggregate(&lines) {
            Ok(df) => df,
            Err(e) => {
                report.record_failure(period, &e);
                return;
            }
        };

        let writer = PartitionWriter::new(self.store, true);
        match writer.write(&aggregated, |k| self.layout.gold_path(k)).await {
            Ok(writes) => {
                for write in writes {
                    match write.result {
                        Ok(()) => report.record_success(write.path),
                        Err(e) => report.record_failure(write.key.to_string(), &e),
                    }
                }
            }
            Err(e) => report.record_failure(period, &e),
        }
    }

    /// Read one silver file and give it the fixed column layout of its period.
    async fn read_silver(&self, path: &str, key: &PartitionKey) -> PipelineResult<DataFrame> {
        let bytes = self
            .store
            .get_object(path)
            .await
            .map_err(|e| PipelineError::Read {
                key: path.to_string(),
                reason: e.to_string(),
            })?;
        let df = decode_parquet(bytes).map_err(|e| PipelineError::Read {
            key: path.to_string(),
            reason: e.to_string(),
        })?;

        SchemaValidator.ensure(&df, BatchSchema::Silver)?;
        SchemaValidator.check_enriched_values(&df)?;

        let df = with_partition_columns(df, key)?;
        let mut columns = BatchSchema::Silver.required_columns();
        columns.extend(partition::ALL);
        Ok(df.select(columns)?)
    }
}

fn group_by_period(keys: Vec<String>, report: &mut RunReport) -> PeriodFiles {
    let mut periods = PeriodFiles::new();
    for path in keys.into_iter().filter(|k| StorageManager::is_parquet(k)) {
        match PartitionKey::from_path(&path) {
            Ok(key) => periods.entry(key.period()).or_default().push((key, path)),
            Err(e) => report.record_failure(path, &e),
        }
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::models::columns::{gold, silver};
    use crate::pipeline::SilverJob;
    use crate::storage::{MemoryStore, encode_parquet, without_partition_columns};
    use crate::test_support::{SaleLine, bronze_frame, enriched_frame, str_column};

    fn config() -> PipelineConfig {
        PipelineConfig::from_toml_str(
            r#"
            [minio]
            endpoint = "http://localhost:9000"
            bucket_name = "test"
            "#,
        )
        .unwrap()
    }

    fn silver_path(branch: &str) -> String {
        format!(
            "silver/ventas/branch={}/year=2024/month=3/ventas_{}_2024-3.parquet",
            branch, branch
        )
    }

    async fn put_silver(store: &MemoryStore, branch: &str, lines: &[SaleLine]) {
        let key = PartitionKey::new(branch, 2024, 3).unwrap();
        let mut body = without_partition_columns(&enriched_frame(&key, lines, 100.0)).unwrap();
        let bytes = encode_parquet(&mut body).unwrap();
        store.put_object(&silver_path(branch), &bytes).await.unwrap();
    }

    async fn read_gold(store: &MemoryStore, branch: &str) -> DataFrame {
        let path = format!(
            "gold/ventas/branch={}/year=2024/month=3/ventas_{}_2024-3.parquet",
            branch, branch
        );
        decode_parquet(store.get_object(&path).await.unwrap()).unwrap()
    }

    fn centro_lines() -> Vec<SaleLine> {
        vec![
            SaleLine::new("2024-03-04", 1, "P1", 1, 100.0, 80.0),
            SaleLine::new("2024-03-04", 2, "P2", 1, 200.0, 150.0),
        ]
    }

    #[test]
    fn test_group_by_period_records_bad_keys() {
        let mut report = RunReport::start("gold");
        let periods = group_by_period(
            vec![
                silver_path("Centro"),
                silver_path("Norte"),
                "silver/ventas/loose.parquet".to_string(),
                "silver/ventas/branch=Sur/year=2024/month=4/_SUCCESS".to_string(),
            ],
            &mut report,
        );

        assert_eq!(periods.len(), 1);
        assert_eq!(periods[&(2024, 3)].len(), 2);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.failures[0].kind, FailureKind::Read);
    }

    #[tokio::test]
    async fn test_run_aggregates_each_partition() {
        let store = MemoryStore::new();
        put_silver(&store, "Centro", &centro_lines()).await;
        put_silver(
            &store,
            "Norte",
            &[SaleLine::new("2024-03-05", 1, "P1", 2, 50.0, 45.0)],
        )
        .await;

        let config = config();
        let report = GoldJob::new(&store, &config).run().await.unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.failure_count, 0);

        let centro = read_gold(&store, "Centro").await;
        assert_eq!(centro.height(), 2);
        assert_eq!(
            str_column(&centro, gold::OBJECTIVE_COMPLIANCE),
            vec![Some("equal".to_string()), Some("above".to_string())]
        );
        assert_eq!(
            str_column(&centro, partition::BRANCH),
            vec![Some("Centro".to_string()); 2]
        );

        let norte = read_gold(&store, "Norte").await;
        assert_eq!(
            str_column(&norte, gold::OBJECTIVE_COMPLIANCE),
            vec![Some("below".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_does_not_block_period() {
        let store = MemoryStore::new();
        put_silver(&store, "Centro", &centro_lines()).await;
        store
            .put_object(&silver_path("Norte"), b"not a parquet file")
            .await
            .unwrap();

        let config = config();
        let report = GoldJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_units(), vec![silver_path("Norte").as_str()]);
        assert_eq!(report.failures[0].kind, FailureKind::Read);
        assert_eq!(read_gold(&store, "Centro").await.height(), 2);
    }

    #[tokio::test]
    async fn test_bad_weekday_file_fails_alone() {
        let store = MemoryStore::new();
        put_silver(&store, "Centro", &centro_lines()).await;

        let key = PartitionKey::new("Norte", 2024, 3).unwrap();
        let mut body = without_partition_columns(&enriched_frame(&key, &centro_lines(), 100.0)).unwrap();
        body.with_column(Series::new(silver::WEEKDAY.into(), vec!["Monday"; body.height()]))
            .unwrap();
        let bytes = encode_parquet(&mut body).unwrap();
        store.put_object(&silver_path("Norte"), &bytes).await.unwrap();

        let config = config();
        let report = GoldJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_units(), vec![silver_path("Norte").as_str()]);
        assert_eq!(report.failures[0].kind, FailureKind::Computation);
        assert_eq!(read_gold(&store, "Centro").await.height(), 2);
    }

    #[tokio::test]
    async fn test_gold_write_failure_is_isolated() {
        let store = MemoryStore::new();
        put_silver(&store, "Centro", &centro_lines()).await;
        put_silver(&store, "Norte", &centro_lines()).await;
        store.fail_writes_under("gold/ventas/branch=Norte/").unwrap();

        let config = config();
        let report = GoldJob::new(&store, &config).run().await.unwrap();

        assert_eq!(report.success_count, 1);
        assert_eq!(report.failed_units(), vec!["Norte/2024-03"]);
        assert_eq!(report.failures[0].kind, FailureKind::Write);
        assert_eq!(read_gold(&store, "Centro").await.height(), 2);
    }

    #[tokio::test]
    async fn test_bronze_to_gold() {
        let store = MemoryStore::new();
        store
            .put_object(
                "reference/exchange_rates/exchange_rates.csv",
                b"year,month,exchange_rate\n2024,3,100.0\n",
            )
            .await
            .unwrap();
        let mut bronze = bronze_frame(&centro_lines());
        let bytes = encode_parquet(&mut bronze).unwrap();
        store
            .put_object("bronze/ventas/branch=Centro/year=2024/month=3/part-0.parquet", &bytes)
            .await
            .unwrap();

        let config = config();
        let silver = SilverJob::new(&store, &config).run().await.unwrap();
        assert_eq!(silver.success_count, 1);

        let report = GoldJob::new(&store, &config).run().await.unwrap();
        assert_eq!(report.success_count, 1);

        let centro = read_gold(&store, "Centro").await;
        assert_eq!(
            str_column(&centro, gold::TOP_MARGIN_PRODUCT),
            vec![Some("Producto P2".to_string()); 2]
        );
        assert_eq!(
            str_column(&centro, gold::TOP_SALES_WEEKDAY),
            vec![Some("Lunes".to_string()); 2]
        );
    }
}
