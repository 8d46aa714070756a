use anyhow::{Context, Result, bail};
use sales_pipeline::config::PipelineConfig;
use sales_pipeline::pipeline::{GoldJob, RunReport, SilverJob};
use sales_pipeline::storage::{MinioStorage, ObjectStore, StorageManager};
use std::env;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenv::dotenv().ok();

    let stage = env::args().nth(1).unwrap_or_else(|| "all".to_string());
    let (run_silver, run_gold) = match stage.as_str() {
        "silver" => (true, false),
        "gold" => (false, true),
        "all" => (true, true),
        other => bail!("Unknown stage '{}'; expected silver, gold or all", other),
    };

    info!("🚀 Starting Sales Pipeline (stage: {})", stage);

    let config_path = env::var("PIPELINE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = PipelineConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load pipeline configuration from {}", config_path))?;

    info!(
        "Loaded MinIO configuration: {}@{}",
        config.minio.endpoint, config.minio.bucket_name
    );

    let storage = MinioStorage::from_config(&config.minio)
        .context("Failed to initialize MinIO storage")
        .with_context(|| "Please ensure MinIO server is running and environment variables are set")?;
    storage.ensure_bucket().await?;

    let layout = StorageManager::new(config.paths.clone());

    if run_silver {
        let report = SilverJob::new(&storage, &config).run().await?;
        store_report(&storage, &layout, &report).await;
    }
    if run_gold {
        let report = GoldJob::new(&storage, &config).run().await?;
        store_report(&storage, &layout, &report).await;
    }

    info!("🎉 Sales pipeline finished");
    Ok(())
}

async fn store_report(store: &dyn ObjectStore, layout: &StorageManager, report: &RunReport) {
    let path = layout.report_path(&report.job, &report.run_id, report.started_at);
    let stored = match report.to_json() {
        Ok(json) => store.put_object(&path, json.as_bytes()).await,
        Err(e) => Err(e),
    };

    match stored {
        Ok(()) => info!("📋 Run report saved: {}", path),
        Err(e) => warn!("⚠️ Could not store run report {}: {}", path, e),
    }
}
