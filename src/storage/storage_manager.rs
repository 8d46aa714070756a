use crate::config::PathsSection;
use crate::models::PartitionKey;
use chrono::{DateTime, Utc};

/// Object-key layout for every layer of the lake.
#[derive(Debug, Clone)]
pub struct StorageManager {
    paths: PathsSection,
}

impl StorageManager {
    pub fn new(paths: PathsSection) -> Self {
        Self { paths }
    }

    /// `<layer>branch=<b>/year=<y>/month=<m>/<dataset>_<b>_<y>-<m>.parquet`
    pub fn partition_path(&self, layer_prefix: &str, key: &PartitionKey) -> String {
        format!(
            "{}{}{}_{}_{}-{}.parquet",
            layer_prefix,
            key.prefix(),
            self.paths.dataset_name,
            key.branch,
            key.year,
            key.month
        )
    }

    pub fn silver_path(&self, key: &PartitionKey) -> String {
        self.partition_path(&self.paths.silver_prefix, key)
    }

    pub fn gold_path(&self, key: &PartitionKey) -> String {
        self.partition_path(&self.paths.gold_prefix, key)
    }

    pub fn report_path(&self, job: &str, run_id: &str, at: DateTime<Utc>) -> String {
        format!(
            "{}{}/{}/{}-{}-{}.json",
            self.paths.reports_prefix,
            job,
            at.format("%Y/%m/%d"),
            job,
            at.format("%H%M%S"),
            run_id
        )
    }

    pub fn is_parquet(key: &str) -> bool {
        key.ends_with(".parquet")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_partition_paths() {
        let manager = StorageManager::new(PathsSection::default());
        let key = PartitionKey::new("Centro", 2024, 3).unwrap();

        assert_eq!(
            manager.silver_path(&key),
            "silver/ventas/branch=Centro/year=2024/month=3/ventas_Centro_2024-3.parquet"
        );
        assert_eq!(
            PartitionKey::from_path(&manager.gold_path(&key)).unwrap(),
            key
        );
    }

    #[test]
    fn test_report_path() {
        let manager = StorageManager::new(PathsSection::default());
        let at = Utc.with_ymd_and_hms(2024, 4, 2, 7, 5, 9).unwrap();

        assert_eq!(
            manager.report_path("gold", "abc", at),
            "reports/ventas/gold/2024/04/02/gold-070509-abc.json"
        );
        assert!(StorageManager::is_parquet("x/y.parquet"));
        assert!(!StorageManager::is_parquet("x/y.csv"));
    }
}
