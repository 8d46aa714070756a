use crate::config::MinioConfig;
use crate::storage::ObjectStore;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;
use s3::BucketConfiguration;
use tracing::{debug, info};

/// `ObjectStore` backed by a MinIO (S3-compatible) bucket.
pub struct MinioStorage {
    bucket: Box<Bucket>,
    path_style: bool,
}

impl MinioStorage {
    pub fn from_config(config: &MinioConfig) -> Result<Self> {
        config.validate()?;
        let keys = config.credentials()?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: config.endpoint_url()?,
        };
        let credentials = Credentials::new(
            Some(keys.access_key.as_str()),
            Some(keys.secret_key.as_str()),
            None,
            None,
            None,
        )?;

        let mut bucket = Bucket::new(&config.bucket_name, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(MinioStorage {
            bucket,
            path_style: config.path_style,
        })
    }

    /// Create the configured bucket unless it already exists.
    pub async fn ensure_bucket(&self) -> Result<()> {
        let name = &self.bucket.name;
        let exists = self
            .bucket
            .exists()
            .await
            .with_context(|| format!("Failed to check bucket existence: {}", name))?;
        if exists {
            info!("Bucket '{}' already exists", name);
            return Ok(());
        }

        let region = self.bucket.region.clone();
        let credentials = self.bucket.credentials().await?;
        let config = BucketConfiguration::default();
        let created = if self.path_style {
            Bucket::create_with_path_style(name, region, credentials, config).await
        } else {
            Bucket::create(name, region, credentials, config).await
        };
        created.with_context(|| format!("Failed to create bucket: {}", name))?;

        info!("Created bucket: {}", name);
        Ok(())
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket.name
    }
}

#[async_trait]
impl ObjectStore for MinioStorage {
    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        // The client follows continuation tokens and returns every page
        let pages = self.bucket.list(prefix.to_string(), None).await?;

        let mut keys: Vec<String> = pages
            .into_iter()
            .flat_map(|page| page.contents.into_iter().map(|object| object.key))
            .collect();
        keys.sort();

        debug!("Listed {} objects under {}", keys.len(), prefix);
        Ok(keys)
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self.bucket.get_object(key).await?;
        match response.status_code() {
            200 => Ok(response.bytes().to_vec()),
            status => bail!("Failed to get object {}: HTTP {}", key, status),
        }
    }

    async fn put_object(&self, key: &str, data: &[u8]) -> Result<()> {
        let response = self.bucket.put_object(key, data).await?;
        match response.status_code() {
            200 => {
                debug!("Stored object: {} ({} bytes)", key, data.len());
                Ok(())
            }
            status => bail!("Failed to store object {}: HTTP {}", key, status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MinioCredentials, MinioSection};
    use std::env;

    fn config(endpoint: &str, bucket: &str) -> MinioConfig {
        MinioConfig::from_section(MinioSection {
            endpoint: endpoint.to_string(),
            bucket_name: bucket.to_string(),
            region: None,
            path_style: None,
            ssl: None,
            env_access_key: None,
            env_secret_key: None,
        })
    }

    fn test_credentials() -> MinioCredentials {
        MinioCredentials {
            access_key: "test_access".to_string(),
            secret_key: "test_secret".to_string(),
        }
    }

    #[test]
    fn test_from_config_requires_credentials() {
        let without = config("localhost:9000", "sales-datalake");
        assert!(MinioStorage::from_config(&without).is_err());

        let storage =
            MinioStorage::from_config(&without.with_credentials(test_credentials())).unwrap();
        assert_eq!(storage.bucket_name(), "sales-datalake");
        assert!(storage.path_style);
    }

    #[tokio::test]
    async fn test_object_round_trip() {
        // Requires a running MinIO instance and MINIO_ACCESS_KEY / MINIO_SECRET_KEY
        if env::var("MINIO_TEST_ENABLED").is_err() {
            return;
        }

        let mut minio = config("http://localhost:9000", "sales-pipeline-test");
        minio.load_credentials().unwrap();
        let storage = MinioStorage::from_config(&minio).unwrap();
        storage.ensure_bucket().await.unwrap();

        storage
            .put_object("bronze/test/object.bin", b"payload")
            .await
            .unwrap();
        let keys = storage.list_keys("bronze/test/").await.unwrap();
        assert!(keys.contains(&"bronze/test/object.bin".to_string()));
        assert_eq!(
            storage.get_object("bronze/test/object.bin").await.unwrap(),
            b"payload"
        );
    }
}
