use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_ACCESS_KEY_VAR: &str = "MINIO_ACCESS_KEY";
const DEFAULT_SECRET_KEY_VAR: &str = "MINIO_SECRET_KEY";

/// `[minio]` table of the pipeline configuration file.
///
/// `endpoint` may omit its scheme; `ssl` then picks `https://` or `http://`.
/// When both are given they must agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinioSection {
    pub endpoint: String,
    pub bucket_name: String,
    pub region: Option<String>,
    pub path_style: Option<bool>,
    pub ssl: Option<bool>,
    /// Names of the environment variables holding the credentials.
    pub env_access_key: Option<String>,
    pub env_secret_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinioCredentials {
    pub access_key: String,
    pub secret_key: String,
}

/// Resolved MinIO connection settings. Credentials are filled in from the
/// environment by [`MinioConfig::load_credentials`], never from the file.
#[derive(Debug, Clone)]
pub struct MinioConfig {
    pub endpoint: String,
    pub bucket_name: String,
    pub region: String,
    pub path_style: bool,
    pub ssl: Option<bool>,
    access_key_var: String,
    secret_key_var: String,
    credentials: Option<MinioCredentials>,
}

impl MinioConfig {
    pub fn from_section(section: MinioSection) -> Self {
        Self {
            endpoint: section.endpoint.trim().trim_end_matches('/').to_string(),
            bucket_name: section.bucket_name,
            region: section.region.unwrap_or_else(|| "us-east-1".to_string()),
            path_style: section.path_style.unwrap_or(true),
            ssl: section.ssl,
            access_key_var: section
                .env_access_key
                .unwrap_or_else(|| DEFAULT_ACCESS_KEY_VAR.to_string()),
            secret_key_var: section
                .env_secret_key
                .unwrap_or_else(|| DEFAULT_SECRET_KEY_VAR.to_string()),
            credentials: None,
        }
    }

    pub fn load_credentials(&mut self) -> Result<()> {
        let read = |var: &str| {
            env::var(var).with_context(|| format!("Missing environment variable: {}", var))
        };
        self.credentials = Some(MinioCredentials {
            access_key: read(&self.access_key_var)?,
            secret_key: read(&self.secret_key_var)?,
        });
        Ok(())
    }

    pub fn with_credentials(mut self, credentials: MinioCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn credentials(&self) -> Result<&MinioCredentials> {
        self.credentials.as_ref().ok_or_else(|| {
            anyhow!(
                "MinIO credentials not loaded (expected in {} / {})",
                self.access_key_var,
                self.secret_key_var
            )
        })
    }

    /// Endpoint URL with its scheme, derived from `ssl` when the file omits it.
    pub fn endpoint_url(&self) -> Result<String> {
        match self.endpoint_scheme() {
            Some(tls) => {
                if let Some(ssl) = self.ssl.filter(|ssl| *ssl != tls) {
                    bail!(
                        "MinIO endpoint {} disagrees with ssl = {}",
                        self.endpoint,
                        ssl
                    );
                }
                Ok(self.endpoint.clone())
            }
            None if self.ssl.unwrap_or(false) => Ok(format!("https://{}", self.endpoint)),
            None => Ok(format!("http://{}", self.endpoint)),
        }
    }

    /// `Some(true)` for https, `Some(false)` for http, `None` when no scheme is given.
    fn endpoint_scheme(&self) -> Option<bool> {
        if self.endpoint.starts_with("https://") {
            Some(true)
        } else if self.endpoint.starts_with("http://") {
            Some(false)
        } else {
            None
        }
    }

    /// Settings check; credentials are checked when the client is built.
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.is_empty() {
            bail!("MinIO endpoint cannot be empty");
        }
        if self.bucket_name.is_empty() {
            bail!("MinIO bucket name cannot be empty");
        }
        self.endpoint_url()?;
        Ok(())
    }
}
