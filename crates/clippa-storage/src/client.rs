//! S3-compatible client (Cloudflare R2, Supabase Storage S3 endpoint).

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::blob::BlobStore;
use crate::error::{StorageError, StorageResult};

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct R2Config {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Region (usually "auto" for R2)
    pub region: String,
    /// Base for public object URLs. Defaults to `<endpoint>/<bucket>`.
    pub public_base_url: Option<String>,
}

impl R2Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORAGE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORAGE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORAGE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORAGE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORAGE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORAGE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "videos".to_string()),
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "auto".to_string()),
            public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        })
    }
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct R2Client {
    client: Client,
    bucket: String,
    public_base: String,
}

impl R2Client {
    pub async fn new(config: R2Config) -> StorageResult<Self> {
        if config.bucket_name.is_empty() {
            return Err(StorageError::config_error("bucket name is empty"));
        }

        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "clippa-storage",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let public_base = match config.public_base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!(
                "{}/{}",
                config.endpoint_url.trim_end_matches('/'),
                config.bucket_name
            ),
        };

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
            public_base,
        })
    }

    pub async fn from_env() -> StorageResult<Self> {
        Self::new(R2Config::from_env()?).await
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Public URL for `key`.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, urlencoding::encode(key))
    }
}

/// `Content-Disposition` value that downloads as `filename`.
pub fn attachment_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(filename)
    )
}

#[async_trait]
impl BlobStore for R2Client {
    async fn upload_file(
        &self,
        path: &Path,
        key: &str,
        content_type: &str,
    ) -> StorageResult<String> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(self.public_url(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    async fn signed_url(
        &self,
        key: &str,
        download_filename: &str,
        ttl: Duration,
    ) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(ttl)
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .response_content_disposition(attachment_disposition(download_filename))
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::presign_failed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> R2Config {
        R2Config {
            endpoint_url: "https://account.r2.cloudflarestorage.com".into(),
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "secret".into(),
            bucket_name: "videos".into(),
            region: "auto".into(),
            public_base_url: None,
        }
    }

    #[tokio::test]
    async fn test_public_url_defaults_to_endpoint_and_bucket() {
        let client = R2Client::new(config()).await.unwrap();
        assert_eq!(
            client.public_url("clip-abc.mp4"),
            "https://account.r2.cloudflarestorage.com/videos/clip-abc.mp4"
        );
    }

    #[tokio::test]
    async fn test_public_url_trims_trailing_slash() {
        let mut cfg = config();
        cfg.endpoint_url.push('/');
        let client = R2Client::new(cfg).await.unwrap();
        assert_eq!(
            client.public_url("clip-abc.mp4"),
            "https://account.r2.cloudflarestorage.com/videos/clip-abc.mp4"
        );
    }

    #[tokio::test]
    async fn test_public_url_with_base() {
        let mut cfg = config();
        cfg.public_base_url = Some("https://cdn.example.com/public/".into());
        let client = R2Client::new(cfg).await.unwrap();
        assert_eq!(
            client.public_url("clip-abc.mp4"),
            "https://cdn.example.com/public/clip-abc.mp4"
        );
    }

    #[tokio::test]
    async fn test_empty_bucket_rejected() {
        let mut cfg = config();
        cfg.bucket_name.clear();
        assert!(matches!(
            R2Client::new(cfg).await,
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn test_attachment_disposition() {
        assert_eq!(
            attachment_disposition("my clip.mp4"),
            "attachment; filename=\"my clip.mp4\"; filename*=UTF-8''my%20clip.mp4"
        );
        assert!(attachment_disposition("a\"b.mp4").starts_with("attachment; filename=\"a_b.mp4\""));
    }

    #[tokio::test]
    async fn test_signed_url_carries_disposition() {
        let client = R2Client::new(config()).await.unwrap();
        let url = client
            .signed_url("clip-abc.mp4", "clip.mp4", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.contains("videos/clip-abc.mp4"));
        assert!(url.contains("response-content-disposition="));
        assert!(url.contains("X-Amz-Expires=60"));
    }
}
