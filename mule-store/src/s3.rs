use std::env;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use tracing::debug;

use crate::types::collect_stream;
use crate::{ByteStream, Content, Storage, StorageError, StoreResult, UrlOptions};

/// S3-compatible object store configuration
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Custom endpoint for S3-compatible stores (MinIO, RustFS, ...)
    pub endpoint_url: Option<String>,
    pub bucket: String,
    /// Key prefix prepended to every id
    pub prefix: Option<String>,
}

impl S3Config {
    /// Read configuration from `MULE_S3_*` environment variables.
    ///
    /// `MULE_S3_REGION`, `MULE_S3_ACCESS_KEY_ID`, `MULE_S3_SECRET_ACCESS_KEY`
    /// and `MULE_S3_BUCKET` are required; `MULE_S3_ENDPOINT_URL` and
    /// `MULE_S3_PREFIX` are optional.
    pub fn from_env() -> StoreResult<Self> {
        fn get_env(key: &str) -> StoreResult<String> {
            env::var(key).map_err(|_| {
                StorageError::configuration(format!("{} environment variable required", key))
            })
        }

        Ok(Self {
            region: get_env("MULE_S3_REGION")?,
            access_key_id: get_env("MULE_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("MULE_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: env::var("MULE_S3_ENDPOINT_URL").ok(),
            bucket: get_env("MULE_S3_BUCKET")?,
            prefix: env::var("MULE_S3_PREFIX").ok(),
        })
    }
}

/// Remote object store backend using the AWS SDK (S3-compatible)
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    prefix: Option<String>,
    endpoint_url: Option<String>,
    region: String,
}

impl S3Storage {
    pub async fn new(config: S3Config) -> Self {
        let client = Self::create_client(&config).await;
        Self {
            client,
            bucket: config.bucket,
            prefix: config.prefix,
            endpoint_url: config.endpoint_url,
            region: config.region,
        }
    }

    /// Construct from `MULE_S3_*` environment variables
    pub async fn from_env() -> StoreResult<Self> {
        Ok(Self::new(S3Config::from_env()?).await)
    }

    async fn create_client(config: &S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "mule-store",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                // Required for MinIO/RustFS compatibility
                .force_path_style(true)
                .build(),
        )
    }

    fn object_key(&self, id: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix.trim_end_matches('/'), id),
            None => id.to_string(),
        }
    }

    fn map_sdk_error(err: impl std::error::Error + Send + Sync + 'static) -> StorageError {
        StorageError::backend(err)
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload(&self, content: Content, id: &str) -> StoreResult<()> {
        let key = self.object_key(id);

        let bytes = match content {
            Content::Bytes(bytes) => bytes,
            Content::Stream(stream) => collect_stream(stream).await?,
            Content::Move { id: from_id } => {
                if !self.exists(&from_id).await? {
                    return Err(StorageError::not_found(&from_id));
                }
                let from_key = self.object_key(&from_id);

                // Server-side copy, then drop the source
                self.client
                    .copy_object()
                    .bucket(&self.bucket)
                    .copy_source(format!("{}/{}", self.bucket, from_key))
                    .key(&key)
                    .send()
                    .await
                    .map_err(Self::map_sdk_error)?;

                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(&from_key)
                    .send()
                    .await
                    .map_err(Self::map_sdk_error)?;

                debug!(from = %from_key, to = %key, "Moved object");
                return Ok(());
            }
        };

        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(AwsByteStream::from(bytes.to_vec()))
            .send()
            .await
            .map_err(Self::map_sdk_error)?;

        debug!(key = %key, size, "Stored object");
        Ok(())
    }

    async fn open(&self, id: &str) -> StoreResult<ByteStream> {
        let key = self.object_key(id);
        let result = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|err| {
                let service = err.into_service_error();
                if service.is_no_such_key() {
                    StorageError::not_found(id)
                } else {
                    StorageError::backend(service)
                }
            })?;

        let mut body = result.body;
        let stream = async_stream::stream! {
            loop {
                match body.try_next().await {
                    Ok(Some(chunk)) => yield Ok(chunk),
                    Ok(None) => break,
                    Err(err) => {
                        yield Err(std::io::Error::other(err));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.object_key(id))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(err) => {
                let service = err.into_service_error();
                if service.is_not_found() {
                    Ok(false)
                } else {
                    Err(StorageError::backend(service))
                }
            }
        }
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        // S3 deletes are idempotent: deleting a missing key succeeds
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.object_key(id))
            .send()
            .await
            .map_err(Self::map_sdk_error)?;
        Ok(())
    }

    async fn delete_prefixed(&self, prefix: &str) -> StoreResult<()> {
        let full_prefix = self.object_key(prefix);
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&full_prefix);

            if let Some(token) = &continuation_token {
                request = request.continuation_token(token);
            }

            let result = request.send().await.map_err(Self::map_sdk_error)?;

            for object in result.contents() {
                if let Some(key) = object.key() {
                    self.client
                        .delete_object()
                        .bucket(&self.bucket)
                        .key(key)
                        .send()
                        .await
                        .map_err(Self::map_sdk_error)?;
                }
            }

            match result.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(())
    }

    async fn url(&self, id: &str, options: &UrlOptions) -> StoreResult<String> {
        let key = self.object_key(id);

        if let Some(expires_in) = options.expires_in {
            let presigning =
                PresigningConfig::expires_in(expires_in).map_err(Self::map_sdk_error)?;

            let request = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&key)
                .presigned(presigning)
                .await
                .map_err(Self::map_sdk_error)?;

            return Ok(request.uri().to_string());
        }

        Ok(match &self.endpoint_url {
            Some(endpoint) => {
                format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
            }
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        })
    }
}
