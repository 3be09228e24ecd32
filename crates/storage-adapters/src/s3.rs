//! S3 implementation of `MediaStorage`. Objects are uploaded with their
//! content type and addressed by a public URL.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use domains::error::{DomainError, Result};
use domains::ports::MediaStorage;
use secrecy::{ExposeSecret, SecretString};

/// Connection details for one bucket.
#[derive(Debug, Clone)]
pub struct S3Options {
    pub bucket: String,
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: SecretString,
    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,
    /// Overrides the virtual-hosted AWS URL of uploaded objects
    pub public_base_url: Option<String>,
}

pub struct S3MediaStorage {
    client: Client,
    bucket: String,
    base_url: String,
}

impl S3MediaStorage {
    pub async fn connect(opts: S3Options) -> Self {
        let credentials = Credentials::new(
            opts.access_key_id.clone(),
            opts.secret_access_key.expose_secret().to_string(),
            None,
            None,
            "nadbench-config",
        );
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(opts.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &opts.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let base_url = public_base_url(&opts);
        tracing::info!(bucket = %opts.bucket, region = %opts.region, %base_url, "s3 media storage ready");
        Self {
            client: Client::from_conf(builder.build()),
            bucket: opts.bucket,
            base_url,
        }
    }
}

fn public_base_url(opts: &S3Options) -> String {
    match &opts.public_base_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => format!("https://{}.s3.{}.amazonaws.com", opts.bucket, opts.region),
    }
}

#[async_trait]
impl MediaStorage for S3MediaStorage {
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| DomainError::Storage(format!("{}", DisplayErrorContext(&e))))?;

        Ok(format!("{}/{}", self.base_url, key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(public: Option<&str>) -> S3Options {
        S3Options {
            bucket: "nadbench".into(),
            region: "us-east-2".into(),
            access_key_id: "AKIA".into(),
            secret_access_key: SecretString::from("very-secret-key".to_string()),
            endpoint: None,
            public_base_url: public.map(str::to_string),
        }
    }

    #[test]
    fn default_url_is_virtual_hosted_aws() {
        assert_eq!(public_base_url(&opts(None)), "https://nadbench.s3.us-east-2.amazonaws.com");
    }

    #[test]
    fn debug_output_hides_the_secret_key() {
        let printed = format!("{:?}", opts(None));
        assert!(printed.contains("AKIA"));
        assert!(!printed.contains("very-secret-key"));
    }

    #[test]
    fn public_base_url_override_drops_trailing_slash() {
        assert_eq!(public_base_url(&opts(Some("https://cdn.example.org/"))), "https://cdn.example.org");
    }
}
