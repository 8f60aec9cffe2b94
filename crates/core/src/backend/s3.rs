use std::collections::HashMap;

use async_trait::async_trait;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::region::Region;
use tokio::io::AsyncRead;
use tracing::{debug, warn};

use super::Backend;
use crate::error::{Result, StoreError};

pub const DEFAULT_HOST: &str = "s3.amazonaws.com";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Result of a paginated listing. Pages that failed after the first one are
/// recorded in `errors` and their keys are missing from `keys`.
#[derive(Debug, Default)]
pub struct Listing {
    pub keys: Vec<String>,
    pub errors: Vec<StoreError>,
}

pub struct S3Backend {
    bucket: Box<Bucket>,
    bucket_name: String,
    host: String,
}

impl S3Backend {
    pub fn new(
        bucket_name: &str,
        host: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Result<Self> {
        validate_host(host)?;
        let region = Region::Custom {
            region: region.to_string(),
            endpoint: format!("https://{host}"),
        };
        let credentials = Credentials::new(Some(access_key), Some(secret_key), None, None, None)
            .map_err(|e| StoreError::io("invalid S3 credentials", e))?;
        let mut bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StoreError::io(format!("failed to create S3 client for {host}"), e))?;
        if uses_path_style(host) {
            bucket = bucket.with_path_style();
        }
        debug!(host, bucket = bucket_name, "created S3 client");

        Ok(Self {
            bucket,
            bucket_name: bucket_name.to_string(),
            host: host.to_string(),
        })
    }

    /// Requires `bucket`, `accesskeyid` and `secretaccesskey`; `host` and `region` are optional.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self> {
        let host = settings.get("host").map(String::as_str).unwrap_or(DEFAULT_HOST);
        let region = settings
            .get("region")
            .map(String::as_str)
            .unwrap_or(DEFAULT_REGION);

        let bucket = required(settings, "bucket")?;
        let access_key = required(settings, "accesskeyid")?;
        let secret_key = required(settings, "secretaccesskey")?;
        debug!(host, "using host");

        Self::new(bucket, host, region, access_key, secret_key)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket_name
    }

    /// Recursive listing under `prefix`, filtered by `suffix`. Only a failure
    /// on the first page is returned as an error.
    pub async fn list_pages(&self, prefix: &str, suffix: &str) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .bucket
                .list_page(
                    prefix.to_string(),
                    None,
                    continuation_token.clone(),
                    None,
                    None,
                )
                .await;

            let context = || format!("S3 LIST failed: {prefix}");
            let page = match page {
                Ok((result, 200..=299)) => Ok(result),
                Ok((_, status)) => Err(StoreError::io(
                    context(),
                    format!("unexpected status {status}"),
                )),
                Err(e) => Err(StoreError::io(context(), e)),
            };

            let result = match page {
                Ok(result) => result,
                Err(e) if continuation_token.is_none() => return Err(e),
                Err(e) => {
                    warn!(prefix, error = %e, "S3 LIST page failed, returning partial result");
                    listing.errors.push(e);
                    break;
                }
            };

            listing.keys.extend(
                result
                    .contents
                    .into_iter()
                    .map(|obj| obj.key)
                    .filter(|key| key.ends_with(suffix)),
            );

            match result.next_continuation_token {
                Some(token) if result.is_truncated => continuation_token = Some(token),
                _ => break,
            }
        }

        Ok(listing)
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn store_type(&self) -> &'static str {
        "s3"
    }

    async fn read(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| get_error(key, e))?;

        match response.status_code() {
            200..=299 => Ok(response.to_vec()),
            404 => Err(StoreError::NotFound(key.to_string())),
            status => Err(StoreError::io(
                format!("S3 GET failed: {key}"),
                format!("unexpected status {status}"),
            )),
        }
    }

    async fn list(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        Ok(self.list_pages(prefix, suffix).await?.keys)
    }

    async fn write(&self, key: &str, content: &mut (dyn AsyncRead + Unpin + Send)) -> Result<()> {
        let response = self
            .bucket
            .put_object_stream(content, key)
            .await
            .map_err(|e| StoreError::io(format!("S3 PUT failed: {key}"), e))?;

        // Without fail-on-err the client hands back rejected uploads as Ok.
        match response.status_code() {
            200..=299 => Ok(()),
            status => Err(StoreError::io(
                format!("S3 PUT failed: {key}"),
                format!("unexpected status {status}"),
            )),
        }
    }
}

fn get_error(key: &str, err: S3Error) -> StoreError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StoreError::NotFound(key.to_string()),
        e => StoreError::io(format!("S3 GET failed: {key}"), e),
    }
}

fn required<'a>(settings: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    settings
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| StoreError::Config(format!("{key} not provided")))
}

/// A bare `host[:port]`; the scheme is always https.
fn validate_host(host: &str) -> Result<()> {
    let malformed = host.is_empty()
        || host.contains("://")
        || host.contains('/')
        || host.chars().any(char::is_whitespace);
    if malformed {
        return Err(StoreError::io(
            format!("failed to create S3 client for {host:?}"),
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "malformed host"),
        ));
    }
    Ok(())
}

/// Virtual-hosted addressing only works against AWS itself.
fn uses_path_style(host: &str) -> bool {
    host != DEFAULT_HOST
}
