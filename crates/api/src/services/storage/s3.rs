//! S3 backend over the REST API.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info, instrument, warn};

use super::StorageError;
use super::sigv4::{Credentials, SigningRequest, amz_date, encode_key, sha256_hex};
use crate::config::S3Config;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Stores artifacts as objects `{folder}/{file}` in one bucket.
#[derive(Clone)]
pub struct S3Storage {
    client: reqwest::Client,
    bucket: String,
    region: String,
    access_key: String,
    secret_key: SecretString,
}

impl std::fmt::Debug for S3Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Storage")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("secret_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl S3Storage {
    /// Build the backend from remote settings.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MissingSetting` without a bucket or region.
    pub fn from_config(config: &S3Config) -> Result<Self, StorageError> {
        let bucket = non_blank(config.bucket.as_deref())
            .ok_or(StorageError::MissingSetting("AWS_S3_BUCKET"))?;
        let region = non_blank(config.region.as_deref())
            .ok_or(StorageError::MissingSetting("AWS_S3_REGION"))?;
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            bucket: bucket.to_owned(),
            region: region.to_owned(),
            access_key: config.access_key.trim().to_owned(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn host(&self) -> String {
        format!("{}.s3.{}.amazonaws.com", self.bucket, self.region)
    }

    pub(super) fn public_url(&self, key: &str) -> String {
        format!("https://{}/{key}", self.host())
    }

    /// Object key of a URL issued by this bucket.
    fn key_from_url<'u>(&self, url: &'u str) -> Option<&'u str> {
        let key = url.strip_prefix(&format!("https://{}/", self.host()))?;
        (!key.is_empty()).then_some(key)
    }

    #[instrument(skip(self, body), fields(bucket = %self.bucket, size = body.len()))]
    pub(super) async fn put(
        &self,
        key: &str,
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), StorageError> {
        let payload_hash = sha256_hex(&body);
        let mut request = self.signed(Method::PUT, key, &payload_hash, content_type)?;
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }

        let response = request.body(body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            error!(key, status, "S3 upload rejected");
            return Err(StorageError::Remote { status });
        }
        Ok(())
    }

    pub(super) async fn delete(&self, url: &str) {
        let Some(key) = self.key_from_url(url) else {
            warn!(url, "Not an object URL of this bucket, skipping delete");
            return;
        };

        match self.send_delete(key).await {
            Ok(()) => info!(url, "S3 object deleted"),
            Err(e) => error!(url, error = %e, "Failed to delete S3 object"),
        }
    }

    async fn send_delete(&self, key: &str) -> Result<(), StorageError> {
        let payload_hash = sha256_hex(b"");
        let response = self
            .signed(Method::DELETE, key, &payload_hash, None)?
            .send()
            .await?;
        // S3 answers 204 for missing keys as well
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StorageError::Remote {
                status: response.status().as_u16(),
            })
        }
    }

    /// Request builder carrying the SigV4 headers.
    fn signed(
        &self,
        method: Method,
        key: &str,
        payload_hash: &str,
        content_type: Option<&str>,
    ) -> Result<reqwest::RequestBuilder, StorageError> {
        let now = Utc::now();
        let host = self.host();
        let path = format!("/{}", encode_key(key));
        let date = amz_date(now);

        let mut headers = BTreeMap::new();
        headers.insert("host".to_owned(), host.clone());
        headers.insert("x-amz-content-sha256".to_owned(), payload_hash.to_owned());
        headers.insert("x-amz-date".to_owned(), date.clone());
        if let Some(content_type) = content_type {
            headers.insert("content-type".to_owned(), content_type.to_owned());
        }

        let authorization = SigningRequest {
            method: method.as_str(),
            path: &path,
            headers,
            payload_hash,
        }
        .authorization(
            &Credentials {
                access_key: &self.access_key,
                secret_key: self.secret_key.expose_secret(),
                region: &self.region,
            },
            now,
        )?;

        Ok(self
            .client
            .request(method, format!("https://{host}{path}"))
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", date)
            .header("authorization", authorization))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn storage() -> S3Storage {
        S3Storage::from_config(&S3Config {
            access_key: "AKIAEXAMPLE".to_owned(),
            secret_key: SecretString::from("secret"),
            bucket: Some("marquee-posters".to_owned()),
            region: Some("us-east-2".to_owned()),
        })
        .unwrap()
    }

    #[test]
    fn test_public_url() {
        assert_eq!(
            storage().public_url("posters/a.jpg"),
            "https://marquee-posters.s3.us-east-2.amazonaws.com/posters/a.jpg"
        );
    }

    #[test]
    fn test_key_from_url() {
        let s3 = storage();
        assert_eq!(
            s3.key_from_url("https://marquee-posters.s3.us-east-2.amazonaws.com/posters/a.jpg"),
            Some("posters/a.jpg")
        );
        assert_eq!(
            s3.key_from_url("https://other.s3.us-east-2.amazonaws.com/posters/a.jpg"),
            None
        );
        assert_eq!(s3.key_from_url("/uploads/posters/a.jpg"), None);
    }

    #[test]
    fn test_blank_bucket_is_missing() {
        let err = S3Storage::from_config(&S3Config {
            access_key: "AKIAEXAMPLE".to_owned(),
            secret_key: SecretString::from("secret"),
            bucket: Some("  ".to_owned()),
            region: Some("us-east-2".to_owned()),
        })
        .unwrap_err();
        assert!(matches!(err, StorageError::MissingSetting("AWS_S3_BUCKET")));
    }
}
