//! AWS Signature Version 4 for single-chunk S3 requests.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use super::StorageError;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

/// Static credentials for one region.
pub(super) struct Credentials<'a> {
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub region: &'a str,
}

/// A request about to be signed.
///
/// `headers` must already contain `host`, `x-amz-date` and
/// `x-amz-content-sha256`; every header in the map is signed.
pub(super) struct SigningRequest<'a> {
    pub method: &'a str,
    /// Already URI-encoded absolute path.
    pub path: &'a str,
    pub headers: BTreeMap<String, String>,
    pub payload_hash: &'a str,
}

impl SigningRequest<'_> {
    /// Value of the `Authorization` header for this request.
    pub(super) fn authorization(
        &self,
        credentials: &Credentials<'_>,
        now: DateTime<Utc>,
    ) -> Result<String, StorageError> {
        let date = date_stamp(now);
        let scope = format!("{date}/{}/{SERVICE}/aws4_request", credentials.region);

        let signed_headers = self
            .headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = self
            .headers
            .iter()
            .map(|(name, value)| format!("{name}:{}\n", value.trim()))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{canonical_headers}\n{signed_headers}\n{}",
            self.method, self.path, self.payload_hash
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{}\n{scope}\n{}",
            amz_date(now),
            sha256_hex(canonical_request.as_bytes())
        );

        let key = signing_key(credentials.secret_key, &date, credentials.region, SERVICE)?;
        let signature = hex::encode(hmac(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_headers}, Signature={signature}",
            credentials.access_key
        ))
    }
}

/// `20130524T000000Z`
pub(super) fn amz_date(now: DateTime<Utc>) -> String {
    now.format("%Y%m%dT%H%M%SZ").to_string()
}

fn date_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Lowercase hex SHA-256.
pub(super) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Percent-encode an object key for the canonical URI. `/` is kept.
pub(super) fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(char::from(byte));
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

fn hmac(key: &[u8], data: &[u8]) -> Result<Vec<u8>, StorageError> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| StorageError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn signing_key(
    secret_key: &str,
    date: &str,
    region: &str,
    service: &str,
) -> Result<Vec<u8>, StorageError> {
    let k_date = hmac(format!("AWS4{secret_key}").as_bytes(), date.as_bytes())?;
    let k_region = hmac(&k_date, region.as_bytes())?;
    let k_service = hmac(&k_region, service.as_bytes())?;
    hmac(&k_service, b"aws4_request")
}
