use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::config::S3Config;
use crate::error::SinkError;
use crate::sink::{validate_key, ArtifactSink};

/// S3 (or S3-compatible) object store client for single-request PUTs.
///
/// Uses AWS Signature Version 4 with a signed SHA-256 payload hash.
pub struct S3Sink {
    bucket: String,
    region: String,
    /// Custom endpoint for path-style addressing; `None` means AWS virtual-hosted.
    endpoint: Option<url::Url>,
    prefix: String,
    access_key_id: String,
    secret_access_key: String,
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for S3Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Sink")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("prefix", &self.prefix)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Where an object lives and how its request must be signed.
#[derive(Debug, PartialEq)]
struct ObjectLocation {
    url: String,
    host: String,
    canonical_uri: String,
}

impl S3Sink {
    pub fn new(config: &S3Config, timeout: Duration) -> Result<Self> {
        if config.bucket.is_empty() {
            anyhow::bail!("S3 bucket not configured. Set [sink.s3] bucket in chunkscribe.toml");
        }
        if config.region.is_empty() {
            anyhow::bail!("S3 region not configured. Set [sink.s3] region in chunkscribe.toml");
        }

        let access_key_id = if !config.access_key_id.is_empty() {
            config.access_key_id.clone()
        } else {
            std::env::var("AWS_ACCESS_KEY_ID").context(
                "S3 access key not configured. Set [sink.s3] access_key_id or AWS_ACCESS_KEY_ID",
            )?
        };
        let secret_access_key = if !config.secret_access_key.is_empty() {
            config.secret_access_key.clone()
        } else {
            std::env::var("AWS_SECRET_ACCESS_KEY").context(
                "S3 secret key not configured. Set [sink.s3] secret_access_key or AWS_SECRET_ACCESS_KEY",
            )?
        };

        let endpoint = if config.endpoint.is_empty() {
            None
        } else {
            Some(
                url::Url::parse(config.endpoint.trim_end_matches('/'))
                    .with_context(|| format!("Invalid S3 endpoint: {}", config.endpoint))?,
            )
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint,
            prefix: config.prefix.clone(),
            access_key_id,
            secret_access_key,
            client,
        })
    }

    fn object_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn location(&self, object_key: &str) -> ObjectLocation {
        let encoded_key = uri_encode_path(object_key);
        match &self.endpoint {
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.bucket, self.region);
                let canonical_uri = format!("/{}", encoded_key);
                ObjectLocation {
                    url: format!("https://{}{}", host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            Some(endpoint) => {
                let host = match endpoint.port() {
                    Some(port) => format!("{}:{}", endpoint.host_str().unwrap_or_default(), port),
                    None => endpoint.host_str().unwrap_or_default().to_string(),
                };
                let base_path = endpoint.path().trim_end_matches('/');
                let canonical_uri = format!(
                    "{}/{}/{}",
                    base_path,
                    uri_encode_path(&self.bucket),
                    encoded_key
                );
                ObjectLocation {
                    url: format!("{}://{}{}", endpoint.scheme(), host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
        }
    }

    /// Build the SigV4 `Authorization` header for a PUT of `body`.
    fn authorization(
        &self,
        now: DateTime<Utc>,
        location: &ObjectLocation,
        payload_hash: &str,
        checksum: &str,
    ) -> Result<String, SinkError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        let canonical_headers = format!(
            "host:{}\nx-amz-checksum-sha256:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            location.host, checksum, payload_hash, amz_date
        );
        let canonical_request = format!(
            "PUT\n{}\n\n{}\n{}\n{}",
            location.canonical_uri, canonical_headers, SIGNED_HEADERS, payload_hash
        );

        let scope = format!("{}/{}/s3/aws4_request", date_stamp, self.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            scope,
            hex(&sha256(canonical_request.as_bytes()))
        );

        let key = signing_key(&self.secret_access_key, &date_stamp, &self.region, "s3")?;
        let signature = hex(&hmac_sha256(&key, string_to_sign.as_bytes())?);

        Ok(format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.access_key_id, scope, SIGNED_HEADERS, signature
        ))
    }
}

const SIGNED_HEADERS: &str = "host;x-amz-checksum-sha256;x-amz-content-sha256;x-amz-date";

impl ArtifactSink for S3Sink {
    fn name(&self) -> &str {
        "s3"
    }

    fn put_bytes(&self, key: &str, body: &[u8], content_type: &str) -> Result<String, SinkError> {
        validate_key(key)?;
        let object_key = self.object_key(key);
        let location = self.location(&object_key);

        let digest = sha256(body);
        let payload_hash = hex(&digest);
        let checksum = {
            use base64::Engine;
            base64::engine::general_purpose::STANDARD.encode(digest)
        };

        let now = Utc::now();
        let authorization = self.authorization(now, &location, &payload_hash, &checksum)?;

        tracing::info!("Uploading s3://{}/{} ({} bytes)", self.bucket, object_key, body.len());

        let response = self
            .client
            .put(&location.url)
            .header("x-amz-date", now.format("%Y%m%dT%H%M%SZ").to_string())
            .header("x-amz-content-sha256", &payload_hash)
            .header("x-amz-checksum-sha256", &checksum)
            .header("Authorization", authorization)
            .header("Content-Type", content_type)
            .body(body.to_vec())
            .send()
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", location.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(format!("s3://{}/{}", self.bucket, object_key))
    }
}

/// Percent-encode an object key per SigV4 rules, keeping `/` separators.
fn uri_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32], SinkError> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| SinkError::Signing(format!("HMAC key error: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

fn signing_key(
    secret: &str,
    date_stamp: &str,
    region: &str,
    service: &str,
) -> Result<[u8; 32], SinkError> {
    let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date_stamp.as_bytes())?;
    let k_region = hmac_sha256(&k_date, region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, service.as_bytes())?;
    hmac_sha256(&k_service, b"aws4_request")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
