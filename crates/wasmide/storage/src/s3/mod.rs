//! S3-compatible object store over plain HTTPS.
//!
//! Requests are signed with SigV4 headers; read URLs are presigned with
//! query-string SigV4. Works against AWS S3 (virtual-hosted addressing) and
//! self-hosted endpoints such as MinIO (path-style addressing).

mod sigv4;

use crate::traits::ObjectStore;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use serde::{Deserialize, Serialize};
use sigv4::{uri_encode, Signer, MAX_PRESIGN_SECS};
use std::time::Duration;
use tracing::debug;

/// Connection settings for an S3-compatible bucket.
#[derive(Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,

    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint such as `http://localhost:9000`. AWS when unset.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Address the bucket as the first path segment instead of a subdomain.
    #[serde(default)]
    pub path_style: bool,

    pub access_key_id: String,

    pub secret_access_key: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

fn default_region() -> String {
    "eu-west-2".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// [`ObjectStore`] speaking the S3 REST API.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    signer: Signer,
    scheme: String,
    host: String,
    /// `/{bucket}` for path-style addressing, empty otherwise.
    bucket_path: String,
}

impl S3ObjectStore {
    pub fn new(config: &S3Config) -> StorageResult<Self> {
        if config.bucket.is_empty() {
            return Err(StorageError::InvalidInput("s3 bucket is not set".to_string()));
        }
        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://s3.{}.amazonaws.com", config.region));
        let url = Url::parse(&endpoint)
            .map_err(|e| StorageError::InvalidInput(format!("s3 endpoint `{endpoint}`: {e}")))?;
        let base_host = url
            .host_str()
            .ok_or_else(|| StorageError::InvalidInput(format!("s3 endpoint `{endpoint}` has no host")))?;
        let base_host = match url.port() {
            Some(port) => format!("{base_host}:{port}"),
            None => base_host.to_string(),
        };

        let (host, bucket_path) = if config.path_style {
            (base_host, format!("/{}", uri_encode(&config.bucket, false)))
        } else {
            (format!("{}.{base_host}", config.bucket), String::new())
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorageError::Backend(format!("http client: {e}")))?;

        Ok(Self {
            client,
            signer: Signer::new(&config.access_key_id, &config.secret_access_key, &config.region),
            scheme: url.scheme().to_string(),
            host,
            bucket_path,
        })
    }

    fn object_path(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_path, uri_encode(key, true))
    }

    fn bucket_root(&self) -> String {
        if self.bucket_path.is_empty() {
            "/".to_string()
        } else {
            self.bucket_path.clone()
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        params: &[(String, String)],
        body: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<reqwest::Response> {
        let signed = self
            .signer
            .sign(method.as_str(), &self.host, path, params, &body, Utc::now())?;
        let mut url = format!("{}://{}{}", self.scheme, self.host, path);
        if !signed.query.is_empty() {
            url.push('?');
            url.push_str(&signed.query);
        }

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in &signed.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("s3 {method} {path}: {e}")))?;
        debug!(%method, path, status = %response.status(), "s3 request");
        Ok(response)
    }
}

/// Backend error tagged with the S3 error code from the response body.
async fn error_for(response: reqwest::Response, what: &str) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let code = xml_values(&body, "Code").into_iter().next();
    StorageError::Backend(match code {
        Some(code) => format!("s3 {what}: {status} {code}"),
        None => format!("s3 {what}: {status}"),
    })
}

fn xml_unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Text content of every `<tag>` element in `body`.
fn xml_values(body: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = body;
    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        match rest.find(&close) {
            Some(end) => {
                values.push(xml_unescape(&rest[..end]));
                rest = &rest[end + close.len()..];
            }
            None => break,
        }
    }
    values
}

/// Keys and continuation token of one `ListObjectsV2` page.
fn parse_list_page(body: &str) -> (Vec<String>, Option<String>) {
    let keys = xml_values(body, "Key");
    let truncated = xml_values(body, "IsTruncated")
        .first()
        .map(|v| v == "true")
        .unwrap_or(false);
    let token = if truncated {
        xml_values(body, "NextContinuationToken").into_iter().next()
    } else {
        None
    };
    (keys, token)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Vec<u8>, content_type: &str) -> StorageResult<()> {
        let response = self
            .send(Method::PUT, &self.object_path(key), &[], body, Some(content_type))
            .await?;
        if !response.status().is_success() {
            return Err(error_for(response, &format!("put {key}")).await);
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> StorageResult<Vec<u8>> {
        let response = self
            .send(Method::GET, &self.object_path(key), &[], Vec::new(), None)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            s if s.is_success() => response
                .bytes()
                .await
                .map(|b| b.to_vec())
                .map_err(|e| StorageError::Backend(format!("s3 get {key}: {e}"))),
            _ => Err(error_for(response, &format!("get {key}")).await),
        }
    }

    async fn list_objects(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let mut params = vec![
                ("list-type".to_string(), "2".to_string()),
                ("prefix".to_string(), prefix.to_string()),
            ];
            if let Some(token) = &token {
                params.push(("continuation-token".to_string(), token.clone()));
            }
            let response = self
                .send(Method::GET, &self.bucket_root(), &params, Vec::new(), None)
                .await?;
            if !response.status().is_success() {
                return Err(error_for(response, &format!("list {prefix}")).await);
            }
            let body = response
                .text()
                .await
                .map_err(|e| StorageError::Backend(format!("s3 list {prefix}: {e}")))?;

            let (page, next) = parse_list_page(&body);
            keys.extend(page);
            match next {
                Some(next) => token = Some(next),
                None => return Ok(keys),
            }
        }
    }

    async fn delete_object(&self, key: &str) -> StorageResult<()> {
        let response = self
            .send(Method::DELETE, &self.object_path(key), &[], Vec::new(), None)
            .await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(()),
            s if s.is_success() => Ok(()),
            _ => Err(error_for(response, &format!("delete {key}")).await),
        }
    }

    async fn presign_get(&self, key: &str, ttl: Duration, content_type: &str) -> StorageResult<String> {
        let secs = ttl.as_secs();
        if secs == 0 || secs > MAX_PRESIGN_SECS {
            return Err(StorageError::InvalidInput(format!(
                "presign ttl must be between 1s and {MAX_PRESIGN_SECS}s, got {secs}s"
            )));
        }
        let path = self.object_path(key);
        let query = self.signer.presign(
            &self.host,
            &path,
            secs,
            &[("response-content-type".to_string(), content_type.to_string())],
            Utc::now(),
        )?;
        Ok(format!("{}://{}{}?{}", self.scheme, self.host, path, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>, path_style: bool) -> S3Config {
        S3Config {
            bucket: "wasm-projects".into(),
            region: "eu-west-2".into(),
            endpoint: endpoint.map(str::to_string),
            path_style,
            access_key_id: "AKIDEXAMPLE".into(),
            secret_access_key: "very-secret".into(),
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn aws_uses_virtual_hosted_addressing() {
        let store = S3ObjectStore::new(&config(None, false)).unwrap();
        assert_eq!(store.host, "wasm-projects.s3.eu-west-2.amazonaws.com");
        assert_eq!(store.object_path("u 1/p/src/main.go"), "/u%201/p/src/main.go");
        assert_eq!(store.bucket_root(), "/");
    }

    #[test]
    fn custom_endpoint_with_path_style() {
        let store = S3ObjectStore::new(&config(Some("http://localhost:9000"), true)).unwrap();
        assert_eq!(store.scheme, "http");
        assert_eq!(store.host, "localhost:9000");
        assert_eq!(store.object_path("u/p/build/main.wasm"), "/wasm-projects/u/p/build/main.wasm");
        assert_eq!(store.bucket_root(), "/wasm-projects");
    }

    #[test]
    fn missing_bucket_is_rejected() {
        let mut cfg = config(None, false);
        cfg.bucket.clear();
        assert!(matches!(S3ObjectStore::new(&cfg), Err(StorageError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn presigned_url_is_read_only_and_typed() {
        let store = S3ObjectStore::new(&config(None, false)).unwrap();
        let url = store
            .presign_get("u/p/build/main.wasm", Duration::from_secs(604_800), "application/wasm")
            .await
            .unwrap();
        assert!(url.starts_with("https://wasm-projects.s3.eu-west-2.amazonaws.com/u/p/build/main.wasm?"));
        assert!(url.contains("X-Amz-Expires=604800"));
        assert!(url.contains("response-content-type=application%2Fwasm"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(!url.contains("very-secret"));
    }

    #[tokio::test]
    async fn presign_ttl_is_bounded() {
        let store = S3ObjectStore::new(&config(None, false)).unwrap();
        let err = store
            .presign_get("k", Duration::from_secs(MAX_PRESIGN_SECS + 1), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[test]
    fn parses_list_pages() {
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult>
  <IsTruncated>true</IsTruncated>
  <Contents><Key>u/p/src/main.go</Key><Size>12</Size></Contents>
  <Contents><Key>u/p/src/a&amp;b.js</Key><Size>3</Size></Contents>
  <NextContinuationToken>1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=</NextContinuationToken>
</ListBucketResult>"#;
        let (keys, token) = parse_list_page(body);
        assert_eq!(keys, vec!["u/p/src/main.go", "u/p/src/a&b.js"]);
        assert_eq!(
            token.as_deref(),
            Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")
        );

        let (_, last) = parse_list_page("<IsTruncated>false</IsTruncated>");
        assert!(last.is_none());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let shown = format!("{:?}", config(None, false));
        assert!(!shown.contains("very-secret"));
    }
}
