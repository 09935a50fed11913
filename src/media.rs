use async_trait::async_trait;
use axum::body::Bytes;
use serde::Deserialize;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::config::{MediaHostConfig, SignatureAlgorithm};

// 1. MediaHost Contract
/// MediaHost
///
/// Abstract contract for the external media host. Handlers only see this trait, so the
/// real Cloudinary client and the in-memory `MockMediaHost` are interchangeable.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Forwards `bytes` to the host and returns the stored asset's identifier and
    /// metadata. Each call is a single attempt.
    async fn upload_stream(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadedAsset, UploadError>;
}

/// MediaHostState
///
/// The type shared through `AppState`. `None` there means no credentials were configured.
pub type MediaHostState = Arc<dyn MediaHost>;

/// UploadError
///
/// Transport or provider-side failure of an upload.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("media host transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("media host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("media host returned an unreadable response: {0}")]
    InvalidResponse(String),
}

/// ResourceType
///
/// Path segment selecting the host's upload pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceType {
    #[default]
    Image,
    Video,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
        }
    }
}

/// Transformation
///
/// One incoming transformation step applied by the host at upload time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transformation {
    pub quality: Option<String>,
    pub fetch_format: Option<String>,
}

impl Transformation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn fetch_format(mut self, format: impl Into<String>) -> Self {
        self.fetch_format = Some(format.into());
        self
    }

    /// Renders the step in the host's URL syntax, e.g. `q_auto,f_mp4`.
    pub fn to_param(&self) -> String {
        let mut parts = Vec::new();
        if let Some(quality) = &self.quality {
            parts.push(format!("q_{quality}"));
        }
        if let Some(format) = &self.fetch_format {
            parts.push(format!("f_{format}"));
        }
        parts.join(",")
    }
}

/// UploadOptions
///
/// Per-upload placement and processing instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub folder: String,
    pub resource_type: ResourceType,
    pub public_id: Option<String>,
    pub transformations: Vec<Transformation>,
}

impl UploadOptions {
    pub fn new(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = resource_type;
        self
    }

    pub fn public_id(mut self, hint: impl AsRef<str>) -> Self {
        self.public_id = Some(sanitize_public_id(hint.as_ref()));
        self
    }

    pub fn transformation(mut self, step: Transformation) -> Self {
        self.transformations.push(step);
        self
    }

    /// The parameters covered by the request signature, keyed alphabetically.
    fn signed_params(&self, timestamp: i64) -> BTreeMap<&'static str, String> {
        let mut params = BTreeMap::new();
        params.insert("folder", self.folder.clone());
        params.insert("timestamp", timestamp.to_string());
        if let Some(public_id) = &self.public_id {
            params.insert("public_id", public_id.clone());
        }
        if !self.transformations.is_empty() {
            let chain = self
                .transformations
                .iter()
                .map(Transformation::to_param)
                .collect::<Vec<_>>()
                .join("/");
            params.insert("transformation", chain);
        }
        params
    }
}

/// UploadedAsset
///
/// What the host reports back for a stored object.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedAsset {
    pub stored_id: String,
    pub byte_size: u64,
    pub duration_seconds: Option<f64>,
}

/// sanitize_public_id
///
/// Public id hints embed user input (the video title). Path separators, traversal
/// segments and characters the host reserves for URLs are replaced so the hint stays a
/// single, flat identifier inside the configured folder.
pub fn sanitize_public_id(hint: &str) -> String {
    let flattened = hint
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("-");

    flattened
        .chars()
        .map(|c| match c {
            '?' | '&' | '#' | '%' | '<' | '>' | '"' | '\'' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// sign_params
///
/// Request signature: the alphabetically sorted `key=value` pairs joined with `&`, the
/// API secret appended, hashed with `algorithm` and hex encoded.
pub fn sign_params<'a, I>(params: I, api_secret: &str, algorithm: SignatureAlgorithm) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut pairs: Vec<(&str, &str)> = params.into_iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = pairs
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    match algorithm {
        SignatureAlgorithm::Sha1 => hex_digest::<Sha1>(&to_sign, api_secret),
        SignatureAlgorithm::Sha256 => hex_digest::<Sha256>(&to_sign, api_secret),
    }
}

fn hex_digest<D: Digest>(to_sign: &str, api_secret: &str) -> String {
    let mut hasher = D::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

// 2. The Real Implementation (Cloudinary upload API)
/// CloudinaryClient
///
/// Signed multipart uploads against `{api_base}/v1_1/{cloud_name}/{resource_type}/upload`.
/// Built once at startup from `MediaHostConfig`.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    config: MediaHostConfig,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    public_id: String,
    bytes: u64,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Deserialize)]
struct CloudinaryErrorBody {
    error: CloudinaryErrorDetail,
}

#[derive(Deserialize)]
struct CloudinaryErrorDetail {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: MediaHostConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn upload_url(&self, resource_type: ResourceType) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            resource_type.as_str()
        )
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload_stream(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadedAsset, UploadError> {
        let timestamp = chrono::Utc::now().timestamp();
        let params = options.signed_params(timestamp);
        let signature = sign_params(
            params.iter().map(|(key, value)| (*key, value.as_str())),
            &self.config.api_secret,
            self.config.signature_algorithm,
        );

        let length = bytes.len() as u64;
        let file = reqwest::multipart::Part::stream_with_length(bytes, length).file_name("upload");

        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);
        for (key, value) in params {
            form = form.text(key, value);
        }

        let url = self.upload_url(options.resource_type);
        tracing::debug!(%url, folder = %options.folder, bytes = length, "uploading to media host");

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<CloudinaryErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response
            .json::<CloudinaryUploadResponse>()
            .await
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;

        Ok(UploadedAsset {
            stored_id: body.public_id,
            byte_size: body.bytes,
            duration_seconds: body.duration,
        })
    }
}

// 3. The Mock Implementation (For Tests)
/// MockMediaHost
///
/// In-memory stand-in used by the test suite. Records every call's options and answers
/// with a deterministic asset (or a simulated failure).
#[derive(Clone, Default)]
pub struct MockMediaHost {
    /// When true, every upload fails.
    pub should_fail: bool,
    /// Duration reported for uploads; `None` mimics hosts that omit it (e.g. images).
    pub duration_seconds: Option<f64>,
    calls: Arc<Mutex<Vec<UploadOptions>>>,
}

impl MockMediaHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn with_duration(duration_seconds: f64) -> Self {
        Self {
            duration_seconds: Some(duration_seconds),
            ..Self::default()
        }
    }

    /// Options of every upload attempted so far, oldest first.
    pub fn calls(&self) -> Vec<UploadOptions> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MediaHost for MockMediaHost {
    async fn upload_stream(
        &self,
        bytes: Bytes,
        options: UploadOptions,
    ) -> Result<UploadedAsset, UploadError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(options.clone());
        }

        if self.should_fail {
            return Err(UploadError::Rejected {
                status: 500,
                message: "Mock media host error: simulation requested".to_string(),
            });
        }

        let name = options
            .public_id
            .clone()
            .unwrap_or_else(|| format!("mock-{}", bytes.len()));

        Ok(UploadedAsset {
            stored_id: format!("{}/{}", options.folder, name),
            byte_size: bytes.len() as u64,
            duration_seconds: self.duration_seconds,
        })
    }
}
