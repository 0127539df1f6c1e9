//! Image acquisition from local paths, HTTP(S) URLs, and inline data references.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::types::{GlvError, GlvResult, ImageReference, INLINE_DATA_PREFIX};

impl ImageReference {
    /// Classify a raw reference string by prefix.
    ///
    /// Inline references must carry a `,` separator followed by a non-empty payload.
    pub fn parse(raw: &str) -> GlvResult<Self> {
        if let Some(rest) = raw.strip_prefix(INLINE_DATA_PREFIX) {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                GlvError::InvalidReference("inline data has no ',' separator".to_string())
            })?;
            if payload.is_empty() {
                return Err(GlvError::InvalidReference(
                    "inline data has no base64 payload".to_string(),
                ));
            }
            let mime = header.split(';').next().unwrap_or("");
            return Ok(ImageReference::InlineData {
                mime_hint: (!mime.is_empty()).then(|| mime.to_string()),
                payload: payload.to_string(),
            });
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(ImageReference::RemoteUrl(raw.to_string()));
        }

        Ok(ImageReference::LocalPath(raw.to_string()))
    }

    /// Short label for logs. Never includes inline payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ImageReference::LocalPath(_) => "local",
            ImageReference::RemoteUrl(_) => "remote",
            ImageReference::InlineData { .. } => "inline",
        }
    }
}

/// Inline payloads are accepted with or without padding and with loose trailing bits.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const LENIENT_STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// Resolves image references into raw bytes.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    http: reqwest::Client,
}

impl ImageLoader {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Parse and load a raw reference string.
    pub async fn load_str(&self, raw: &str) -> GlvResult<Vec<u8>> {
        let reference = ImageReference::parse(raw)?;
        self.load(&reference).await
    }

    /// Materialize the whole resource in memory.
    pub async fn load(&self, reference: &ImageReference) -> GlvResult<Vec<u8>> {
        let bytes = match reference {
            ImageReference::InlineData { payload, .. } => decode_inline(payload)?,
            ImageReference::RemoteUrl(url) => self.fetch(url).await?,
            ImageReference::LocalPath(path) => read_local(path).await?,
        };
        tracing::debug!(
            "Loaded {} image reference: {} bytes",
            reference.kind(),
            bytes.len()
        );
        Ok(bytes)
    }

    async fn fetch(&self, url: &str) -> GlvResult<Vec<u8>> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| GlvError::FetchFailure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GlvError::FetchFailure(format!("HTTP {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| GlvError::FetchFailure(e.to_string()))?;
        Ok(body.to_vec())
    }
}

/// Decode an inline payload. Embedded whitespace (line-wrapped payloads) is ignored and
/// the URL-safe alphabet is picked when `-` or `_` appear.
fn decode_inline(payload: &str) -> GlvResult<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    let engine = if compact.contains(['-', '_']) {
        &LENIENT_URL_SAFE
    } else {
        &LENIENT_STANDARD
    };
    engine
        .decode(&compact)
        .map_err(|e| GlvError::InvalidReference(format!("invalid base64 payload: {e}")))
}

async fn read_local(path: &str) -> GlvResult<Vec<u8>> {
    let read_failure = |source| GlvError::ReadFailure {
        path: path.to_string(),
        source,
    };
    let resolved = std::path::absolute(path).map_err(read_failure)?;
    tokio::fs::read(&resolved).await.map_err(read_failure)
}
