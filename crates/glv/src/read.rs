//! Direct image reads: load, normalize, and return as a data URL.

use crate::loader::ImageLoader;
use crate::normalize::{normalize, DEFAULT_QUALITY, READ_MAX_SIDE};
use crate::types::{GlvResult, ImagePayload, ImageReadResult};

impl ImageLoader {
    /// Load and normalize an image for direct return to the caller. Never fails; errors
    /// land in the result envelope.
    pub async fn read_image(&self, reference: &str, max_side: Option<u32>) -> ImageReadResult {
        match self.try_read_image(reference, max_side).await {
            Ok(image) => ImageReadResult {
                ok: true,
                image: Some(image),
                error: None,
            },
            Err(e) => {
                tracing::warn!("read_image failed: {e}");
                ImageReadResult {
                    ok: false,
                    image: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub async fn try_read_image(
        &self,
        reference: &str,
        max_side: Option<u32>,
    ) -> GlvResult<ImagePayload> {
        let bytes = self.load_str(reference).await?;
        let image = normalize(bytes, max_side.unwrap_or(READ_MAX_SIDE), DEFAULT_QUALITY);

        Ok(ImagePayload {
            source: source_label(reference),
            mime: image.mime.to_string(),
            data_url: image.data_url(),
            width: image.width,
            height: image.height,
            transcoded: image.transcoded,
        })
    }
}

/// Inline payloads are not echoed back in full.
fn source_label(reference: &str) -> String {
    match reference.split_once(',') {
        Some((header, _)) if reference.starts_with(crate::types::INLINE_DATA_PREFIX) => {
            format!("{header},...")
        }
        _ => reference.to_string(),
    }
}
