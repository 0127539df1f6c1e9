//! Bounded resize and JPEG re-encoding for transport.

use std::io::Cursor;

use base64::Engine;
use image::{DynamicImage, GenericImageView, ImageReader};
use jpeg_encoder::{ColorType, Encoder};

use crate::types::{GlvError, GlvResult, NormalizedImage, CANONICAL_MIME};

/// Longer-side bound for direct image reads.
pub const READ_MAX_SIDE: u32 = 1024;

/// JPEG quality when the caller does not specify one.
pub const DEFAULT_QUALITY: u8 = 80;

/// Longer-side bound for images sent to the vision model.
pub const QUERY_MAX_SIDE: u32 = 800;

/// JPEG quality for images sent to the vision model.
pub const QUERY_QUALITY: u8 = 75;

/// Assumed size when an image reports no dimensions.
const FALLBACK_SIDE: u32 = 1024;

impl NormalizedImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:image/jpeg;base64,...` form of the image.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.to_base64())
    }
}

/// Shrink an image to fit inside `max_side` and re-encode it as progressive JPEG.
///
/// Never fails: if the buffer cannot be decoded or encoded, the original bytes come
/// back unchanged with `transcoded = false`.
pub fn normalize(bytes: Vec<u8>, max_side: u32, quality: u8) -> NormalizedImage {
    match transcode(&bytes, max_side.max(1), quality.clamp(1, 100)) {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Image normalization failed, passing original bytes through: {e}");
            NormalizedImage {
                bytes,
                mime: CANONICAL_MIME,
                width: None,
                height: None,
                transcoded: false,
            }
        }
    }
}

/// Target size for a fit-inside resize. Never upscales.
pub fn fit_inside(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width <= max_side && height <= max_side {
        return (width, height);
    }
    let ratio = max_side as f64 / width.max(height) as f64;
    let scale = |side: u32| ((side as f64 * ratio).round() as u32).clamp(1, max_side);
    (scale(width), scale(height))
}

fn transcode(bytes: &[u8], max_side: u32, quality: u8) -> GlvResult<NormalizedImage> {
    let img = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| GlvError::TranscodeFailure(e.to_string()))?
        .decode()
        .map_err(|e| GlvError::TranscodeFailure(e.to_string()))?;

    let (width, height) = match img.dimensions() {
        (0, _) | (_, 0) => (FALLBACK_SIDE, FALLBACK_SIDE),
        dims => dims,
    };
    let (target_w, target_h) = fit_inside(width, height, max_side);

    let resized = if (target_w, target_h) != img.dimensions() {
        img.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let encoded = encode_jpeg(&resized, quality)?;
    tracing::debug!(
        "Normalized {}x{} -> {}x{} ({} -> {} bytes)",
        width,
        height,
        resized.width(),
        resized.height(),
        bytes.len(),
        encoded.len()
    );

    Ok(NormalizedImage {
        bytes: encoded,
        mime: CANONICAL_MIME,
        width: Some(resized.width()),
        height: Some(resized.height()),
        transcoded: true,
    })
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> GlvResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let side = |v: u32| {
        u16::try_from(v).map_err(|_| {
            GlvError::TranscodeFailure(format!("{v} px exceeds the JPEG size limit"))
        })
    };
    let (width, height) = (side(rgb.width())?, side(rgb.height())?);

    let mut buf = Vec::new();
    let mut encoder = Encoder::new(&mut buf, quality);
    encoder.set_progressive(true);
    encoder
        .encode(rgb.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| GlvError::TranscodeFailure(e.to_string()))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        img.write_with_encoder(encoder).unwrap();
        buf
    }

    #[test]
    fn test_fit_inside() {
        assert_eq!(fit_inside(2000, 1000, 1024), (1024, 512));
        assert_eq!(fit_inside(1000, 3000, 800), (267, 800));
        assert_eq!(fit_inside(640, 480, 1024), (640, 480));
        assert_eq!(fit_inside(5000, 3, 800), (800, 1));
    }

    #[test]
    fn test_large_image_is_bounded() {
        let result = normalize(png(2000, 1000), READ_MAX_SIDE, DEFAULT_QUALITY);
        assert!(result.transcoded);
        assert_eq!(result.width, Some(1024));
        assert_eq!(result.height, Some(512));

        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 512));
        assert_eq!(&result.bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_aspect_ratio_preserved_across_shapes() {
        for (w, h) in [(1600, 1200), (900, 2400), (1025, 1025), (3000, 701)] {
            let result = normalize(png(w, h), QUERY_MAX_SIDE, QUERY_QUALITY);
            let (nw, nh) = (result.width.unwrap(), result.height.unwrap());
            assert!(nw.max(nh) <= QUERY_MAX_SIDE, "{w}x{h} -> {nw}x{nh}");

            let before = w as f64 / h as f64;
            let after = nw as f64 / nh as f64;
            let tolerance = 1.0 / nw.min(nh) as f64 + 1e-9;
            assert!(
                (before - after).abs() / before <= tolerance,
                "{w}x{h} -> {nw}x{nh}"
            );
        }
    }

    #[test]
    fn test_output_is_progressive_jpeg() {
        let result = normalize(png(300, 200), READ_MAX_SIDE, DEFAULT_QUALITY);
        assert!(result.transcoded);

        let has_marker = |marker: u8| result.bytes.windows(2).any(|w| w == [0xFF, marker]);
        assert!(has_marker(0xC2), "missing SOF2 marker");
        assert!(!has_marker(0xC0), "baseline SOF0 marker present");
        assert_eq!(
            image::load_from_memory(&result.bytes).unwrap().dimensions(),
            (300, 200)
        );
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let result = normalize(png(120, 80), READ_MAX_SIDE, DEFAULT_QUALITY);
        assert_eq!(result.width, Some(120));
        assert_eq!(result.height, Some(80));
        assert_eq!(result.mime, "image/jpeg");
    }

    #[test]
    fn test_alpha_channel_is_flattened() {
        let img = DynamicImage::new_rgba8(40, 20);
        let mut buf = Vec::new();
        img.write_with_encoder(image::codecs::png::PngEncoder::new(&mut buf))
            .unwrap();

        let result = normalize(buf, READ_MAX_SIDE, DEFAULT_QUALITY);
        assert!(result.transcoded);
        assert!(image::load_from_memory(&result.bytes).is_ok());
    }

    #[test]
    fn test_corrupt_bytes_fall_back_to_original() {
        let garbage = b"definitely not an image".to_vec();
        let result = normalize(garbage.clone(), READ_MAX_SIDE, DEFAULT_QUALITY);
        assert!(!result.transcoded);
        assert_eq!(result.bytes, garbage);
        assert_eq!(result.mime, CANONICAL_MIME);
        assert_eq!(result.width, None);
    }

    #[test]
    fn test_data_url() {
        let image = NormalizedImage {
            bytes: vec![1, 2, 3],
            mime: CANONICAL_MIME,
            width: None,
            height: None,
            transcoded: false,
        };
        assert_eq!(image.data_url(), "data:image/jpeg;base64,AQID");
    }
}
