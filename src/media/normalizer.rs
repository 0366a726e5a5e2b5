//! Upload normalization. Captured and picked images are resized and
//! re-encoded before they ride a rural uplink; everything else passes
//! through untouched.

use std::io::Cursor;

use anyhow::{Context, Result};
use image::{imageops::FilterType, DynamicImage, ImageFormat, ImageReader};
use log::warn;

const MAX_WIDTH_PX: u32 = 1280;
/// Files already this small and in the preferred format are not worth
/// another decode/encode round trip.
const SMALL_WEBP_BYTES: usize = 512 * 1024;
/// Hard budget for the re-encoded output.
const MAX_OUTPUT_BYTES: usize = 2 * 1024 * 1024;
const JPEG_FALLBACK_QUALITY: u8 = 70;

const WEBP_MIME: &str = "image/webp";
const JPEG_MIME: &str = "image/jpeg";

#[derive(Debug, Clone)]
pub struct NormalizedMedia {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Normalizes one file for upload.
///
/// Images are capped at 1280 px width (aspect preserved) and re-encoded
/// as lossless WebP; when that encode fails or overshoots the output
/// budget, the fallback is JPEG at quality 70. Non-images and small
/// already-WebP files pass through unchanged. A decode failure is an
/// error the caller must treat as non-fatal.
pub fn normalize(name: &str, mime: &str, bytes: Vec<u8>) -> Result<NormalizedMedia> {
    if !mime.starts_with("image/") {
        return Ok(NormalizedMedia {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
    }

    if mime == WEBP_MIME && bytes.len() < SMALL_WEBP_BYTES {
        return Ok(NormalizedMedia {
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
        });
    }

    let decoded = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .context("failed to sniff image format")?
        .decode()
        .with_context(|| format!("failed to decode image '{name}'"))?;

    let resized = if decoded.width() > MAX_WIDTH_PX {
        let scaled_height = ((decoded.height() as f64) * (MAX_WIDTH_PX as f64)
            / (decoded.width() as f64))
            .round()
            .max(1.0) as u32;
        decoded.resize_exact(MAX_WIDTH_PX, scaled_height, FilterType::CatmullRom)
    } else {
        decoded
    };

    // The WebP encoder only takes 8-bit buffers.
    let source = if resized.color().has_alpha() {
        DynamicImage::ImageRgba8(resized.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    };

    let mut webp_out = Cursor::new(Vec::new());
    match source.write_to(&mut webp_out, ImageFormat::WebP) {
        Ok(()) if webp_out.get_ref().len() <= MAX_OUTPUT_BYTES => {
            return Ok(NormalizedMedia {
                name: with_extension(name, "webp"),
                mime: WEBP_MIME.to_string(),
                bytes: webp_out.into_inner(),
            });
        }
        Ok(()) => {
            warn!(
                "WebP output for '{name}' is {} bytes, over budget; falling back to JPEG",
                webp_out.get_ref().len()
            );
        }
        Err(err) => {
            warn!("WebP encode failed for '{name}', falling back to JPEG: {err}");
        }
    }

    let rgb = DynamicImage::ImageRgb8(source.to_rgb8());
    let mut jpeg_out = Cursor::new(Vec::new());
    let encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg_out, JPEG_FALLBACK_QUALITY);
    rgb.write_with_encoder(encoder)
        .with_context(|| format!("failed to encode fallback JPEG for '{name}'"))?;

    Ok(NormalizedMedia {
        name: with_extension(name, "jpg"),
        mime: JPEG_MIME.to_string(),
        bytes: jpeg_out.into_inner(),
    })
}

fn with_extension(name: &str, ext: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{ext}"),
        _ => format!("{name}.{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([120, 40, 40]),
        ));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn non_image_passes_through() {
        let bytes = vec![1, 2, 3, 4];
        let result = normalize("clip.webm", "video/webm", bytes.clone()).unwrap();
        assert_eq!(result.name, "clip.webm");
        assert_eq!(result.mime, "video/webm");
        assert_eq!(result.bytes, bytes);
    }

    #[test]
    fn small_webp_passes_through() {
        let bytes = vec![0u8; 1024];
        let result = normalize("photo.webp", "image/webp", bytes.clone()).unwrap();
        assert_eq!(result.bytes, bytes);
        assert_eq!(result.mime, "image/webp");
    }

    #[test]
    fn wide_image_is_capped_at_max_width() {
        let bytes = png_bytes(2560, 1440);
        let result = normalize("photo.png", "image/png", bytes).unwrap();
        assert_eq!(result.mime, "image/webp");
        assert_eq!(result.name, "photo.webp");

        let reencoded = ImageReader::new(Cursor::new(&result.bytes))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(reencoded.width(), 1280);
        assert_eq!(reencoded.height(), 720);
    }

    #[test]
    fn narrow_image_keeps_its_dimensions() {
        let bytes = png_bytes(640, 480);
        let result = normalize("photo.png", "image/png", bytes).unwrap();

        let reencoded = ImageReader::new(Cursor::new(&result.bytes))
            .with_guessed_format()
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(reencoded.width(), 640);
        assert_eq!(reencoded.height(), 480);
    }

    #[test]
    fn undecodable_image_is_an_error() {
        let result = normalize("photo.jpg", "image/jpeg", vec![0u8; 64]);
        assert!(result.is_err());
    }

    #[test]
    fn extension_is_rewritten() {
        assert_eq!(with_extension("a.b.jpg", "webp"), "a.b.webp");
        assert_eq!(with_extension("noext", "jpg"), "noext.jpg");
    }
}
