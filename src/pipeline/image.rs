//! Image extraction: base64 payload → [`ImageDocument`].
//!
//! The pixels are fully decoded so a truncated or corrupt file fails here
//! with [`DocProcError::ImageDecodeError`] instead of surfacing later as a
//! confusing LLM answer about an image nobody could read.

use crate::document::ImageDocument;
use crate::error::DocProcError;
use crate::pipeline::decode;
use image::{ColorType, ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// Decode a base64 / data-URL image payload.
pub async fn extract_image(payload: &str) -> Result<ImageDocument, DocProcError> {
    let bytes = decode::decode_payload(payload).map_err(|e| DocProcError::ImageDecodeError {
        detail: format!("invalid base64: {e}"),
    })?;
    extract_image_bytes(bytes).await
}

/// Decode raw image bytes.
///
/// Decoding is CPU-bound, so it runs on the blocking pool.
pub async fn extract_image_bytes(bytes: Vec<u8>) -> Result<ImageDocument, DocProcError> {
    tokio::task::spawn_blocking(move || decode_image_blocking(&bytes)).await?
}

fn decode_image_blocking(bytes: &[u8]) -> Result<ImageDocument, DocProcError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| DocProcError::ImageDecodeError {
            detail: e.to_string(),
        })?;

    let format = reader.format().ok_or_else(|| DocProcError::ImageDecodeError {
        detail: "unknown image format".into(),
    })?;

    let image = reader.decode().map_err(|e| DocProcError::ImageDecodeError {
        detail: e.to_string(),
    })?;

    debug!(
        format = ?format,
        width = image.width(),
        height = image.height(),
        "Decoded image"
    );

    Ok(ImageDocument {
        format: format_name(format),
        width: image.width(),
        height: image.height(),
        mode: color_mode(image.color()).to_string(),
        base64_data: decode::encode_base64(bytes),
    })
}

/// Upper-case format name, as image tooling conventionally reports it.
fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Png => "PNG".into(),
        ImageFormat::Jpeg => "JPEG".into(),
        ImageFormat::Gif => "GIF".into(),
        ImageFormat::WebP => "WEBP".into(),
        ImageFormat::Bmp => "BMP".into(),
        ImageFormat::Tiff => "TIFF".into(),
        other => format!("{:?}", other).to_uppercase(),
    }
}

/// Short colour-mode name (`L`, `LA`, `RGB`, `RGBA`, …).
fn color_mode(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 => "L",
        ColorType::La8 => "LA",
        ColorType::Rgb8 => "RGB",
        ColorType::Rgba8 => "RGBA",
        ColorType::L16 => "I;16",
        ColorType::La16 => "LA;16",
        ColorType::Rgb16 => "RGB;16",
        ColorType::Rgba16 => "RGBA;16",
        ColorType::Rgb32F => "RGB;F",
        ColorType::Rgba32F => "RGBA;F",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn encode_as(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), format)
            .expect("encode should succeed");
        buf
    }

    #[tokio::test]
    async fn png_metadata() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(12, 7, Rgba([255, 0, 0, 255])));
        let bytes = encode_as(&img, ImageFormat::Png);
        let doc = extract_image(&decode::encode_base64(&bytes)).await.unwrap();
        assert_eq!(doc.format, "PNG");
        assert_eq!((doc.width, doc.height), (12, 7));
        assert_eq!(doc.mode, "RGBA");
        assert_eq!(decode::decode_base64(&doc.base64_data).unwrap(), bytes);
    }

    #[tokio::test]
    async fn jpeg_data_url() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 16, Rgb([10, 200, 30])));
        let bytes = encode_as(&img, ImageFormat::Jpeg);
        let payload = format!("data:image/jpeg;base64,{}", decode::encode_base64(&bytes));
        let doc = extract_image(&payload).await.unwrap();
        assert_eq!(doc.format, "JPEG");
        assert_eq!(doc.mode, "RGB");
        assert_eq!(doc.width, 16);
    }

    #[tokio::test]
    async fn corrupt_bytes_fail() {
        let payload = decode::encode_base64(b"definitely not an image");
        let err = extract_image(&payload).await.unwrap_err();
        assert!(matches!(err, DocProcError::ImageDecodeError { .. }));
    }

    #[tokio::test]
    async fn truncated_png_fails() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 32, Rgb([1, 2, 3])));
        let bytes = encode_as(&img, ImageFormat::Png);
        let truncated = bytes[..bytes.len() / 2].to_vec();
        let err = extract_image_bytes(truncated).await.unwrap_err();
        assert!(matches!(err, DocProcError::ImageDecodeError { .. }));
    }

    #[tokio::test]
    async fn invalid_base64_fails() {
        let err = extract_image("@@not-base64@@").await.unwrap_err();
        assert!(matches!(err, DocProcError::ImageDecodeError { .. }));
    }
}
