//! Decoding and encoding between bytes and RGBA buffers.
//!
//! Supports raw encoded bytes and `data:` URIs (base64 or percent-encoded).

use std::io::Cursor;

use image::RgbaImage;
use kanvas_core::{ImageSource, Size};

use crate::error::{CompositeError, CompositeResult};

/// Image formats recognised by signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// PNG with alpha support.
    Png,
    /// JPEG (no alpha).
    Jpeg,
    /// WebP (alpha support).
    WebP,
    /// GIF.
    Gif,
    /// Unknown/other format.
    Unknown,
}

impl ImageFormat {
    /// Detect format from MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        match mime.to_lowercase().as_str() {
            "image/png" => Self::Png,
            "image/jpeg" | "image/jpg" => Self::Jpeg,
            "image/webp" => Self::WebP,
            "image/gif" => Self::Gif,
            _ => Self::Unknown,
        }
    }

    /// Detect format from magic bytes.
    #[must_use]
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.len() < 4 {
            return Self::Unknown;
        }

        // PNG: 89 50 4E 47
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Self::Png;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Self::Jpeg;
        }

        if data.starts_with(b"GIF8") {
            return Self::Gif;
        }

        // WebP: RIFF....WEBP
        if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
            return Self::WebP;
        }

        Self::Unknown
    }
}

/// Decode encoded bytes into an RGBA buffer.
///
/// # Errors
///
/// Returns [`CompositeError::Decode`] if the bytes are not a supported image.
pub fn decode(data: &[u8]) -> CompositeResult<RgbaImage> {
    let format = ImageFormat::from_magic_bytes(data);
    let img = image::load_from_memory(data).map_err(|e| {
        CompositeError::Decode(format!("{e} ({format:?}, {} bytes)", data.len()))
    })?;
    tracing::trace!(?format, width = img.width(), height = img.height(), "decoded image");
    Ok(img.to_rgba8())
}

/// Encode an RGBA buffer as PNG.
///
/// # Errors
///
/// Returns [`CompositeError::Encode`] if encoding fails.
pub fn encode_png(img: &RgbaImage) -> CompositeResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| CompositeError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

/// Encode an RGBA buffer as PNG and wrap it as a new image source.
///
/// # Errors
///
/// Returns [`CompositeError::Encode`] if encoding fails.
pub fn to_source(img: &RgbaImage) -> CompositeResult<ImageSource> {
    Ok(ImageSource::encoded(encode_png(img)?))
}

/// Native size of a buffer as floating-point dimensions.
#[must_use]
pub fn native_size(img: &RgbaImage) -> Size {
    Size::new(f64::from(img.width()), f64::from(img.height()))
}

/// Extract the payload bytes of a `data:` URI.
///
/// Supports formats like: `data:image/png;base64,iVBORw0KGgo...`
///
/// # Errors
///
/// Returns [`CompositeError::Fetch`] if the URI is malformed.
pub fn parse_data_uri(uri: &str) -> CompositeResult<Vec<u8>> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| CompositeError::Fetch("Not a data URI".to_string()))?;

    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| CompositeError::Fetch("Invalid data URI: missing comma".to_string()))?;

    let mime = metadata.split(';').next().unwrap_or_default();
    tracing::trace!(format = ?ImageFormat::from_mime(mime), "parsing data URI");

    if metadata.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| CompositeError::Fetch(format!("Failed to decode base64: {e}")))
    } else {
        percent_decode(payload)
    }
}

/// Percent-decoding of a data URI payload.
fn percent_decode(input: &str) -> CompositeResult<Vec<u8>> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| CompositeError::Fetch("Invalid URL encoding".to_string()))?;
            result.push(hex);
            i += 3;
        } else {
            result.push(bytes[i]);
            i += 1;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 red pixel PNG.
    const RED_PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8DwHwAFBQIAX8jx0gAAAABJRU5ErkJggg==";

    #[test]
    fn test_format_detection_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/png"), ImageFormat::Png);
        assert_eq!(ImageFormat::from_mime("IMAGE/JPEG"), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_mime("image/gif"), ImageFormat::Gif);
        assert_eq!(ImageFormat::from_mime("text/plain"), ImageFormat::Unknown);
    }

    #[test]
    fn test_format_detection_from_magic_bytes() {
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]),
            ImageFormat::Jpeg
        );
        assert_eq!(
            ImageFormat::from_magic_bytes(b"RIFF\x00\x00\x00\x00WEBP"),
            ImageFormat::WebP
        );
        assert_eq!(ImageFormat::from_magic_bytes(b"GIF89a"), ImageFormat::Gif);
    }

    #[test]
    fn test_data_uri_decodes() {
        let uri = format!("data:image/png;base64,{RED_PNG_B64}");
        let bytes = parse_data_uri(&uri).expect("should parse");
        let img = decode(&bytes).expect("should decode");
        assert_eq!(img.dimensions(), (1, 1));
    }

    #[test]
    fn test_placeholder_uri_decodes() {
        let bytes = parse_data_uri(kanvas_core::PLACEHOLDER_DATA_URI).expect("should parse");
        let img = decode(&bytes).expect("should decode");
        assert_eq!(img.dimensions(), (1, 1));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn test_percent_encoded_data_uri() {
        let bytes = parse_data_uri("data:text/plain,a%20b%41").expect("should parse");
        assert_eq!(bytes, b"a bA");
        assert!(parse_data_uri("data:text/plain,%zz").is_err());
    }

    #[test]
    fn test_invalid_data_uri() {
        assert!(parse_data_uri("not a data uri").is_err());
        assert!(parse_data_uri("data:image/png").is_err());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let err = decode(b"definitely not an image").expect_err("should fail");
        assert!(err.is_decode_failure());
    }

    #[test]
    fn test_png_round_trip_preserves_alpha() {
        let mut img = RgbaImage::new(3, 2);
        img.put_pixel(1, 1, image::Rgba([10, 20, 30, 40]));
        let bytes = encode_png(&img).expect("encode");
        assert_eq!(ImageFormat::from_magic_bytes(&bytes), ImageFormat::Png);
        let back = decode(&bytes).expect("decode");
        assert_eq!(back.get_pixel(1, 1), &image::Rgba([10, 20, 30, 40]));
    }
}
