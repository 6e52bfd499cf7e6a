use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;
use thiserror::Error;

/// Avatars larger than this many encoded bytes are recompressed before saving.
pub const AVATAR_RECOMPRESS_THRESHOLD: usize = 200_000;

/// Size the recompression aims for.
pub const AVATAR_TARGET_BYTES: usize = 150_000;

/// Longest edge of a recompressed avatar, in pixels.
pub const AVATAR_MAX_DIMENSION: u32 = 512;

/// JPEG quality of the first attempt, in percent.
const START_QUALITY: u8 = 92;

/// Quality drop between attempts.
const QUALITY_STEP: u8 = 8;

/// Lowest JPEG quality tried.
pub const QUALITY_FLOOR: u8 = 32;

const JPEG_MIME: &str = "image/jpeg";

/// Errors that can occur while recompressing an avatar
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Avatar is not a base64 data URL")]
    NotDataUrl,

    #[error("Avatar payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Avatar image could not be processed: {0}")]
    Image(#[from] image::ImageError),
}

/// Split a `data:<mime>;base64,<payload>` URL and decode its payload.
pub fn decode_data_url(data_url: &str) -> Result<Vec<u8>, AvatarError> {
    let rest = data_url.strip_prefix("data:").ok_or(AvatarError::NotDataUrl)?;
    let (header, payload) = rest.split_once(',').ok_or(AvatarError::NotDataUrl)?;
    if !header.ends_with(";base64") {
        return Err(AvatarError::NotDataUrl);
    }
    Ok(STANDARD.decode(payload.trim())?)
}

/// Build a base64 data URL.
pub fn encode_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Recompress an avatar data URL into a JPEG data URL.
///
/// The image is downscaled so its longest edge is at most
/// [`AVATAR_MAX_DIMENSION`], then encoded at decreasing JPEG quality (92%, 84%,
/// ... down to [`QUALITY_FLOOR`]) until the data URL fits in `max_bytes`. The
/// attempt at the floor quality is returned even when it is still too large;
/// callers decide what to do with an oversized result.
pub fn compress_data_url(data_url: &str, max_bytes: usize) -> Result<String, AvatarError> {
    let bytes = decode_data_url(data_url)?;
    let img = image::load_from_memory(&bytes)?;

    let (width, height) = img.dimensions();
    let longest = width.max(height).max(1);
    let scale = (AVATAR_MAX_DIMENSION as f64 / longest as f64).min(1.0);
    let target_w = ((width as f64 * scale).round() as u32).max(1);
    let target_h = ((height as f64 * scale).round() as u32).max(1);

    let rgb = if (target_w, target_h) == (width, height) {
        img.to_rgb8()
    } else {
        img.resize_exact(target_w, target_h, FilterType::Triangle).to_rgb8()
    };

    let mut quality = START_QUALITY;
    loop {
        let mut encoded = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut encoded, quality))?;
        let out = encode_data_url(JPEG_MIME, &encoded);

        tracing::debug!(
            "Avatar {}x{} at quality {}: {} bytes",
            target_w,
            target_h,
            quality,
            out.len()
        );

        if out.len() <= max_bytes || quality <= QUALITY_FLOOR {
            return Ok(out);
        }
        quality = quality.saturating_sub(QUALITY_STEP).max(QUALITY_FLOOR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    fn gradient_png_data_url(width: u32, height: u32) -> String {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        encode_data_url("image/png", &bytes)
    }

    #[test]
    fn test_data_url_roundtrip() {
        let url = encode_data_url("image/png", b"hello");
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(decode_data_url(&url).unwrap(), b"hello");
    }

    #[test]
    fn test_decode_rejects_plain_urls() {
        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(AvatarError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/png,rawbytes"),
            Err(AvatarError::NotDataUrl)
        ));
    }

    #[test]
    fn test_compress_downscales_long_edge() {
        let url = gradient_png_data_url(800, 600);
        let out = compress_data_url(&url, AVATAR_TARGET_BYTES).unwrap();

        assert!(out.starts_with("data:image/jpeg;base64,"));
        assert!(out.len() <= AVATAR_TARGET_BYTES);

        let decoded = image::load_from_memory(&decode_data_url(&out).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (512, 384));
    }

    #[test]
    fn test_compress_keeps_small_images_at_size() {
        let url = gradient_png_data_url(64, 32);
        let out = compress_data_url(&url, AVATAR_TARGET_BYTES).unwrap();
        let decoded = image::load_from_memory(&decode_data_url(&out).unwrap()).unwrap();
        assert_eq!(decoded.dimensions(), (64, 32));
    }

    #[test]
    fn test_compress_gives_up_at_quality_floor() {
        let url = gradient_png_data_url(128, 128);
        // An impossible budget still yields the floor-quality attempt
        let out = compress_data_url(&url, 10).unwrap();
        assert!(out.len() > 10);
    }

    #[test]
    fn test_compress_undecodable_image() {
        let url = encode_data_url("image/png", &[0u8; 64]);
        assert!(matches!(
            compress_data_url(&url, AVATAR_TARGET_BYTES),
            Err(AvatarError::Image(_))
        ));
    }
}
