use std::path::Path;

use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat, ImageReader};

/// Re-opens the file at `path`, converts it to 8-bit RGB if it is anything
/// else, and overwrites it as PNG. The on-disk format is guessed from content
/// since upstream may send JPEG or WebP bytes regardless of the file name.
pub fn normalize_to_rgb_png(path: &Path) -> Result<()> {
    let image = ImageReader::open(path)
        .map_err(|err| anyhow!("open image failed: {err}"))?
        .with_guessed_format()
        .map_err(|err| anyhow!("read image header failed: {err}"))?
        .decode()
        .map_err(|err| anyhow!("decode image failed: {err}"))?;
    let rgb = match image {
        DynamicImage::ImageRgb8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    };
    rgb.save_with_format(path, ImageFormat::Png)
        .map_err(|err| anyhow!("encode png failed: {err}"))?;
    Ok(())
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    None
}
