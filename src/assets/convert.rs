use crate::error::AssetError;
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

/// Re-encodes raster bytes to the canonical lossy format (JPEG).
///
/// Decode and encode are CPU-bound and run on the blocking pool so the
/// fetch workers keep draining their queue. A decode failure discards the
/// bytes; the caller marks the record failed rather than passing the
/// originals off under a claimed-converted format.
pub async fn to_canonical_jpeg(bytes: Vec<u8>, quality: u8) -> Result<Vec<u8>, AssetError> {
    tokio::task::spawn_blocking(move || encode_jpeg(&bytes, quality))
        .await
        .map_err(|e| AssetError::Encode(format!("conversion task panicked: {}", e)))?
}

fn encode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, AssetError> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| AssetError::Decode(e.to_string()))?;

    // JPEG has no alpha channel; composite transparent pixels onto white
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut flattened = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = pixel[3] as u32;
        if alpha == 0 {
            continue;
        }
        let blend = |fg: u8| ((fg as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        flattened.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode_image(&flattened)
        .map_err(|e| AssetError::Encode(e.to_string()))?;
    Ok(out)
}
