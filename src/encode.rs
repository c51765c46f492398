//! Image transport encoding: raw or base64 image in, `data:` URI out.

use std::borrow::Cow;
use std::io::Cursor;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

/// JPEG quality used when an image has to be re-encoded after resizing.
const RESIZE_JPEG_QUALITY: u8 = 90;

/// An image as handed over by the caller.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw file bytes.
    Bytes(Vec<u8>),
    /// Base64 text, bare or wrapped in a `data:` URI.
    Base64(String),
}

impl ImageSource {
    /// Whether the source carries no image data at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Bytes(bytes) => bytes.is_empty(),
            Self::Base64(text) => split_data_uri(text).map_or(text.as_str(), |(_, p)| p).trim().is_empty(),
        }
    }

    /// Size of the source in bytes as supplied.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Base64(text) => text.len(),
        }
    }
}

/// Split a base64 `data:` URI into its MIME type and payload.
#[must_use]
pub fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    let rest = uri.strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    Some((mime, payload))
}

/// Decode bare base64 or a base64 `data:` URI.
///
/// # Errors
///
/// Returns an error if the payload is not valid base64.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, String> {
    let payload = split_data_uri(text).map_or(text, |(_, p)| p);
    STANDARD.decode(payload.trim()).map_err(|e| format!("invalid base64: {e}"))
}

/// Build a base64 `data:` URI.
#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Encode an image for transport.
///
/// The image is fully decoded so that corrupt input is caught here rather
/// than by the remote model. When `max_dimension` is set and the longer side
/// exceeds it, the image is downscaled and re-encoded as JPEG.
///
/// # Errors
///
/// Returns an error if the data is not base64, not a recognized image
/// format, or cannot be decoded.
pub fn to_data_uri(source: &ImageSource, max_dimension: Option<u32>) -> Result<String, String> {
    let bytes: Cow<'_, [u8]> = match source {
        ImageSource::Bytes(bytes) => Cow::Borrowed(bytes),
        ImageSource::Base64(text) => Cow::Owned(decode_base64(text)?),
    };

    let format =
        image::guess_format(&bytes).map_err(|e| format!("unrecognized image format: {e}"))?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| format!("unreadable {format:?} image: {e}"))?;

    if let Some(max) = max_dimension {
        if img.width() > max || img.height() > max {
            let (width, height) = fit_within(img.width(), img.height(), max);
            log::debug!("resizing {}x{} image to {width}x{height}", img.width(), img.height());
            let resized = img.resize_exact(width, height, FilterType::Lanczos3);
            return Ok(data_uri("image/jpeg", &encode_jpeg(&resized)?));
        }
    }

    Ok(data_uri(format.to_mime_type(), &bytes))
}

/// Scale dimensions so the longer side is at most `max`, keeping the aspect ratio.
#[must_use]
pub fn fit_within(width: u32, height: u32, max: u32) -> (u32, u32) {
    let scale = |side: u32, long: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max) + u64::from(long) / 2) / u64::from(long);
        u32::try_from(scaled).unwrap_or(max).max(1)
    };
    if width > height {
        if width > max {
            return (max, scale(height, width));
        }
    } else if height > max {
        return (scale(width, height), max);
    }
    (width, height)
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, String> {
    let rgb = img.to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, RESIZE_JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| format!("failed to re-encode resized image: {e}"))?;
    Ok(buf.into_inner())
}
