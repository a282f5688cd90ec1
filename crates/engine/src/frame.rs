use std::fmt::{Display, Formatter};
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbaImage};

use crate::error::{Result, TimelineError};

const JPEG_QUALITY: u8 = 82;

/// Stable identity of an encoded frame payload (blake3 of the bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey([u8; 32]);

impl ContentKey {
    pub fn of(bytes: &[u8]) -> Self {
        Self(*blake3::hash(bytes).as_bytes())
    }
}

impl Display for ContentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Encoded still image of one sampled frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    key: ContentKey,
    width: u32,
    height: u32,
    encoded: Arc<[u8]>,
}

impl FrameImage {
    /// Encodes captured pixels as JPEG.
    pub fn encode(pixels: &RgbaImage) -> std::result::Result<Self, image::ImageError> {
        let (width, height) = pixels.dimensions();
        let rgb: Vec<u8> = pixels
            .pixels()
            .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
            .collect();
        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode(
            &rgb,
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(Self::from_encoded(width, height, encoded))
    }

    pub fn from_encoded(width: u32, height: u32, encoded: impl Into<Arc<[u8]>>) -> Self {
        let encoded = encoded.into();
        Self {
            key: ContentKey::of(&encoded),
            width,
            height,
            encoded,
        }
    }

    pub fn key(&self) -> ContentKey {
        self.key
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// JPEG bytes as produced by the sampler.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    /// Decodes the payload back into pixels.
    pub fn decode(&self) -> Result<RgbaImage> {
        image::load_from_memory(&self.encoded)
            .map(|decoded| decoded.to_rgba8())
            .map_err(|err| TimelineError::ThumbnailResolve {
                key: self.key,
                reason: err.to_string(),
            })
    }
}

/// A still image captured at `time` seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub time: f64,
    pub image: FrameImage,
}

/// Width that keeps the source aspect ratio at `frame_height`.
///
/// # Example
/// ```
/// use engine::frame::scaled_width;
///
/// assert_eq!(scaled_width(1920, 1080, 50), 89);
/// ```
pub fn scaled_width(source_width: u32, source_height: u32, frame_height: u32) -> u32 {
    if source_height == 0 {
        return 1;
    }
    let width = f64::from(frame_height) * f64::from(source_width) / f64::from(source_height);
    (width.round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn encoded_frame_decodes_to_same_size_and_similar_color() {
        let pixels = RgbaImage::from_pixel(16, 8, Rgba([200, 40, 40, 255]));

        let frame = FrameImage::encode(&pixels).expect("jpeg encode should succeed");
        let decoded = frame.decode().expect("jpeg decode should succeed");

        assert_eq!(frame.dimensions(), (16, 8));
        assert_eq!(decoded.dimensions(), (16, 8));
        let pixel = decoded.get_pixel(8, 4);
        assert!(pixel[0] > 150 && pixel[1] < 90, "unexpected color {pixel:?}");
    }

    #[test]
    fn identical_payloads_share_a_content_key() {
        let a = FrameImage::from_encoded(1, 1, vec![1, 2, 3]);
        let b = FrameImage::from_encoded(1, 1, vec![1, 2, 3]);
        let c = FrameImage::from_encoded(1, 1, vec![1, 2, 4]);

        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn garbage_payload_fails_as_thumbnail_resolve() {
        let frame = FrameImage::from_encoded(4, 4, vec![0u8; 12]);

        assert!(matches!(
            frame.decode(),
            Err(TimelineError::ThumbnailResolve { .. })
        ));
    }

    #[test]
    fn scaled_width_preserves_aspect_and_never_hits_zero() {
        assert_eq!(scaled_width(160, 90, 50), 89);
        assert_eq!(scaled_width(90, 160, 50), 28);
        assert_eq!(scaled_width(1, 1000, 50), 1);
    }
}
