//! Frame compression for streaming.

use image::codecs::jpeg::JpegEncoder;

use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Compresses raw frames for transport.
pub trait Codec: Send + Sync {
    /// MIME type of the encoded output.
    fn content_type(&self) -> &'static str;

    fn encode(&self, frame: &Frame) -> MediaResult<Vec<u8>>;
}

/// Baseline JPEG encoder.
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// `quality` is clamped to 1..=100.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new(80)
    }
}

impl Codec for JpegCodec {
    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }

    fn encode(&self, frame: &Frame) -> MediaResult<Vec<u8>> {
        let mut buf = Vec::with_capacity(frame.as_raw().len() / 8);
        JpegEncoder::new_with_quality(&mut buf, self.quality)
            .encode_image(frame)
            .map_err(|e| MediaError::encode_failed(e.to_string()))?;
        Ok(buf)
    }
}
