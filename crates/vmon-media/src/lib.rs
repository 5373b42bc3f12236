#![deny(unreachable_patterns)]
//! Media collaborators for the analysis pipelines.
//!
//! This crate provides:
//! - Video sources with rewind support (OpenCV capture, image sequences, in-memory)
//! - Vehicle detection with YOLOv8 on ONNX Runtime behind the `Detector` trait
//! - JPEG encoding behind the `Codec` trait
//! - Frame overlays: markers, lane divider, banners, placeholder frames

#[cfg(feature = "opencv")]
pub mod capture;
pub mod codec;
pub mod detector;
pub mod error;
pub mod overlay;
pub mod source;

/// Raw RGB frame, `width * height * 3` bytes.
pub type Frame = image::RgbImage;

pub use codec::{Codec, JpegCodec};
pub use detector::{Detector, YoloDetector, YoloDetectorConfig, COCO_CLASSES};
pub use error::{MediaError, MediaResult};
pub use overlay::{Overlay, PLACEHOLDER_CAPTION};
pub use source::{
    DefaultSourceOpener, ImageSequenceSource, MemorySource, MemorySourceOpener, ReadOutcome,
    SourceLocator, SourceOpener, VideoSource,
};

#[cfg(feature = "opencv")]
pub use capture::CaptureSource;
