//! OpenCV `videoio` capture for video files and local cameras.

use std::path::Path;

use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_POS_FRAMES};
use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::source::{ReadOutcome, VideoSource};
use crate::Frame;

/// A file or camera opened through OpenCV.
pub struct CaptureSource {
    cap: VideoCapture,
    label: String,
}

impl CaptureSource {
    /// Open a video file.
    pub fn open_file(path: &Path) -> MediaResult<Self> {
        let label = path.display().to_string();
        let cap = VideoCapture::from_file(&label, CAP_ANY)
            .map_err(|e| MediaError::source_unavailable(format!("{}: {}", label, e)))?;
        Self::checked(cap, label)
    }

    /// Open a local camera by device index.
    pub fn open_camera(index: i32) -> MediaResult<Self> {
        let label = format!("camera:{}", index);
        let cap = VideoCapture::new(index, CAP_ANY)
            .map_err(|e| MediaError::source_unavailable(format!("{}: {}", label, e)))?;
        Self::checked(cap, label)
    }

    fn checked(cap: VideoCapture, label: String) -> MediaResult<Self> {
        if !cap.is_opened().unwrap_or(false) {
            return Err(MediaError::source_unavailable(format!(
                "Could not open video source {}",
                label
            )));
        }
        debug!(source = %label, "Opened capture source");
        Ok(Self { cap, label })
    }
}

impl VideoSource for CaptureSource {
    fn read(&mut self) -> MediaResult<ReadOutcome> {
        let mut frame = Mat::default();
        let ok = self
            .cap
            .read(&mut frame)
            .map_err(|e| MediaError::read_failed(format!("{}: {}", self.label, e)))?;
        if !ok || frame.empty() {
            return Ok(ReadOutcome::EndOfStream);
        }

        let mut rgb_frame = Mat::default();
        opencv::imgproc::cvt_color_def(&frame, &mut rgb_frame, opencv::imgproc::COLOR_BGR2RGB)
            .map_err(|e| MediaError::read_failed(format!("Color conversion failed: {}", e)))?;

        let width = rgb_frame.cols() as u32;
        let height = rgb_frame.rows() as u32;
        let data = rgb_frame
            .data_bytes()
            .map_err(|e| MediaError::read_failed(format!("Failed to get frame data: {}", e)))?;

        Frame::from_raw(width, height, data.to_vec())
            .map(ReadOutcome::Frame)
            .ok_or_else(|| MediaError::read_failed("Frame buffer size mismatch"))
    }

    fn rewind(&mut self) -> MediaResult<()> {
        self.cap
            .set(CAP_PROP_POS_FRAMES, 0.0)
            .map_err(|e| MediaError::read_failed(format!("{}: seek failed: {}", self.label, e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Size, CV_8UC3};
    use opencv::videoio::VideoWriter;

    /// Write a short MJPEG clip whose frames get brighter one by one.
    fn write_clip(path: &Path, frames: i32) {
        let fourcc = VideoWriter::fourcc('M', 'J', 'P', 'G').unwrap();
        let mut writer =
            VideoWriter::new(path.to_str().unwrap(), fourcc, 10.0, Size::new(64, 48), true)
                .unwrap();
        assert!(writer.is_opened().unwrap());
        for i in 0..frames {
            let frame =
                Mat::new_rows_cols_with_default(48, 64, CV_8UC3, Scalar::all(f64::from(i * 80)))
                    .unwrap();
            writer.write(&frame).unwrap();
        }
        writer.release().unwrap();
    }

    fn first_pixel(source: &mut CaptureSource) -> Option<u8> {
        match source.read().unwrap() {
            ReadOutcome::Frame(frame) => {
                assert_eq!(frame.dimensions(), (64, 48));
                Some(frame.get_pixel(32, 24)[0])
            }
            ReadOutcome::EndOfStream => None,
        }
    }

    #[test]
    fn test_file_reaches_end_and_rewinds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.avi");
        write_clip(&path, 3);

        let mut source = CaptureSource::open_file(&path).unwrap();
        let first = first_pixel(&mut source).unwrap();
        let mut frames = 1;
        while first_pixel(&mut source).is_some() {
            frames += 1;
            assert!(frames <= 3, "read past the end of the clip");
        }

        source.rewind().unwrap();
        let replayed = first_pixel(&mut source).unwrap();
        assert!(first.abs_diff(replayed) < 20, "{} vs {}", first, replayed);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = CaptureSource::open_file(Path::new("/nonexistent/clip.avi"))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }
}
