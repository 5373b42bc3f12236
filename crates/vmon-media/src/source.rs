//! Video sources.
//!
//! A [`VideoSource`] yields frames until it reports
//! [`ReadOutcome::EndOfStream`]; the caller decides whether to
//! [`rewind`](VideoSource::rewind) and keep going. Sources are opened through
//! a [`SourceOpener`] so pipelines can be driven by real capture devices in
//! production and by scripted frames in tests.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Concrete location of a video source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLocator {
    /// Video file, or a directory of still images played in name order.
    File(PathBuf),
    /// Local capture device index.
    Camera(i32),
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::File(path) => write!(f, "{}", path.display()),
            SourceLocator::Camera(index) => write!(f, "camera:{}", index),
        }
    }
}

/// Result of a single read.
#[derive(Debug)]
pub enum ReadOutcome {
    Frame(Frame),
    EndOfStream,
}

/// An opened media handle.
pub trait VideoSource: Send {
    /// Read the next frame.
    fn read(&mut self) -> MediaResult<ReadOutcome>;

    /// Reposition to the first frame.
    fn rewind(&mut self) -> MediaResult<()>;
}

/// Opens [`VideoSource`]s from locators.
pub trait SourceOpener: Send + Sync {
    /// Fails with [`MediaError::SourceUnavailable`] when the device or file
    /// cannot be opened.
    fn open(&self, locator: &SourceLocator) -> MediaResult<Box<dyn VideoSource>>;
}

/// Production opener.
///
/// Directories are played as image sequences. Video files and cameras go
/// through OpenCV when the `opencv` feature is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSourceOpener;

impl SourceOpener for DefaultSourceOpener {
    fn open(&self, locator: &SourceLocator) -> MediaResult<Box<dyn VideoSource>> {
        match locator {
            SourceLocator::File(path) if path.is_dir() => {
                Ok(Box::new(ImageSequenceSource::open(path)?))
            }
            SourceLocator::File(path) => {
                if !path.exists() {
                    return Err(MediaError::source_unavailable(format!(
                        "{} does not exist",
                        path.display()
                    )));
                }
                open_video_file(path)
            }
            SourceLocator::Camera(index) => open_camera(*index),
        }
    }
}

#[cfg(feature = "opencv")]
fn open_video_file(path: &Path) -> MediaResult<Box<dyn VideoSource>> {
    Ok(Box::new(crate::capture::CaptureSource::open_file(path)?))
}

#[cfg(not(feature = "opencv"))]
fn open_video_file(path: &Path) -> MediaResult<Box<dyn VideoSource>> {
    Err(MediaError::source_unavailable(format!(
        "cannot decode {}: built without the `opencv` feature",
        path.display()
    )))
}

#[cfg(feature = "opencv")]
fn open_camera(index: i32) -> MediaResult<Box<dyn VideoSource>> {
    Ok(Box::new(crate::capture::CaptureSource::open_camera(index)?))
}

#[cfg(not(feature = "opencv"))]
fn open_camera(index: i32) -> MediaResult<Box<dyn VideoSource>> {
    Err(MediaError::source_unavailable(format!(
        "cannot open camera {}: built without the `opencv` feature",
        index
    )))
}

/// Still images in a directory, decoded one per read in file-name order.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceSource {
    const EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png", "bmp"];

    /// Scan `dir` for images. An empty directory is unavailable.
    pub fn open(dir: &Path) -> MediaResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            MediaError::source_unavailable(format!("{}: {}", dir.display(), e))
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| Self::EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        if paths.is_empty() {
            return Err(MediaError::source_unavailable(format!(
                "{} contains no images",
                dir.display()
            )));
        }

        debug!(dir = %dir.display(), frames = paths.len(), "Opened image sequence");
        Ok(Self { paths, position: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl VideoSource for ImageSequenceSource {
    fn read(&mut self) -> MediaResult<ReadOutcome> {
        let Some(path) = self.paths.get(self.position) else {
            return Ok(ReadOutcome::EndOfStream);
        };
        self.position += 1;
        let frame = image::open(path)
            .map_err(|e| MediaError::read_failed(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        Ok(ReadOutcome::Frame(frame))
    }

    fn rewind(&mut self) -> MediaResult<()> {
        self.position = 0;
        Ok(())
    }
}

/// Frames held in memory. Cheap to clone; every clone reads independently.
#[derive(Clone)]
pub struct MemorySource {
    frames: Arc<[Frame]>,
    position: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self {
            frames: frames.into(),
            position: 0,
        }
    }
}

impl VideoSource for MemorySource {
    fn read(&mut self) -> MediaResult<ReadOutcome> {
        match self.frames.get(self.position) {
            Some(frame) => {
                self.position += 1;
                Ok(ReadOutcome::Frame(frame.clone()))
            }
            None => Ok(ReadOutcome::EndOfStream),
        }
    }

    fn rewind(&mut self) -> MediaResult<()> {
        self.position = 0;
        Ok(())
    }
}

/// Opener serving registered in-memory sources; unknown locators are unavailable.
#[derive(Clone, Default)]
pub struct MemorySourceOpener {
    sources: HashMap<SourceLocator, MemorySource>,
}

impl MemorySourceOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `frames` under `locator`.
    pub fn with_source(mut self, locator: SourceLocator, frames: Vec<Frame>) -> Self {
        self.sources.insert(locator, MemorySource::new(frames));
        self
    }
}

impl SourceOpener for MemorySourceOpener {
    fn open(&self, locator: &SourceLocator) -> MediaResult<Box<dyn VideoSource>> {
        self.sources
            .get(locator)
            .map(|source| Box::new(source.clone()) as Box<dyn VideoSource>)
            .ok_or_else(|| MediaError::source_unavailable(locator.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(value: u8) -> Frame {
        Frame::from_pixel(4, 2, Rgb([value, value, value]))
    }

    fn next_value(source: &mut dyn VideoSource) -> Option<u8> {
        match source.read().unwrap() {
            ReadOutcome::Frame(frame) => Some(frame.get_pixel(0, 0)[0]),
            ReadOutcome::EndOfStream => None,
        }
    }

    #[test]
    fn test_memory_source_end_and_rewind() {
        let mut source = MemorySource::new(vec![solid(1), solid(2)]);
        assert_eq!(next_value(&mut source), Some(1));
        assert_eq!(next_value(&mut source), Some(2));
        assert_eq!(next_value(&mut source), None);
        assert_eq!(next_value(&mut source), None);

        source.rewind().unwrap();
        assert_eq!(next_value(&mut source), Some(1));
    }

    #[test]
    fn test_memory_opener_unknown_locator() {
        let opener = MemorySourceOpener::new()
            .with_source(SourceLocator::Camera(0), vec![solid(9)]);

        let mut source = opener.open(&SourceLocator::Camera(0)).unwrap();
        assert_eq!(next_value(source.as_mut()), Some(9));

        let err = opener
            .open(&SourceLocator::File("missing.mp4".into()))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }

    #[test]
    fn test_memory_opener_sources_are_independent() {
        let opener = MemorySourceOpener::new()
            .with_source(SourceLocator::Camera(0), vec![solid(1), solid(2)]);
        let mut a = opener.open(&SourceLocator::Camera(0)).unwrap();
        let mut b = opener.open(&SourceLocator::Camera(0)).unwrap();
        assert_eq!(next_value(a.as_mut()), Some(1));
        assert_eq!(next_value(a.as_mut()), Some(2));
        assert_eq!(next_value(b.as_mut()), Some(1));
    }

    #[test]
    fn test_default_opener_missing_file() {
        let err = DefaultSourceOpener
            .open(&SourceLocator::File("/definitely/not/here.mp4".into()))
            .err()
            .unwrap();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }

    #[test]
    fn test_image_sequence_plays_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        solid(30).save(dir.path().join("frame_002.png")).unwrap();
        solid(10).save(dir.path().join("frame_000.png")).unwrap();
        solid(20).save(dir.path().join("frame_001.png")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let mut source = DefaultSourceOpener
            .open(&SourceLocator::File(dir.path().to_path_buf()))
            .unwrap();
        assert_eq!(next_value(source.as_mut()), Some(10));
        assert_eq!(next_value(source.as_mut()), Some(20));
        assert_eq!(next_value(source.as_mut()), Some(30));
        assert_eq!(next_value(source.as_mut()), None);
        source.rewind().unwrap();
        assert_eq!(next_value(source.as_mut()), Some(10));
    }

    #[test]
    fn test_empty_image_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ImageSequenceSource::open(dir.path()).err().unwrap();
        assert!(matches!(err, MediaError::SourceUnavailable(_)));
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(SourceLocator::Camera(0).to_string(), "camera:0");
        assert_eq!(
            SourceLocator::File("traffic_video.mp4".into()).to_string(),
            "traffic_video.mp4"
        );
    }
}
