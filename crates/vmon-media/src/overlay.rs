//! Annotation drawn onto outgoing frames.
//!
//! Shapes are always drawn. Text needs a TrueType font; without one,
//! captions are skipped and only the shapes remain.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::Rgb;
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;
use vmon_models::BBox;

use crate::error::{MediaError, MediaResult};
use crate::Frame;

/// Caption shown on the stream before the first processed frame.
pub const PLACEHOLDER_CAPTION: &str = "Waiting for video source...";

pub const MARKER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const DIVIDER_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const BANNER_COLOR: Rgb<u8> = Rgb([200, 0, 0]);
pub const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

const MARKER_THICKNESS: i32 = 2;
const BANNER_HEIGHT: u32 = 48;
const TEXT_SCALE: f32 = 28.0;

/// Drawing helpers with an optional caption font.
#[derive(Clone, Default)]
pub struct Overlay {
    font: Option<FontArc>,
}

impl Overlay {
    /// Overlay without text rendering.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay rendering captions with the TrueType/OpenType font at `path`.
    pub fn with_font_file(path: &Path) -> MediaResult<Self> {
        let bytes = std::fs::read(path)?;
        let font =
            FontArc::try_from_vec(bytes).map_err(|_| MediaError::FontLoad(path.to_path_buf()))?;
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Outline a detected vehicle.
    pub fn mark_vehicle(&self, frame: &mut Frame, bbox: &BBox) {
        for inset in 0..MARKER_THICKNESS {
            let w = bbox.width() - 2 * inset;
            let h = bbox.height() - 2 * inset;
            if w <= 0 || h <= 0 {
                break;
            }
            let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame, rect, MARKER_COLOR);
        }
    }

    /// Vertical line at `x` spanning the full frame height.
    pub fn lane_divider(&self, frame: &mut Frame, x: u32) {
        let height = frame.height() as f32;
        draw_line_segment_mut(frame, (x as f32, 0.0), (x as f32, height), DIVIDER_COLOR);
    }

    /// Draw `text` with its top-left corner at `(x, y)`.
    pub fn caption(&self, frame: &mut Frame, x: i32, y: i32, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(frame, TEXT_COLOR, x, y, PxScale::from(TEXT_SCALE), font, text);
        }
    }

    /// Full-width alert strip along the top edge.
    pub fn banner(&self, frame: &mut Frame, text: &str) {
        let height = BANNER_HEIGHT.min(frame.height());
        if frame.width() == 0 || height == 0 {
            return;
        }
        draw_filled_rect_mut(frame, Rect::at(0, 0).of_size(frame.width(), height), BANNER_COLOR);
        self.caption(frame, 12, 10, text);
    }

    /// Black frame carrying a status caption.
    pub fn placeholder(&self, width: u32, height: u32, text: &str) -> Frame {
        let mut frame = Frame::new(width, height);
        self.caption(&mut frame, 50, (height / 2) as i32, text);
        frame
    }
}
