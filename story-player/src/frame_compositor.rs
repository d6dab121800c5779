//! Preview frame compositor
//!
//! Renders a story item as a flat preview: the background, every overlay's
//! box in z-order and a segmented progress indicator along the top edge.
//! Image and video media are never decoded here; they render as a neutral
//! placeholder.

use crate::{Error, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::path::Path;
use story_core::{Color, MediaSource, Rect, StoryItem};

const IMAGE_PLACEHOLDER: Rgba<u8> = Rgba([48, 48, 48, 255]);
const VIDEO_PLACEHOLDER: Rgba<u8> = Rgba([24, 24, 36, 255]);

/// Alpha used for overlays drawn without a background box
const TEXT_FILL_ALPHA: u8 = 96;

const BAR_MARGIN: u32 = 8;
const BAR_GAP: u32 = 4;
const BAR_HEIGHT: u32 = 3;
const BAR_TRACK: Rgba<u8> = Rgba([255, 255, 255, 90]);
const BAR_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Renders preview frames at a fixed size
pub struct FrameCompositor {
    width: u32,
    height: u32,
}

impl FrameCompositor {
    /// Creates a compositor; overlay coordinates are taken as pixels of
    /// a `width` x `height` canvas
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidFrameSize(width, height));
        }
        Ok(Self { width, height })
    }

    /// Renders `item` with the given per-item progress segments
    pub fn render(&self, item: &StoryItem, segments: &[f64]) -> RgbaImage {
        let mut frame = self.background(item.content());

        for overlay in item.overlays() {
            let style = overlay.style();
            let fill = match style.background {
                Some(background) => background,
                None => Color::rgba(style.color.r, style.color.g, style.color.b, TEXT_FILL_ALPHA),
            };
            fill_rect(&mut frame, overlay.bounds(), Rgba(fill.to_array()));
        }

        self.draw_progress(&mut frame, segments);
        frame
    }

    /// Renders `item` and writes it as PNG to `path`
    pub fn render_to_file(&self, item: &StoryItem, segments: &[f64], path: &Path) -> Result<()> {
        self.render(item, segments).save(path)?;
        Ok(())
    }

    fn background(&self, media: &MediaSource) -> RgbaImage {
        match media {
            MediaSource::Gradient { from, to } => {
                let span = (self.height.saturating_sub(1)).max(1) as f32;
                ImageBuffer::from_fn(self.width, self.height, |_, y| {
                    let t = y as f32 / span;
                    Rgba([
                        lerp(from.r, to.r, t),
                        lerp(from.g, to.g, t),
                        lerp(from.b, to.b, t),
                        255,
                    ])
                })
            }
            MediaSource::Image { .. } => {
                ImageBuffer::from_pixel(self.width, self.height, IMAGE_PLACEHOLDER)
            }
            MediaSource::Video { .. } => {
                ImageBuffer::from_pixel(self.width, self.height, VIDEO_PLACEHOLDER)
            }
        }
    }

    fn draw_progress(&self, frame: &mut RgbaImage, segments: &[f64]) {
        let count = segments.len() as u32;
        if count == 0 {
            return;
        }
        let usable = self
            .width
            .saturating_sub(2 * BAR_MARGIN + (count - 1) * BAR_GAP);
        let segment_width = usable / count;
        if segment_width == 0 {
            return;
        }

        for (i, fraction) in segments.iter().enumerate() {
            let x = BAR_MARGIN + i as u32 * (segment_width + BAR_GAP);
            let track = Rect::new(
                x as f32,
                BAR_MARGIN as f32,
                segment_width as f32,
                BAR_HEIGHT as f32,
            );
            fill_rect(frame, track, BAR_TRACK);

            let filled = (segment_width as f64 * fraction.clamp(0.0, 1.0)).round() as f32;
            if filled > 0.0 {
                fill_rect(frame, Rect { width: filled, ..track }, BAR_FILL);
            }
        }
    }
}

fn lerp(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 + (b as f32 - a as f32) * t).round() as u8
}

/// Alpha-blends `color` over every pixel of `rect` that lies on the frame
fn fill_rect(base: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    let x_start = rect.x.floor().max(0.0) as u32;
    let y_start = rect.y.floor().max(0.0) as u32;
    let x_end = ((rect.x + rect.width).ceil().max(0.0) as u32).min(base.width());
    let y_end = ((rect.y + rect.height).ceil().max(0.0) as u32).min(base.height());

    if x_start >= x_end || y_start >= y_end {
        return; // Nothing on screen
    }

    let alpha = color[3] as f32 / 255.0;
    let inv_alpha = 1.0 - alpha;

    for y in y_start..y_end {
        for x in x_start..x_end {
            let base_pixel = base.get_pixel(x, y);
            let blended = Rgba([
                (color[0] as f32 * alpha + base_pixel[0] as f32 * inv_alpha) as u8,
                (color[1] as f32 * alpha + base_pixel[1] as f32 * inv_alpha) as u8,
                (color[2] as f32 * alpha + base_pixel[2] as f32 * inv_alpha) as u8,
                255,
            ]);
            base.put_pixel(x, y, blended);
        }
    }
}
