//! Half-block raster widget.
//!
//! Each terminal cell shows two vertically stacked pixels: the upper one as
//! the foreground of `▀`, the lower one as the background. The image is
//! scaled to fit the area with its aspect ratio kept and centred; it is never
//! enlarged, so small screenshots stay pixel-exact.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Color;
use ratatui::widgets::Widget;

const UPPER_HALF: &str = "▀";

pub struct Raster<'a> {
    image: &'a RgbaImage,
}

impl<'a> Raster<'a> {
    pub fn new(image: &'a RgbaImage) -> Self {
        Self { image }
    }
}

impl Widget for Raster<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.is_empty() || self.image.width() == 0 || self.image.height() == 0 {
            return;
        }
        let (w, h) = fit_within(
            self.image.width(),
            self.image.height(),
            u32::from(area.width),
            u32::from(area.height) * 2,
        );
        let scaled;
        let image = if (w, h) == self.image.dimensions() {
            self.image
        } else {
            scaled = imageops::resize(self.image, w, h, FilterType::Triangle);
            &scaled
        };

        let cols = image.width() as u16;
        let rows = image.height().div_ceil(2) as u16;
        let x0 = area.x + (area.width.saturating_sub(cols)) / 2;
        let y0 = area.y + (area.height.saturating_sub(rows)) / 2;

        for row in 0..rows {
            for col in 0..cols {
                let upper = image.get_pixel(u32::from(col), u32::from(row) * 2);
                let lower_y = u32::from(row) * 2 + 1;
                let lower = (lower_y < image.height()).then(|| image.get_pixel(u32::from(col), lower_y));
                if let Some(cell) = buf.cell_mut((x0 + col, y0 + row)) {
                    cell.set_symbol(UPPER_HALF).set_fg(to_color(upper));
                    if let Some(lower) = lower {
                        cell.set_bg(to_color(lower));
                    }
                }
            }
        }
    }
}

/// Largest size with the same aspect ratio that fits `max_w × max_h`,
/// never larger than the source and never zero.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (max_w.max(1), max_h.max(1));
    }
    let scale = (max_w as f32 / width as f32)
        .min(max_h as f32 / height as f32)
        .min(1.0);
    let new_w = (width as f32 * scale).round().max(1.0) as u32;
    let new_h = (height as f32 * scale).round().max(1.0) as u32;
    (new_w.min(max_w.max(1)), new_h.min(max_h.max(1)))
}

/// Composites a pixel over white, the same backdrop the diff assumes.
fn to_color(px: &Rgba<u8>) -> Color {
    let [r, g, b, a] = px.0;
    let over_white = |c: u8| -> u8 {
        let alpha = u16::from(a);
        ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8
    };
    Color::Rgb(over_white(r), over_white(g), over_white(b))
}
