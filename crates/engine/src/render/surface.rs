use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::error::{Result, TimelineError};
use crate::render::text;
use crate::theme::Color;

/// Largest backing-store side, in device pixels.
pub const MAX_SURFACE_SIDE: u32 = 16_384;

/// Axis-aligned rectangle in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn expand(&self, by: f32) -> Self {
        Self::new(
            self.x - by,
            self.y - by,
            self.width + 2.0 * by,
            self.height + 2.0 * by,
        )
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CornerRadii {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadii {
    pub fn all(radius: f32) -> Self {
        Self {
            top_left: radius,
            top_right: radius,
            bottom_right: radius,
            bottom_left: radius,
        }
    }

    pub fn left(radius: f32) -> Self {
        Self {
            top_left: radius,
            bottom_left: radius,
            ..Self::default()
        }
    }

    pub fn right(radius: f32) -> Self {
        Self {
            top_right: radius,
            bottom_right: radius,
            ..Self::default()
        }
    }

    fn scaled(self, ratio: f32) -> Self {
        Self {
            top_left: self.top_left * ratio,
            top_right: self.top_right * ratio,
            bottom_right: self.bottom_right * ratio,
            bottom_left: self.bottom_left * ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// RGBA backing store addressed in logical pixels.
///
/// The store is `ceil(logical * pixel_ratio)` device pixels on each side and
/// every primitive scales its logical coordinates by the same ratio.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    logical_width: u32,
    logical_height: u32,
    pixel_ratio: f32,
    pixels: RgbaImage,
}

impl RasterSurface {
    pub fn new(logical_width: u32, logical_height: u32, pixel_ratio: f32) -> Result<Self> {
        let fail = |reason| TimelineError::SurfaceInit {
            width: logical_width,
            height: logical_height,
            pixel_ratio,
            reason,
        };
        if logical_width == 0 || logical_height == 0 {
            return Err(fail("logical size is empty"));
        }
        if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
            return Err(fail("pixel ratio must be positive"));
        }
        let device_width = (logical_width as f32 * pixel_ratio).ceil();
        let device_height = (logical_height as f32 * pixel_ratio).ceil();
        let limit = MAX_SURFACE_SIDE as f32;
        if device_width > limit || device_height > limit {
            return Err(fail("device size exceeds the surface limit"));
        }

        Ok(Self {
            logical_width,
            logical_height,
            pixel_ratio,
            pixels: RgbaImage::new(device_width as u32, device_height as u32),
        })
    }

    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    pub fn device_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Raw device pixels, e.g. for encoding to PNG.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    /// Fills `rect`; partially covered edge pixels are blended proportionally.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let Color::Rgba(rgba) = color else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.device_bounds(rect) else {
            return;
        };

        for py in y0.floor() as u32..y1.ceil() as u32 {
            let cover_y = span_overlap(py, y0, y1);
            for px in x0.floor() as u32..x1.ceil() as u32 {
                let coverage = cover_y * span_overlap(px, x0, x1);
                blend(self.pixels.get_pixel_mut(px, py), rgba, coverage);
            }
        }
    }

    /// Strokes the inside of `rect` with `line_width` logical pixels.
    pub fn stroke_rect(&mut self, rect: Rect, line_width: f32, color: Color) {
        if rect.is_empty() || line_width <= 0.0 {
            return;
        }
        let line = line_width.min(rect.width / 2.0).min(rect.height / 2.0);
        let inner_height = rect.height - 2.0 * line;
        self.fill_rect(Rect::new(rect.x, rect.y, rect.width, line), color);
        self.fill_rect(
            Rect::new(rect.x, rect.bottom() - line, rect.width, line),
            color,
        );
        self.fill_rect(Rect::new(rect.x, rect.y + line, line, inner_height), color);
        self.fill_rect(
            Rect::new(rect.right() - line, rect.y + line, line, inner_height),
            color,
        );
    }

    /// Fills `rect` with rounded corners, anti-aliased by signed distance.
    pub fn fill_rounded_rect(&mut self, rect: Rect, radii: CornerRadii, color: Color) {
        let Color::Rgba(rgba) = color else {
            return;
        };
        let Some((x0, y0, x1, y1)) = self.device_bounds(rect) else {
            return;
        };
        let s = self.pixel_ratio;
        let half_w = rect.width * s / 2.0;
        let half_h = rect.height * s / 2.0;
        let center_x = rect.x * s + half_w;
        let center_y = rect.y * s + half_h;
        let radii = radii.scaled(s);

        for py in y0.floor() as u32..y1.ceil() as u32 {
            for px in x0.floor() as u32..x1.ceil() as u32 {
                let dx = px as f32 + 0.5 - center_x;
                let dy = py as f32 + 0.5 - center_y;
                let radius = match (dx >= 0.0, dy >= 0.0) {
                    (false, false) => radii.top_left,
                    (true, false) => radii.top_right,
                    (true, true) => radii.bottom_right,
                    (false, true) => radii.bottom_left,
                }
                .min(half_w)
                .min(half_h)
                .max(0.0);
                let qx = dx.abs() - half_w + radius;
                let qy = dy.abs() - half_h + radius;
                let outside = qx.max(0.0).hypot(qy.max(0.0));
                let distance = outside + qx.max(qy).min(0.0) - radius;
                let coverage = (0.5 - distance).clamp(0.0, 1.0);
                blend(self.pixels.get_pixel_mut(px, py), rgba, coverage);
            }
        }
    }

    /// Draws `image` scaled to cover `rect`, center-cropping the overflow.
    pub fn draw_image_cover(&mut self, image: &RgbaImage, rect: Rect) {
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 || rect.is_empty() {
            return;
        }
        let s = self.pixel_ratio;
        let dst_x = (rect.x * s).round() as i64;
        let dst_y = (rect.y * s).round() as i64;
        let dst_w = ((rect.right() * s).round() as i64 - dst_x).max(0) as u32;
        let dst_h = ((rect.bottom() * s).round() as i64 - dst_y).max(0) as u32;
        if dst_w == 0 || dst_h == 0 {
            return;
        }

        let target_aspect = dst_w as f32 / dst_h as f32;
        let source_aspect = src_w as f32 / src_h as f32;
        let (crop_w, crop_h) = if source_aspect > target_aspect {
            (((src_h as f32 * target_aspect).round() as u32).clamp(1, src_w), src_h)
        } else {
            (src_w, ((src_w as f32 / target_aspect).round() as u32).clamp(1, src_h))
        };
        let cropped = imageops::crop_imm(
            image,
            (src_w - crop_w) / 2,
            (src_h - crop_h) / 2,
            crop_w,
            crop_h,
        )
        .to_image();
        let scaled = imageops::resize(&cropped, dst_w, dst_h, FilterType::Triangle);

        let (surface_w, surface_h) = self.pixels.dimensions();
        for (sx, sy, pixel) in scaled.enumerate_pixels() {
            let px = dst_x + i64::from(sx);
            let py = dst_y + i64::from(sy);
            if px < 0 || py < 0 || px >= i64::from(surface_w) || py >= i64::from(surface_h) {
                continue;
            }
            blend(self.pixels.get_pixel_mut(px as u32, py as u32), pixel.0, 1.0);
        }
    }

    /// Draws a label with the built-in glyph set; returns its logical width.
    ///
    /// `y` is the top of the glyph box and `size` its height.
    pub fn fill_text(
        &mut self,
        label: &str,
        x: f32,
        y: f32,
        size: f32,
        align: TextAlign,
        color: Color,
    ) -> f32 {
        let width = text::text_width(label, size);
        let left = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - width / 2.0,
            TextAlign::Right => x - width,
        };
        for cell in text::glyph_cells(label, left, y, size) {
            self.fill_rect(cell, color);
        }
        width
    }

    fn device_bounds(&self, rect: Rect) -> Option<(f32, f32, f32, f32)> {
        if rect.is_empty() {
            return None;
        }
        let s = self.pixel_ratio;
        let (w, h) = self.pixels.dimensions();
        let x0 = (rect.x * s).max(0.0);
        let y0 = (rect.y * s).max(0.0);
        let x1 = (rect.right() * s).min(w as f32);
        let y1 = (rect.bottom() * s).min(h as f32);
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

fn span_overlap(pixel: u32, start: f32, end: f32) -> f32 {
    let lo = (pixel as f32).max(start);
    let hi = (pixel as f32 + 1.0).min(end);
    (hi - lo).clamp(0.0, 1.0)
}

/// Source-over blend of straight-alpha `src` scaled by `coverage`.
fn blend(dst: &mut Rgba<u8>, src: [u8; 4], coverage: f32) {
    let src_a = f32::from(src[3]) / 255.0 * coverage;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for channel in 0..3 {
        let value = (f32::from(src[channel]) * src_a
            + f32::from(dst[channel]) * dst_a * (1.0 - src_a))
            / out_a;
        dst[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}
