//! Layered drawing of the widget onto a device-scaled raster surface.

pub mod scale;
pub mod surface;
mod text;

use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::cache::ThumbnailCache;
use crate::config::LayoutConstants;
use crate::error::Result;
use crate::frame::VideoFrame;
use crate::geometry::{TimeGeometry, TimeRange, TimelineLayout};
use crate::theme::{Color, Theme};

pub use surface::{CornerRadii, RasterSurface, Rect, TextAlign};

const MASK: Color = Color::rgba(0, 0, 0, 128);
const SHADOW: Color = Color::rgb(0, 0, 0);
/// (spread, opacity) of the cursor shadow layers, outermost first.
const SHADOW_LAYERS: [(f32, f32); 3] = [(3.0, 0.10), (2.0, 0.16), (1.0, 0.24)];
const STRIPE_WIDTH: f32 = 2.0;
const STRIPE_HEIGHT_RATIO: f32 = 0.4;
const LABEL_PADDING: f32 = 2.0;

/// Everything one draw call needs; the renderer keeps no business state.
#[derive(Debug, Clone, Copy)]
pub struct RenderFrameState<'a> {
    pub frames: &'a [VideoFrame],
    pub duration: f64,
    pub current_time: f64,
    pub selected_range: TimeRange,
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f32,
    pub frame_height: u32,
    pub show_scale: bool,
    pub layout: &'a LayoutConstants,
    pub theme: &'a Theme,
}

/// Owns the backing surface and the thumbnail cache.
#[derive(Debug)]
pub struct TimelineRenderer {
    surface: Option<RasterSurface>,
    cache: ThumbnailCache,
    surface_builds: u64,
}

impl TimelineRenderer {
    /// Creates the renderer and its surface; fails if the surface cannot exist.
    pub fn new(width: u32, height: u32, pixel_ratio: f32, cache_capacity: Option<usize>) -> Result<Self> {
        let surface = RasterSurface::new(width, height, pixel_ratio)?;
        Ok(Self {
            surface: Some(surface),
            cache: ThumbnailCache::new(cache_capacity),
            surface_builds: 1,
        })
    }

    pub fn surface(&self) -> Option<&RasterSurface> {
        self.surface.as_ref()
    }

    pub fn cache(&self) -> &ThumbnailCache {
        &self.cache
    }

    /// How many times a backing surface was allocated.
    pub fn surface_builds(&self) -> u64 {
        self.surface_builds
    }

    /// Forgets every cached thumbnail.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Releases the cache and the surface.
    pub fn dispose(&mut self) {
        self.cache.clear();
        self.surface = None;
        debug!("timeline renderer disposed");
    }

    /// Redraws the whole widget from `state`.
    pub fn render(&mut self, state: &RenderFrameState<'_>) -> Result<()> {
        self.ensure_surface(state.width, state.height, state.pixel_ratio)?;
        let tiles = self.cache.resolve(state.frames);
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };

        let layout = TimelineLayout::new(
            state.width,
            state.height,
            state.frame_height,
            state.show_scale,
            state.layout,
        );
        let geometry = layout.geometry(state.duration);
        let painter = Painter {
            layout: &layout,
            geometry: &geometry,
            constants: state.layout,
            theme: state.theme,
        };

        surface.clear();
        if state.show_scale {
            painter.draw_scale(surface, state.duration);
        }
        painter.draw_background(surface);
        painter.draw_tiles(surface, &tiles);
        if state.duration > 0.0 {
            let range = state.selected_range.clamped(state.duration);
            painter.draw_selection(surface, range);
            painter.draw_handles(surface, range);
            painter.draw_cursor(surface, state.current_time);
        }
        Ok(())
    }

    fn ensure_surface(&mut self, width: u32, height: u32, pixel_ratio: f32) -> Result<()> {
        let unchanged = self.surface.as_ref().is_some_and(|surface| {
            surface.logical_size() == (width, height) && surface.pixel_ratio() == pixel_ratio
        });
        if unchanged {
            return Ok(());
        }
        self.surface = Some(RasterSurface::new(width, height, pixel_ratio)?);
        self.surface_builds += 1;
        debug!(width, height, pixel_ratio, "timeline surface reconfigured");
        Ok(())
    }
}

struct Painter<'a> {
    layout: &'a TimelineLayout,
    geometry: &'a TimeGeometry,
    constants: &'a LayoutConstants,
    theme: &'a Theme,
}

impl Painter<'_> {
    fn x_of(&self, seconds: f64) -> f32 {
        self.geometry.time_to_pixel(seconds) as f32
    }

    fn strip(&self) -> Rect {
        Rect::new(
            self.layout.handle_width as f32,
            self.layout.strip_top as f32,
            self.geometry.usable_width() as f32,
            self.layout.strip_height as f32,
        )
    }

    fn draw_scale(&self, surface: &mut RasterSurface, duration: f64) {
        let scale_bottom = self.layout.scale_height as f32;
        let tick_top = scale_bottom - self.constants.tick_length;
        let label_top = (tick_top - self.constants.label_size - LABEL_PADDING).max(0.0);

        for tick in scale::scale_ticks(duration) {
            let x = self.x_of(tick.time);
            surface.fill_rect(
                Rect::new(x - 0.5, tick_top, 1.0, self.constants.tick_length),
                self.theme.scale_line,
            );
            let Some(label) = tick.label else {
                continue;
            };
            let (anchor, align) = if tick.is_end || tick.time >= duration {
                (x - LABEL_PADDING, TextAlign::Right)
            } else if tick.time <= 0.0 {
                (x, TextAlign::Left)
            } else {
                (x, TextAlign::Center)
            };
            surface.fill_text(
                &label,
                anchor,
                label_top,
                self.constants.label_size,
                align,
                self.theme.scale_text,
            );
        }
    }

    fn draw_background(&self, surface: &mut RasterSurface) {
        if self.theme.background.is_none() {
            return;
        }
        surface.fill_rect(self.strip(), self.theme.background);
    }

    fn draw_tiles(&self, surface: &mut RasterSurface, tiles: &[Option<Arc<RgbaImage>>]) {
        if tiles.is_empty() {
            return;
        }
        let strip = self.strip();
        let tile_width = strip.width / tiles.len() as f32;
        for (index, tile) in tiles.iter().enumerate() {
            let Some(image) = tile else {
                continue;
            };
            let rect = Rect::new(
                strip.x + index as f32 * tile_width,
                strip.y,
                tile_width,
                strip.height,
            );
            surface.draw_image_cover(image, rect);
        }
    }

    fn draw_selection(&self, surface: &mut RasterSurface, range: TimeRange) {
        let strip = self.strip();
        let start_x = self.x_of(range.start);
        let end_x = self.x_of(range.end);

        surface.fill_rect(
            Rect::new(strip.x, strip.y, start_x - strip.x, strip.height),
            MASK,
        );
        surface.fill_rect(
            Rect::new(end_x, strip.y, strip.right() - end_x, strip.height),
            MASK,
        );
        surface.stroke_rect(
            Rect::new(start_x, strip.y, end_x - start_x, strip.height),
            self.constants.border_width,
            self.theme.selection_border,
        );
    }

    fn draw_handles(&self, surface: &mut RasterSurface, range: TimeRange) {
        let strip = self.strip();
        let handle_width = self.layout.handle_width as f32;
        let radius = self.constants.handle_radius;
        let start = Rect::new(
            self.x_of(range.start) - handle_width,
            strip.y,
            handle_width,
            strip.height,
        );
        let end = Rect::new(self.x_of(range.end), strip.y, handle_width, strip.height);

        for (rect, radii) in [(start, CornerRadii::left(radius)), (end, CornerRadii::right(radius))] {
            surface.fill_rounded_rect(rect, radii, self.theme.handle_fill);
            let stripe_height = rect.height * STRIPE_HEIGHT_RATIO;
            let stripe = Rect::new(
                rect.x + (rect.width - STRIPE_WIDTH) / 2.0,
                rect.y + (rect.height - stripe_height) / 2.0,
                STRIPE_WIDTH,
                stripe_height,
            );
            surface.fill_rounded_rect(
                stripe,
                CornerRadii::all(STRIPE_WIDTH / 2.0),
                self.theme.handle_stripe,
            );
        }
    }

    fn draw_cursor(&self, surface: &mut RasterSurface, current_time: f64) {
        let width = self.layout.cursor_width as f32;
        let overflow = self.layout.cursor_overflow as f32;
        let strip = self.strip();
        let capsule = Rect::new(
            self.x_of(current_time) - width / 2.0,
            strip.y - overflow,
            width,
            strip.height + 2.0 * overflow,
        );
        let radius = width / 2.0;

        for (spread, opacity) in SHADOW_LAYERS {
            surface.fill_rounded_rect(
                capsule.expand(spread).offset(0.0, 1.0),
                CornerRadii::all(radius + spread),
                SHADOW.with_opacity(opacity),
            );
        }
        surface.fill_rounded_rect(capsule, CornerRadii::all(radius), self.theme.cursor);
    }
}
