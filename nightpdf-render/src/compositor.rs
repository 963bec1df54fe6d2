//! Builds display surfaces from pristine page bitmaps.
//!
//! Every surface is a pure function of the page bitmap, the zoom factor and the
//! search state; stored bitmaps are never touched.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use nightpdf_core::{DocumentSession, HighlightRect, PageBitmap, SearchState, Viewer};
use rayon::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightStyle {
    pub rgb: [u8; 3],
    pub opacity: f32,
}

pub const MATCH_HIGHLIGHT: HighlightStyle = HighlightStyle {
    rgb: [255, 235, 59],
    opacity: 0.35,
};

pub const CURRENT_MATCH_HIGHLIGHT: HighlightStyle = HighlightStyle {
    rgb: [255, 140, 0],
    opacity: 0.6,
};

const FRAME_BACKGROUND: Rgba<u8> = Rgba([18, 18, 18, 255]);
const RAIL_BACKGROUND: Rgba<u8> = Rgba([30, 30, 30, 255]);
const RAIL_ACTIVE: Rgba<u8> = Rgba([90, 160, 255, 255]);
const RAIL_PADDING: u32 = 8;

fn scaled_size(bitmap: &PageBitmap, zoom: f32) -> (u32, u32) {
    let scale = |value: u32| ((value as f32 * zoom).round() as u32).max(1);
    (scale(bitmap.width), scale(bitmap.height))
}

/// One page's display surface at `zoom` with its search highlights.
pub fn composite_page(
    page_index: usize,
    bitmap: &PageBitmap,
    zoom: f32,
    search: &SearchState,
) -> RgbaImage {
    let Some(view) = crate::bitmap_view(bitmap) else {
        return RgbaImage::new(0, 0);
    };
    if bitmap.is_empty() {
        return RgbaImage::new(bitmap.width, bitmap.height);
    }
    let (width, height) = scaled_size(bitmap, zoom);
    let mut surface = if (width, height) == (bitmap.width, bitmap.height) {
        RgbaImage::from_fn(width, height, |x, y| *view.get_pixel(x, y))
    } else {
        imageops::resize(&view, width, height, FilterType::Triangle)
    };

    for (found, is_current) in search.matches_on_page(page_index) {
        let style = if is_current {
            CURRENT_MATCH_HIGHLIGHT
        } else {
            MATCH_HIGHLIGHT
        };
        fill_rect(&mut surface, found.highlight_rect(zoom), style);
    }
    surface
}

/// Surfaces for the whole document. Pages are independent, so they are built in parallel.
pub fn composite_surfaces(
    session: &DocumentSession,
    zoom: f32,
    search: &SearchState,
) -> Vec<RgbaImage> {
    session
        .pages()
        .par_iter()
        .enumerate()
        .map(|(page_index, page)| composite_page(page_index, &page.bitmap, zoom, search))
        .collect()
}

fn fill_rect(surface: &mut RgbaImage, rect: HighlightRect, style: HighlightStyle) {
    let x0 = rect.x.floor().max(0.0) as u32;
    let y0 = rect.y.floor().max(0.0) as u32;
    let x1 = ((rect.x + rect.width).ceil().max(0.0) as u32).min(surface.width());
    let y1 = ((rect.y + rect.height).ceil().max(0.0) as u32).min(surface.height());
    let alpha = style.opacity.clamp(0.0, 1.0);

    for y in y0..y1 {
        for x in x0..x1 {
            let pixel = surface.get_pixel_mut(x, y);
            for channel in 0..3 {
                let base = pixel[channel] as f32;
                let blended = base + (style.rgb[channel] as f32 - base) * alpha;
                pixel[channel] = blended.round() as u8;
            }
        }
    }
}

/// Holds the current display surfaces and rebuilds them on request.
#[derive(Debug, Default)]
pub struct ViewportRenderer {
    surfaces: Vec<RgbaImage>,
}

impl ViewportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh(&mut self, session: &DocumentSession, zoom: f32, search: &SearchState) {
        self.surfaces = composite_surfaces(session, zoom, search);
        debug!(zoom, surfaces = self.surfaces.len(), "recomposited");
    }

    pub fn surfaces(&self) -> &[RgbaImage] {
        &self.surfaces
    }
}

/// Stitches the on-screen frame: the thumbnail rail on the left, then the page
/// surfaces at the viewer's scroll offsets.
pub fn compose_frame(
    viewer: &Viewer,
    surfaces: &[RgbaImage],
    thumbnails: &[RgbaImage],
    rail_width: u32,
) -> RgbaImage {
    let viewport = viewer.viewport();
    let page_width = viewport.width.max(0.0) as u32;
    let height = viewport.height.max(1.0) as u32;
    let mut frame = RgbaImage::from_pixel(rail_width + page_width, height, FRAME_BACKGROUND);

    if rail_width > 0 {
        draw_rail(&mut frame, viewer, thumbnails, rail_width);
    }

    let zoom = viewer.state().zoom;
    let (scroll_x, scroll_y) = viewer.display_scroll();
    for (index, surface) in surfaces.iter().enumerate() {
        let Some(top) = viewer.layout().page_top(index, zoom) else {
            break;
        };
        let y = top - scroll_y;
        if y >= height as f32 {
            break;
        }
        if y + (surface.height() as f32) < 0.0 {
            continue;
        }
        let x = rail_width as f32 - scroll_x;
        overlay_clipped(&mut frame, surface, x as i64, y as i64, rail_width);
    }
    frame
}

// Like `imageops::overlay`, but never paints left of `min_x`.
fn overlay_clipped(frame: &mut RgbaImage, surface: &RgbaImage, x: i64, y: i64, min_x: u32) {
    let skip = (min_x as i64 - x).max(0) as u32;
    if skip >= surface.width() {
        return;
    }
    if skip == 0 {
        imageops::overlay(frame, surface, x, y);
        return;
    }
    let visible = imageops::crop_imm(surface, skip, 0, surface.width() - skip, surface.height());
    imageops::overlay(frame, &visible.to_image(), min_x as i64, y);
}

fn draw_rail(frame: &mut RgbaImage, viewer: &Viewer, thumbnails: &[RgbaImage], rail_width: u32) {
    for y in 0..frame.height() {
        for x in 0..rail_width.min(frame.width()) {
            frame.put_pixel(x, y, RAIL_BACKGROUND);
        }
    }

    let rail = viewer.rail();
    let mut y = RAIL_PADDING as i64;
    for index in rail.visible_range() {
        let Some(thumb) = thumbnails.get(index) else {
            break;
        };
        if y >= frame.height() as i64 {
            break;
        }
        let x = (rail_width.saturating_sub(thumb.width()) / 2) as i64;
        if index == rail.active() {
            outline(frame, x - 2, y - 2, thumb.width() + 4, thumb.height() + 4);
        }
        imageops::overlay(frame, thumb, x, y);
        y += thumb.height() as i64 + RAIL_PADDING as i64;
    }
}

/// Rail width that fits thumbnails of `thumbnail_width` with padding on both sides.
pub fn rail_width(thumbnail_width: u32) -> u32 {
    thumbnail_width + 2 * RAIL_PADDING
}

/// Thumbnails that fit into a rail `height` pixels tall, at least one. Slots are
/// sized for the tallest thumbnail so any run of that many fits on screen.
pub fn rail_slots(thumbnails: &[RgbaImage], height: u32) -> usize {
    let Some(tallest) = thumbnails.iter().map(RgbaImage::height).max() else {
        return 1;
    };
    let slot = tallest + RAIL_PADDING;
    (height.saturating_sub(RAIL_PADDING) / slot.max(1)).max(1) as usize
}

/// 0-based page whose thumbnail covers rail offset `y`, laid out like the frame.
pub fn rail_hit(viewer: &Viewer, thumbnails: &[RgbaImage], y: f32) -> Option<usize> {
    let mut top = RAIL_PADDING as f32;
    for index in viewer.rail().visible_range() {
        let thumb = thumbnails.get(index)?;
        let bottom = top + thumb.height() as f32;
        if y >= top && y < bottom {
            return Some(index);
        }
        top = bottom + RAIL_PADDING as f32;
    }
    None
}

fn outline(frame: &mut RgbaImage, x: i64, y: i64, width: u32, height: u32) {
    let mut plot = |px: i64, py: i64| {
        if px >= 0 && py >= 0 && (px as u32) < frame.width() && (py as u32) < frame.height() {
            frame.put_pixel(px as u32, py as u32, RAIL_ACTIVE);
        }
    };
    for dx in 0..width as i64 {
        plot(x + dx, y);
        plot(x + dx, y + height as i64 - 1);
    }
    for dy in 0..height as i64 {
        plot(x, y + dy);
        plot(x + width as i64 - 1, y + dy);
    }
}
