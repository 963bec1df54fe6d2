use image::imageops::{self, FilterType};
use image::RgbaImage;
use nightpdf_core::{DocumentSession, PageBitmap};
use rayon::prelude::*;
use tracing::debug;

pub const THUMBNAIL_WIDTH: u32 = 150;

/// Fixed width, aspect-preserving height: `round(height * width / original_width)`.
pub fn thumbnail_dimensions(width: u32, height: u32, target_width: u32) -> (u32, u32) {
    if width == 0 {
        return (target_width, 0);
    }
    let scaled = (height as f64 * target_width as f64 / width as f64).round();
    (target_width, scaled as u32)
}

pub fn generate_thumbnail(bitmap: &PageBitmap, target_width: u32) -> RgbaImage {
    let (width, height) = thumbnail_dimensions(bitmap.width, bitmap.height, target_width);
    if width == 0 || height == 0 {
        return RgbaImage::new(width, height);
    }
    match crate::bitmap_view(bitmap) {
        Some(view) => imageops::resize(&view, width, height, FilterType::Triangle),
        None => RgbaImage::new(width, height),
    }
}

/// Thumbnails for every page, built once per viewer session.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailCache {
    thumbnails: Vec<RgbaImage>,
}

impl ThumbnailCache {
    pub fn build(session: &DocumentSession, target_width: u32) -> Self {
        let thumbnails: Vec<RgbaImage> = session
            .pages()
            .par_iter()
            .map(|page| generate_thumbnail(&page.bitmap, target_width))
            .collect();
        debug!(count = thumbnails.len(), "thumbnails generated");
        Self { thumbnails }
    }

    pub fn len(&self) -> usize {
        self.thumbnails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thumbnails.is_empty()
    }

    pub fn get(&self, page_index: usize) -> Option<&RgbaImage> {
        self.thumbnails.get(page_index)
    }

    pub fn as_slice(&self) -> &[RgbaImage] {
        &self.thumbnails
    }
}
