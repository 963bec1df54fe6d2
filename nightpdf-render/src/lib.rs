pub mod compositor;
pub mod export;
#[cfg(feature = "pdf")]
pub mod pdfium;
pub mod pipeline;
pub mod raster;
pub mod thumbnail;

pub use compositor::{
    compose_frame, composite_page, composite_surfaces, rail_hit, rail_slots, rail_width,
    ViewportRenderer,
};
pub use export::{export_pdf, DOWNLOAD_FILE_NAME};
#[cfg(feature = "pdf")]
pub use pdfium::PdfiumDecodeService;
pub use pipeline::{spawn_pipeline, PipelineHandle};
pub use raster::{invert_pixels, rasterize_page};
pub use thumbnail::{generate_thumbnail, thumbnail_dimensions, ThumbnailCache};

use image::{ImageBuffer, Rgba};
use nightpdf_core::PageBitmap;

/// Borrowed image view over a page bitmap; `None` if the buffer is malformed.
pub(crate) fn bitmap_view(bitmap: &PageBitmap) -> Option<ImageBuffer<Rgba<u8>, &[u8]>> {
    ImageBuffer::from_raw(bitmap.width, bitmap.height, bitmap.pixels.as_slice())
}
