use nightpdf_core::{DecodedDocument, NightError, Page, PageBitmap};
use tracing::instrument;

/// Night-mode inversion: `255 - c` for R, G and B; alpha is left alone.
pub fn invert_pixels(pixels: &mut [u8]) {
    for chunk in pixels.chunks_exact_mut(4) {
        chunk[0] = 255 - chunk[0];
        chunk[1] = 255 - chunk[1];
        chunk[2] = 255 - chunk[2];
    }
}

fn page_failure(page_index: usize, err: impl std::fmt::Display) -> NightError {
    NightError::PageRender {
        page: page_index + 1,
        reason: err.to_string(),
    }
}

/// Renders page `page_index` (0-based) at `scale` and inverts it.
#[instrument(skip(document))]
pub fn rasterize_page(
    document: &dyn DecodedDocument,
    page_index: usize,
    scale: f32,
) -> Result<PageBitmap, NightError> {
    let mut bitmap = document
        .render_page(page_index, scale)
        .map_err(|err| page_failure(page_index, format!("{err:#}")))?;
    invert_pixels(&mut bitmap.pixels);
    Ok(bitmap)
}

/// Rasterizes a page and collects its text runs into an immutable [`Page`].
pub fn process_page(
    document: &dyn DecodedDocument,
    page_index: usize,
    scale: f32,
) -> Result<Page, NightError> {
    let bitmap = rasterize_page(document, page_index, scale)?;
    let text_runs = document
        .text_runs(page_index, scale)
        .map_err(|err| page_failure(page_index, format!("{err:#}")))?;
    Ok(Page {
        index: page_index + 1,
        bitmap,
        text_runs,
    })
}
