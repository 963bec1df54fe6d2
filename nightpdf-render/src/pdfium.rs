use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use nightpdf_core::{DecodeService, DecodedDocument, PageBitmap, TextRun, Transform};
use pdfium_render::prelude::*;
use tracing::{debug, instrument, warn};

/// Decode service backed by a dynamically bound pdfium library.
pub struct PdfiumDecodeService {
    pdfium: Pdfium,
}

impl PdfiumDecodeService {
    /// Binds `library` if given, falling back to a pdfium in the working
    /// directory and then the system library.
    pub fn new(library: Option<&Path>) -> Result<Self> {
        Ok(Self {
            pdfium: bind_pdfium(library)?,
        })
    }
}

impl DecodeService for PdfiumDecodeService {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> Result<Box<dyn DecodedDocument + 'a>> {
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .context("pdfium could not parse the document")?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl<'a> PdfiumDocument<'a> {
    fn page(&self, page_index: usize) -> Result<PdfPage<'a>> {
        let index: PdfPageIndex = page_index
            .try_into()
            .map_err(|_| anyhow!("page {} is out of supported range", page_index))?;
        self.document
            .pages()
            .get(index)
            .with_context(|| format!("page {} out of range", page_index))
    }
}

impl DecodedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        usize::try_from(self.document.pages().len()).unwrap_or_default()
    }

    #[instrument(skip(self))]
    fn render_page(&self, page_index: usize, scale: f32) -> Result<PageBitmap> {
        let page = self.page(page_index)?;
        let config = PdfRenderConfig::new().scale_page_by_factor(scale);
        let bitmap = page
            .render_with_config(&config)
            .with_context(|| format!("failed to render page {}", page_index))?;
        let image = bitmap.as_image().to_rgba8();
        let (width, height) = image.dimensions();
        Ok(PageBitmap::new(width, height, image.into_raw())?)
    }

    fn text_runs(&self, page_index: usize, scale: f32) -> Result<Vec<TextRun>> {
        let page = self.page(page_index)?;
        let page_height = page.height().value;
        let text = page
            .text()
            .with_context(|| format!("failed to extract text for page {}", page_index))?;

        let mut runs = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            let left = bounds.left().value;
            let right = bounds.right().value;
            let top = bounds.top().value;
            let bottom = bounds.bottom().value;
            if right <= left || top <= bottom {
                warn!(page = page_index, "skipping text segment without area");
                continue;
            }
            // PDF space has its origin bottom-left; bitmaps grow downwards.
            runs.push(TextRun {
                text: content,
                transform: Transform::scale_translate(
                    scale,
                    left * scale,
                    (page_height - bottom) * scale,
                ),
                width: (right - left) * scale,
                height: (top - bottom) * scale,
            });
        }
        debug!(page = page_index, runs = runs.len(), "text extracted");
        Ok(runs)
    }
}

/// Places a pdfium library is looked up, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LibrarySource {
    Configured(PathBuf),
    WorkingDir,
    System,
}

impl fmt::Display for LibrarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibrarySource::Configured(path) => write!(f, "{}", path.display()),
            LibrarySource::WorkingDir => f.write_str("working directory"),
            LibrarySource::System => f.write_str("system"),
        }
    }
}

fn library_sources(library: Option<&Path>) -> Vec<LibrarySource> {
    library
        .map(|path| LibrarySource::Configured(path.to_path_buf()))
        .into_iter()
        .chain([LibrarySource::WorkingDir, LibrarySource::System])
        .collect()
}

fn bind_pdfium(library: Option<&Path>) -> Result<Pdfium> {
    let mut failures = Vec::new();
    for source in library_sources(library) {
        let bound = match &source {
            LibrarySource::Configured(path) => Pdfium::bind_to_library(path),
            LibrarySource::WorkingDir => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            }
            LibrarySource::System => Pdfium::bind_to_system_library(),
        };
        match bound {
            Ok(bindings) => {
                debug!(%source, "bound pdfium");
                return Ok(Pdfium::new(bindings));
            }
            Err(err) => {
                warn!(%source, error = %err, "pdfium not found");
                failures.push(format!("{source}: {err}"));
            }
        }
    }
    Err(anyhow!(
        "no usable pdfium library ({})",
        failures.join("; ")
    ))
}
