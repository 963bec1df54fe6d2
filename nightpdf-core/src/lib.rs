pub mod config;
pub mod error;
pub mod intake;
pub mod pan;
pub mod protocol;
pub mod rail;
pub mod scroll;
pub mod search;
pub mod theme;
pub mod validate;
pub mod viewer;

pub use config::ViewerConfig;
pub use error::{NightError, ValidationError};
pub use intake::{Intake, ProcessingStatus};
pub use pan::{DragController, DragState};
pub use protocol::PipelineMessage;
pub use rail::ThumbnailRail;
pub use scroll::ScrollAnimation;
pub use search::{HighlightRect, SearchMatch, SearchState, TextIndex};
pub use theme::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, Theme, ThemeSetting};
pub use viewer::{Command, PageLayout, Viewer, ViewerEvent, ViewerState, Viewport};

use uuid::Uuid;

/// Identifies one pipeline run in logs.
pub type RunId = Uuid;

pub fn new_run_id() -> RunId {
    Uuid::new_v4()
}

/// Owned RGBA8 pixel buffer, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl PageBitmap {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, NightError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(NightError::Decode(format!(
                "bitmap buffer holds {} bytes, expected {} for {}x{}",
                pixels.len(),
                expected,
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Opaque white bitmap.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![255; width as usize * height as usize * 4],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Affine matrix `(a, b, c, d, tx, ty)`. `(tx, ty)` is the baseline start of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn scale_translate(scale: f32, tx: f32, ty: f32) -> Self {
        Self {
            a: scale,
            d: scale,
            tx,
            ty,
            ..Self::IDENTITY
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A positioned span of extracted text. Geometry lives in the page bitmap's pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub transform: Transform,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number.
    pub index: usize,
    pub bitmap: PageBitmap,
    pub text_runs: Vec<TextRun>,
}

/// The processed document, created once the pipeline completes.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pages: Vec<Page>,
}

impl DocumentSession {
    pub fn new(pages: Vec<Page>) -> Result<Self, NightError> {
        for (position, page) in pages.iter().enumerate() {
            if page.index != position + 1 {
                return Err(NightError::Transport(format!(
                    "page at position {} carries index {}",
                    position + 1,
                    page.index
                )));
            }
        }
        Ok(Self { pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Looks up a page by its 1-based number.
    pub fn page(&self, number: usize) -> Option<&Page> {
        number.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }

    pub fn bitmaps(&self) -> impl Iterator<Item = &PageBitmap> {
        self.pages.iter().map(|page| &page.bitmap)
    }
}

/// A PDF parsed by the decode service. Page indices are 0-based.
pub trait DecodedDocument {
    fn page_count(&self) -> usize;

    /// Renders a page at `scale` into an RGBA bitmap without any colour processing.
    fn render_page(&self, page_index: usize, scale: f32) -> anyhow::Result<PageBitmap>;

    /// Text runs in the pixel space of a bitmap rendered at `scale`.
    fn text_runs(&self, page_index: usize, scale: f32) -> anyhow::Result<Vec<TextRun>>;
}

pub trait DecodeService: Send + Sync {
    fn open<'a>(&'a self, bytes: &'a [u8]) -> anyhow::Result<Box<dyn DecodedDocument + 'a>>;
}
