use thiserror::Error;

/// Input rejected before the pipeline starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name} is not a PDF file")]
    NotPdf { name: String },
    #[error("{name} is {size} bytes, over the {limit} byte limit")]
    TooLarge { name: String, size: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NightError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to load PDF document: {0}")]
    Decode(String),
    #[error("failed to process page {page}: {reason}")]
    PageRender { page: usize, reason: String },
    #[error("pipeline transport failure: {0}")]
    Transport(String),
    #[error("failed to export PDF: {0}")]
    Export(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl NightError {
    /// Terminal errors end the processing session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, NightError::Validation(_))
    }

    pub fn failing_page(&self) -> Option<usize> {
        match self {
            NightError::PageRender { page, .. } => Some(*page),
            _ => None,
        }
    }
}
