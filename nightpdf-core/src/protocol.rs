use crate::error::NightError;
use crate::Page;

/// Messages sent from the background pipeline to the coordinator.
///
/// A well-formed stream is `TotalPages`, then `Progress` for pages `1..=total`,
/// then exactly one of `Complete` or `Error`. An `Error` may also arrive before
/// `TotalPages` (decode failure) or between progress messages (page failure).
#[derive(Debug)]
pub enum PipelineMessage {
    TotalPages { total: usize },
    Progress { page: usize, total: usize },
    Complete { pages: Vec<Page> },
    Error { error: NightError },
}

impl PipelineMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineMessage::TotalPages { .. } => "total_pages",
            PipelineMessage::Progress { .. } => "progress",
            PipelineMessage::Complete { .. } => "complete",
            PipelineMessage::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineMessage::Complete { .. } | PipelineMessage::Error { .. }
        )
    }
}
