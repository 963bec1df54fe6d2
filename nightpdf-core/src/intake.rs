use tracing::{debug, info, warn};

use crate::error::NightError;
use crate::protocol::PipelineMessage;
use crate::DocumentSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessingStatus {
    Idle,
    Decoding,
    Rendering { done: usize, total: usize },
    Ready { page_count: usize },
    Failed { message: String },
}

/// Single consumer of the pipeline message stream.
///
/// Enforces message ordering and assembles the [`DocumentSession`] on completion.
#[derive(Debug)]
pub struct Intake {
    status: ProcessingStatus,
}

impl Default for Intake {
    fn default() -> Self {
        Self::new()
    }
}

impl Intake {
    pub fn new() -> Self {
        Self {
            status: ProcessingStatus::Idle,
        }
    }

    pub fn begin(&mut self) {
        self.status = ProcessingStatus::Decoding;
    }

    pub fn status(&self) -> &ProcessingStatus {
        &self.status
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            ProcessingStatus::Ready { .. } | ProcessingStatus::Failed { .. }
        )
    }

    /// "Page X of N" while rendering.
    pub fn progress_label(&self) -> Option<String> {
        match self.status {
            ProcessingStatus::Rendering { done, total } => {
                Some(format!("Page {} of {}", done, total))
            }
            _ => None,
        }
    }

    /// Applies one message. Returns the session once `Complete` arrives.
    pub fn handle(
        &mut self,
        message: PipelineMessage,
    ) -> Result<Option<DocumentSession>, NightError> {
        debug!(kind = message.kind(), "pipeline message");
        let result = self.transition(message);
        if let Err(err) = &result {
            self.status = ProcessingStatus::Failed {
                message: err.to_string(),
            };
        }
        result
    }

    fn transition(
        &mut self,
        message: PipelineMessage,
    ) -> Result<Option<DocumentSession>, NightError> {
        if self.is_terminal() {
            return Err(protocol_violation(format!(
                "{} received after the stream ended",
                message.kind()
            )));
        }

        match message {
            PipelineMessage::TotalPages { total } => match self.status {
                ProcessingStatus::Idle | ProcessingStatus::Decoding => {
                    info!(total, "page count known");
                    self.status = ProcessingStatus::Rendering { done: 0, total };
                    Ok(None)
                }
                _ => Err(protocol_violation("total_pages received twice")),
            },
            PipelineMessage::Progress { page, .. } => match self.status {
                ProcessingStatus::Rendering { done, total } => {
                    if page != done + 1 || page > total {
                        return Err(protocol_violation(format!(
                            "progress for page {} after page {} of {}",
                            page, done, total
                        )));
                    }
                    self.status = ProcessingStatus::Rendering { done: page, total };
                    Ok(None)
                }
                _ => Err(protocol_violation("progress received before total_pages")),
            },
            PipelineMessage::Complete { pages } => match self.status {
                ProcessingStatus::Rendering { done, total } => {
                    if done != total || pages.len() != total {
                        return Err(protocol_violation(format!(
                            "complete with {} pages after {} of {} progressed",
                            pages.len(),
                            done,
                            total
                        )));
                    }
                    let session = DocumentSession::new(pages)?;
                    self.status = ProcessingStatus::Ready {
                        page_count: session.page_count(),
                    };
                    info!(pages = session.page_count(), "document ready");
                    Ok(Some(session))
                }
                _ => Err(protocol_violation("complete received before total_pages")),
            },
            PipelineMessage::Error { error } => {
                warn!(%error, "pipeline reported failure");
                Err(error)
            }
        }
    }

    /// Called when the channel closes. A stream that ends without a terminal
    /// message is a transport failure.
    pub fn closed(&mut self) -> Option<NightError> {
        if self.is_terminal() {
            return None;
        }
        let err = NightError::Transport("pipeline ended without a result".into());
        self.status = ProcessingStatus::Failed {
            message: err.to_string(),
        };
        Some(err)
    }
}

fn protocol_violation(detail: impl Into<String>) -> NightError {
    NightError::Transport(detail.into())
}
