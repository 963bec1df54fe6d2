//! Background decode → rasterize → invert pipeline.
//!
//! The pipeline runs on its own thread and reports through an ordered message
//! channel. Pages are processed strictly one after another because the decode
//! service is not assumed to tolerate concurrent use.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use nightpdf_core::{
    new_run_id, DecodeService, DocumentSession, Intake, NightError, PipelineMessage, RunId,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, info_span, warn};

use crate::raster::process_page;

struct Emitter {
    tx: UnboundedSender<PipelineMessage>,
    cancelled: Arc<AtomicBool>,
}

impl Emitter {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns false once nobody is listening any more.
    fn send(&self, message: PipelineMessage) -> bool {
        !self.is_cancelled() && self.tx.send(message).is_ok()
    }
}

fn run_pipeline(service: &dyn DecodeService, bytes: &[u8], scale: f32, out: &Emitter) {
    let document = match service.open(bytes) {
        Ok(document) => document,
        Err(err) => {
            let error = NightError::Decode(format!("{err:#}"));
            warn!(%error, "decode failed");
            out.send(PipelineMessage::Error { error });
            return;
        }
    };

    let total = document.page_count();
    info!(total, "document opened");
    if !out.send(PipelineMessage::TotalPages { total }) {
        return;
    }

    let mut pages = Vec::with_capacity(total);
    for page_index in 0..total {
        if out.is_cancelled() {
            info!(processed = pages.len(), "pipeline cancelled");
            return;
        }
        match process_page(document.as_ref(), page_index, scale) {
            Ok(page) => pages.push(page),
            Err(error) => {
                warn!(%error, "halting pipeline");
                out.send(PipelineMessage::Error { error });
                return;
            }
        }
        let page = page_index + 1;
        debug!(page, total, "page processed");
        if !out.send(PipelineMessage::Progress { page, total }) {
            return;
        }
    }

    out.send(PipelineMessage::Complete { pages });
}

/// Coordinator side of a running pipeline.
pub struct PipelineHandle {
    run: RunId,
    receiver: UnboundedReceiver<PipelineMessage>,
    cancelled: Arc<AtomicBool>,
}

/// Starts processing `bytes` on a dedicated thread.
pub fn spawn_pipeline(
    service: Arc<dyn DecodeService>,
    bytes: Vec<u8>,
    scale: f32,
) -> Result<PipelineHandle, NightError> {
    let (tx, receiver) = mpsc::unbounded_channel();
    let cancelled = Arc::new(AtomicBool::new(false));
    let run = new_run_id();

    let emitter = Emitter {
        tx,
        cancelled: Arc::clone(&cancelled),
    };
    thread::Builder::new()
        .name("nightpdf-pipeline".into())
        .spawn(move || {
            let span = info_span!("pipeline", %run, bytes = bytes.len());
            let _guard = span.enter();
            run_pipeline(service.as_ref(), &bytes, scale, &emitter);
        })
        .map_err(|err| NightError::Transport(format!("failed to start pipeline thread: {err}")))?;

    Ok(PipelineHandle {
        run,
        receiver,
        cancelled,
    })
}

impl PipelineHandle {
    pub fn run_id(&self) -> RunId {
        self.run
    }

    /// Next message, or `None` once the stream has ended or was cancelled.
    pub async fn next(&mut self) -> Option<PipelineMessage> {
        if self.cancelled.load(Ordering::SeqCst) {
            return None;
        }
        self.receiver.recv().await
    }

    /// Stops the pipeline. Nothing is delivered afterwards and pages processed so
    /// far are dropped.
    pub fn cancel(&mut self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            info!(run = %self.run, "pipeline terminated by caller");
        }
        self.receiver.close();
    }

    /// Drives the stream through `intake` until a session or a terminal error.
    pub async fn finish<F>(
        mut self,
        intake: &mut Intake,
        mut on_progress: F,
    ) -> Result<DocumentSession, NightError>
    where
        F: FnMut(&Intake),
    {
        intake.begin();
        loop {
            match self.next().await {
                Some(message) => {
                    if let Some(session) = intake.handle(message)? {
                        return Ok(session);
                    }
                    on_progress(intake);
                }
                None => {
                    return Err(intake.closed().unwrap_or_else(|| {
                        NightError::Transport("pipeline stream ended".into())
                    }));
                }
            }
        }
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeService;
    use nightpdf_core::ProcessingStatus;

    async fn collect(mut handle: PipelineHandle) -> Vec<PipelineMessage> {
        let mut messages = Vec::new();
        while let Some(message) = handle.next().await {
            messages.push(message);
        }
        messages
    }

    #[tokio::test]
    async fn emits_ordered_stream_for_valid_document() {
        let service = Arc::new(FakeService::new(vec!["a", "b", "c"]));
        let handle = spawn_pipeline(service, b"%PDF-1.7".to_vec(), 2.0).unwrap();

        let messages = collect(handle).await;

        assert_eq!(messages.len(), 5);
        assert!(matches!(messages[0], PipelineMessage::TotalPages { total: 3 }));
        for (offset, message) in messages[1..4].iter().enumerate() {
            match message {
                PipelineMessage::Progress { page, total } => {
                    assert_eq!(*page, offset + 1);
                    assert_eq!(*total, 3);
                }
                other => panic!("unexpected message: {:?}", other.kind()),
            }
        }
        match &messages[4] {
            PipelineMessage::Complete { pages } => {
                assert_eq!(pages.len(), 3);
                let indices: Vec<_> = pages.iter().map(|p| p.index).collect();
                assert_eq!(indices, vec![1, 2, 3]);
                assert_eq!(pages[0].bitmap.pixels[0], 245);
                assert_eq!(pages[2].text_runs[0].text, "c");
            }
            other => panic!("unexpected message: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn empty_document_completes_without_pages() {
        let service = Arc::new(FakeService::new(Vec::new()));
        let handle = spawn_pipeline(service.clone(), b"%PDF-1.7".to_vec(), 2.0).unwrap();

        let messages = collect(handle).await;

        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], PipelineMessage::TotalPages { total: 0 }));
        match &messages[1] {
            PipelineMessage::Complete { pages } => assert!(pages.is_empty()),
            other => panic!("unexpected message: {:?}", other.kind()),
        }

        let handle = spawn_pipeline(service, b"%PDF-1.7".to_vec(), 2.0).unwrap();
        let mut intake = Intake::new();
        let session = handle.finish(&mut intake, |_| {}).await.unwrap();
        assert_eq!(session.page_count(), 0);
    }

    #[tokio::test]
    async fn decode_failure_is_single_error() {
        let service = Arc::new(FakeService::new(vec!["a"]));
        let handle = spawn_pipeline(service, b"garbage".to_vec(), 2.0).unwrap();

        let messages = collect(handle).await;

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PipelineMessage::Error { error } => assert!(matches!(error, NightError::Decode(_))),
            other => panic!("unexpected message: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn unreadable_pdf_fails_through_finish() {
        let mut service = FakeService::new(vec!["a", "b"]);
        service.fail_open = true;
        let handle = spawn_pipeline(Arc::new(service), b"%PDF-1.7".to_vec(), 1.0).unwrap();

        let mut intake = Intake::new();
        let err = handle.finish(&mut intake, |_| {}).await.unwrap_err();

        assert_eq!(err.to_string(), "failed to load PDF document: no trailer found");
        assert!(matches!(intake.status(), ProcessingStatus::Failed { .. }));
    }

    #[tokio::test]
    async fn page_failure_halts_without_complete() {
        let mut service = FakeService::new(vec!["a", "b", "c", "d"]);
        service.fail_page = Some(1);
        let handle = spawn_pipeline(Arc::new(service), b"%PDF-1.7".to_vec(), 1.0).unwrap();

        let messages = collect(handle).await;
        let kinds: Vec<_> = messages.iter().map(|m| m.kind()).collect();

        assert_eq!(kinds, vec!["total_pages", "progress", "error"]);
        match &messages[2] {
            PipelineMessage::Error { error } => assert_eq!(error.failing_page(), Some(2)),
            other => panic!("unexpected message: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn finish_assembles_session_and_reports_progress() {
        let service = Arc::new(FakeService::new(vec!["x", "Hello World", "y"]));
        let handle = spawn_pipeline(service, b"%PDF-1.4".to_vec(), 2.0).unwrap();
        let mut intake = Intake::new();
        let mut labels = Vec::new();

        let session = handle
            .finish(&mut intake, |intake| {
                labels.extend(intake.progress_label());
            })
            .await
            .unwrap();

        assert_eq!(session.page_count(), 3);
        assert_eq!(labels.last().map(String::as_str), Some("Page 3 of 3"));
        assert_eq!(intake.status(), &ProcessingStatus::Ready { page_count: 3 });
    }

    #[tokio::test]
    async fn finish_surfaces_page_error() {
        let mut service = FakeService::new(vec!["a", "b"]);
        service.fail_page = Some(0);
        let handle = spawn_pipeline(Arc::new(service), b"%PDF-1.4".to_vec(), 1.0).unwrap();

        let err = handle.finish(&mut Intake::new(), |_| {}).await.unwrap_err();
        assert_eq!(err.to_string(), "failed to process page 1: corrupt content stream");
    }

    #[tokio::test]
    async fn cancelled_pipeline_delivers_nothing_more() {
        let service = FakeService::new(vec!["a", "b", "c"]);
        service.hold.store(true, Ordering::SeqCst);
        let hold = Arc::clone(&service.hold);
        let mut handle = spawn_pipeline(Arc::new(service), b"%PDF-1.4".to_vec(), 1.0).unwrap();

        assert!(matches!(
            handle.next().await,
            Some(PipelineMessage::TotalPages { total: 3 })
        ));
        assert!(matches!(
            handle.next().await,
            Some(PipelineMessage::Progress { page: 1, .. })
        ));

        handle.cancel();
        hold.store(false, Ordering::SeqCst);

        assert!(handle.next().await.is_none());
        assert!(handle.next().await.is_none());
    }
}
