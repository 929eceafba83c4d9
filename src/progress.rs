//! Progress-callback trait for per-stage and per-image events.
//!
//! Inject an `Arc<dyn DeckProgressCallback>` via
//! [`crate::config::DeckConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline moves through its stages.
//!
//! # Why callbacks instead of channels?
//!
//! The callback is the least-invasive integration point: callers can forward
//! events to a terminal progress bar, a WebSocket, or a log sink without the
//! library knowing how the host application communicates. The trait is
//! `Send + Sync` because image fetches run concurrently.

use std::fmt;
use std::sync::Arc;

use crate::output::Section;

/// The pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Content generation via the LLM endpoint.
    Content,
    /// Per-section stock-photo fetches.
    Images,
    /// PDF layout.
    Render,
    /// JSON export + file writes.
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Content => "content",
            Stage::Images => "images",
            Stage::Render => "render",
            Stage::Export => "export",
        })
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Image events may fire concurrently from different
/// tasks; implementations must synchronise shared mutable state.
pub trait DeckProgressCallback: Send + Sync {
    /// Called once when the run starts, before any network call.
    fn on_run_start(&self, sections: usize) {
        let _ = sections;
    }

    /// Called when a pipeline stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when content generation succeeds.
    fn on_content_complete(&self, prompt_tokens: u32, completion_tokens: u32) {
        let _ = (prompt_tokens, completion_tokens);
    }

    /// Called just before a section's photo search is issued.
    fn on_image_start(&self, section: Section) {
        let _ = section;
    }

    /// Called when a section's photo is downloaded and validated.
    fn on_image_complete(&self, section: Section, bytes: usize) {
        let _ = (section, bytes);
    }

    /// Called when a section's photo soft-fails; the run continues.
    fn on_image_error(&self, section: Section, error: &str) {
        let _ = (section, error);
    }

    /// Called once after the deck aggregate is assembled.
    fn on_run_complete(&self, images_fetched: usize, images_failed: usize) {
        let _ = (images_fetched, images_failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DeckProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in
/// [`crate::config::DeckConfig`].
pub type ProgressCallback = Arc<dyn DeckProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        stages: AtomicUsize,
        images_ok: AtomicUsize,
        images_err: AtomicUsize,
    }

    impl DeckProgressCallback for TrackingCallback {
        fn on_stage_start(&self, _stage: Stage) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _section: Section, _bytes: usize) {
            self.images_ok.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _section: Section, _error: &str) {
            self.images_err.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(9);
        cb.on_stage_start(Stage::Content);
        cb.on_content_complete(100, 800);
        cb.on_image_start(Section::Problem);
        cb.on_image_complete(Section::Problem, 42);
        cb.on_image_error(Section::Solution, "no result");
        cb.on_run_complete(8, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            stages: AtomicUsize::new(0),
            images_ok: AtomicUsize::new(0),
            images_err: AtomicUsize::new(0),
        };
        cb.on_stage_start(Stage::Content);
        cb.on_stage_start(Stage::Images);
        cb.on_image_complete(Section::Problem, 1000);
        cb.on_image_error(Section::Solution, "timeout");
        assert_eq!(cb.stages.load(Ordering::SeqCst), 2);
        assert_eq!(cb.images_ok.load(Ordering::SeqCst), 1);
        assert_eq!(cb.images_err.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(9);
        cb.on_stage_start(Stage::Render);
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Content.to_string(), "content");
        assert_eq!(Stage::Export.to_string(), "export");
    }
}
