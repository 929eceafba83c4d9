//! Error types for the deckforge library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DeckError`] — **Fatal**: the run cannot produce a deck at all
//!   (missing credential, authentication failure, malformed model output,
//!   unwritable output path). Returned as `Err(DeckError)` from the
//!   top-level `generate*` functions. No output files exist when one of
//!   these is returned.
//!
//! * [`ImageError`] — **Non-fatal**: a single section's illustration failed
//!   (no search result, download error, undecodable bytes) but the deck is
//!   still complete without it. Stored per section inside
//!   [`crate::output::PitchDeck`] so the document renders with an empty
//!   image slot rather than losing the whole run to one photo.
//!
//! The separation keeps the degrade-vs-abort policy explicit: content
//! generation aborts, image fetching degrades.

use std::path::PathBuf;
use thiserror::Error;

use crate::output::Section;

/// All fatal errors returned by the deckforge library.
///
/// Per-section image failures use [`ImageError`] and are stored in
/// [`crate::output::PitchDeck`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DeckError {
    // ── Startup errors ────────────────────────────────────────────────────
    /// A required API credential was not found at startup.
    #[error("Missing API credential: set the {var} environment variable.\n{hint}")]
    MissingCredential { var: &'static str, hint: &'static str },

    /// The startup idea was empty or whitespace-only.
    #[error("The startup idea must not be empty.")]
    EmptyIdea,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The content endpoint rejected the credential (HTTP 401/403).
    #[error("Authentication failed against {endpoint}: {detail}\nCheck that your API key is valid and not expired.")]
    AuthFailed { endpoint: String, detail: String },

    /// The content endpoint reported quota exhaustion (HTTP 429).
    ///
    /// Check `retry_after_secs` for a server-specified delay, if any.
    #[error("Rate limit exceeded on {endpoint}\nWait a while before trying again.")]
    RateLimited {
        endpoint: String,
        retry_after_secs: Option<u64>,
    },

    /// The content endpoint returned a non-success status other than
    /// 401/403/429.
    #[error("LLM API error (HTTP {status}): {detail}")]
    LlmApi { status: u16, detail: String },

    /// Connectivity or timeout failure talking to the content endpoint.
    #[error("Network error talking to {endpoint}: {detail}\nCheck your internet connection.")]
    Network { endpoint: String, detail: String },

    /// The model response could not be parsed into the nine required
    /// sections. Never silently defaulted — the run fails before any
    /// output file is written.
    #[error("The model response is missing or malformed: {detail}")]
    MalformedResponse { detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Laying out the PDF document failed.
    #[error("Failed to render the deck document: {detail}")]
    RenderFailed { detail: String },

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not re-read an export file (round-trip helper).
    #[error("Failed to read export file '{path}': {detail}")]
    ExportReadFailed { path: PathBuf, detail: String },

    // ── Control flow ──────────────────────────────────────────────────────
    /// The run was cancelled by the caller. This is a status, not a
    /// failure: no partial output files exist.
    #[error("Run cancelled before completion")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single section's illustration.
///
/// Stored alongside the deck when a section's photo could not be fetched.
/// The run continues; the renderer leaves that image slot empty.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// The search returned zero results for the section keyword.
    #[error("{section}: no photo found for query '{query}'")]
    NotFound { section: Section, query: String },

    /// The image provider reported quota exhaustion.
    ///
    /// Unsplash enforces a hard hourly cap on free-tier keys; this variant
    /// is surfaced distinctly so callers can tell "no result" from
    /// "stop asking for an hour".
    #[error("{section}: image provider rate limit reached")]
    RateLimited { section: Section },

    /// Connectivity failure during search or download.
    #[error("{section}: network error fetching photo: {detail}")]
    Network { section: Section, detail: String },

    /// The search or download exceeded the per-image timeout.
    #[error("{section}: photo fetch timed out after {secs}s")]
    Timeout { section: Section, secs: u64 },

    /// Downloaded bytes could not be decoded as an image.
    #[error("{section}: downloaded photo is not a usable image: {detail}")]
    Decode { section: Section, detail: String },
}
