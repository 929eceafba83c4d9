//! # deckforge
//!
//! Generate a startup pitch deck from a one-line idea: structured slide
//! content from an LLM, a stock photo per section, a branded multi-page
//! PDF, and a machine-readable JSON export.
//!
//! ## Why this crate?
//!
//! Turning an idea into a first investor-ready deck is mechanical work:
//! the same nine sections, the same layout, a fitting image per slide.
//! This crate automates exactly that pass — an OpenAI-compatible model
//! produces the copy as a fixed-key JSON record, Unsplash supplies one
//! photo per section, and a deterministic layout engine assembles the
//! document. What it does not try to be is a design tool: the template is
//! fixed, and the JSON export exists precisely so humans can edit the text
//! afterwards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! idea
//!  │
//!  ├─ 1. Content  one JSON-mode chat call → nine fixed sections
//!  ├─ 2. Images   per-section photo search + download (concurrent, soft-fail)
//!  ├─ 3. Render   title page + nine branded pages → PDF bytes
//!  └─ 4. Export   section text → pretty JSON; both files written atomically
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deckforge::{generate_to_files, DeckConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials from NOVITA_API_KEY / UNSPLASH_ACCESS_KEY
//!     let config = DeckConfig::from_env()?;
//!     let artifacts = generate_to_files("an AI-powered dog walker", &config).await?;
//!     println!("deck:   {}", artifacts.pdf_path.display());
//!     println!("export: {}", artifacts.export_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Failure policy
//!
//! Content generation is fatal when it fails — there is no deck without
//! text, and a partially-invented deck is never produced. Image fetches
//! soft-fail per section: the page renders with an empty image slot and
//! the miss is recorded in [`DeckStats`]. Output files are written
//! atomically after all stages complete, so a cancelled or failed run
//! leaves nothing half-written on disk.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deckforge` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! deckforge = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DeckConfig, DeckConfigBuilder, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use error::{DeckError, ImageError};
pub use generate::{generate, generate_sync, generate_to_files};
pub use output::{
    deck_paths, slugify, DeckArtifacts, DeckContent, DeckStats, PitchDeck, Section, SectionBody,
    SectionImage,
};
pub use pipeline::export::{read_export, write_export};
pub use progress::{DeckProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
