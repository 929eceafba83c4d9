//! Deck generation entry points.
//!
//! ## Why the orchestrator owns file writes
//!
//! The pipeline stages are pure with respect to the filesystem: content and
//! images only touch the network, rendering and export only produce bytes.
//! This module sequences them, measures them, and is the single place where
//! artifacts hit the disk — atomically, and only after every stage has
//! finished. An interrupted or failed run therefore leaves either two
//! complete files or none at all.

use std::collections::BTreeMap;
use std::time::Instant;

use reqwest::Client;
use tracing::{debug, info};

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::output::{deck_paths, DeckArtifacts, DeckStats, PitchDeck, Section};
use crate::pipeline::{content, export, images, render};
use crate::progress::Stage;

/// Generate a pitch deck for `idea` without writing any files.
///
/// This is the primary library entry point.
///
/// # Errors
/// Returns `Err(DeckError)` only for fatal errors (empty idea, content
/// generation failure, cancellation). Per-section image failures are
/// recorded in the returned deck, not propagated.
pub async fn generate(idea: &str, config: &DeckConfig) -> Result<PitchDeck, DeckError> {
    let total_start = Instant::now();
    let idea = idea.trim();
    if idea.is_empty() {
        return Err(DeckError::EmptyIdea);
    }
    info!("Starting deck generation: {idea}");

    // One HTTP client for the whole run, passed to every stage.
    let client = Client::builder()
        .user_agent(concat!("deckforge/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| DeckError::Internal(format!("building HTTP client: {e}")))?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(Section::ALL.len());
    }

    // ── Stage 1: content ─────────────────────────────────────────────────
    ensure_live(config)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Content);
    }
    let content_start = Instant::now();
    let (deck_content, usage) = tokio::select! {
        biased;
        _ = config.cancel.cancelled() => return Err(DeckError::Cancelled),
        result = content::generate_content(&client, config, idea) => result?,
    };
    let content_duration_ms = content_start.elapsed().as_millis() as u64;
    info!("Content generated in {content_duration_ms}ms");
    if let Some(ref cb) = config.progress_callback {
        cb.on_content_complete(usage.prompt_tokens, usage.completion_tokens);
    }

    // ── Stage 2: images ──────────────────────────────────────────────────
    ensure_live(config)?;
    let images_start = Instant::now();
    let (deck_images, image_failures) = if config.fetch_images {
        if let Some(ref cb) = config.progress_callback {
            cb.on_stage_start(Stage::Images);
        }
        let results = tokio::select! {
            biased;
            _ = config.cancel.cancelled() => return Err(DeckError::Cancelled),
            results = images::fetch_all(&client, config) => results,
        };
        let mut fetched = BTreeMap::new();
        let mut failed = BTreeMap::new();
        for (section, result) in results {
            match result {
                Ok(img) => {
                    fetched.insert(section, img);
                }
                Err(e) => {
                    failed.insert(section, e);
                }
            }
        }
        (fetched, failed)
    } else {
        debug!("Image fetching disabled; producing a text-only deck");
        (BTreeMap::new(), BTreeMap::new())
    };
    let images_duration_ms = images_start.elapsed().as_millis() as u64;

    let stats = DeckStats {
        images_fetched: deck_images.len(),
        images_failed: image_failures.len(),
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        content_duration_ms,
        images_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Deck assembled: {}/{} images, {}ms total",
        stats.images_fetched,
        Section::ALL.len(),
        stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(stats.images_fetched, stats.images_failed);
    }

    Ok(PitchDeck {
        idea: idea.to_string(),
        content: deck_content,
        images: deck_images,
        image_failures,
        stats,
    })
}

/// Generate a deck and write both artifacts to deterministic paths under
/// `config.output_dir`.
///
/// Rendering and serialisation happen fully in memory first; the two files
/// are then written atomically (temp + rename). Cancellation between any
/// two steps leaves no files behind.
pub async fn generate_to_files(
    idea: &str,
    config: &DeckConfig,
) -> Result<DeckArtifacts, DeckError> {
    let deck = generate(idea, config).await?;

    ensure_live(config)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Render);
    }
    let pdf_bytes = render::render_pdf(&deck)?;

    ensure_live(config)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage_start(Stage::Export);
    }
    let export_text = export::export_string(&deck.content)?;

    let (pdf_path, export_path) = deck_paths(&config.output_dir, &deck.idea);
    export::write_atomic(&pdf_path, &pdf_bytes).await?;
    export::write_atomic(&export_path, export_text.as_bytes()).await?;
    info!(
        "Wrote {} and {}",
        pdf_path.display(),
        export_path.display()
    );

    Ok(DeckArtifacts {
        pdf_path,
        export_path,
        stats: deck.stats,
    })
}

/// Synchronous wrapper around [`generate_to_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(idea: &str, config: &DeckConfig) -> Result<DeckArtifacts, DeckError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DeckError::Internal(format!("creating tokio runtime: {e}")))?
        .block_on(generate_to_files(idea, config))
}

fn ensure_live(config: &DeckConfig) -> Result<(), DeckError> {
    if config.cancel.is_cancelled() {
        Err(DeckError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    fn offline_config() -> DeckConfig {
        // Points at a reserved-TLD host so an accidental request fails fast
        // instead of reaching a real service.
        DeckConfig::builder()
            .llm_api_key("test-key")
            .image_api_key("test-key")
            .base_url("http://llm.invalid")
            .image_api_url("http://images.invalid")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn empty_idea_fails_before_any_network_call() {
        let err = generate("   ", &offline_config()).await.unwrap_err();
        assert!(matches!(err, DeckError::EmptyIdea));
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_the_run_immediately() {
        let token = CancellationToken::new();
        token.cancel();
        let config = DeckConfig::builder()
            .llm_api_key("test-key")
            .image_api_key("test-key")
            .base_url("http://llm.invalid")
            .image_api_url("http://images.invalid")
            .cancel_token(token)
            .build()
            .unwrap();
        let err = generate("a real idea", &config).await.unwrap_err();
        assert!(matches!(err, DeckError::Cancelled));
    }
}
