//! End-to-end pipeline tests against mock HTTP servers.
//!
//! Unlike live-API tests these are fully hermetic: a wiremock server stands
//! in for the content endpoint and another for the image provider, so the
//! suite runs offline, deterministically, and in CI. Each test drives the
//! real pipeline (`generate` / `generate_to_files`) through the public API.

use std::collections::BTreeMap;
use std::path::Path;

use deckforge::{
    generate, generate_to_files, read_export, DeckConfig, DeckError, ImageError, Section,
};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A complete, well-formed model payload: all nine sections.
fn full_payload() -> serde_json::Value {
    serde_json::json!({
        "Problem": "Office plants die. Nobody remembers to water them.",
        "Solution": "A tiny sensor and a subscription watering service.",
        "Market Analysis": "Every office has plants. Most are dying.",
        "Competitors": ["DIY watering globes", "Plastic plants"],
        "Unique Selling Proposition (USP)": "We guarantee green, or we replant free.",
        "Business Model": "Monthly subscription per plant.",
        "Financial Projections": "Profitable at 10,000 plants.",
        "Team Overview": "Two botanists and an embedded engineer.",
        "Call to Action": "Join our seed round. Literally.",
    })
}

/// Wrap model output the way a chat-completions endpoint returns it.
fn chat_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 640 }
    })
}

async fn mount_llm(server: &MockServer, payload: &serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            &serde_json::to_string_pretty(payload).unwrap(),
        )))
        .mount(server)
        .await;
}

fn tiny_png() -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        6,
        4,
        image::Rgb([30, 90, 160]),
    ));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Mount a photo search that always finds one downloadable image on the
/// same mock server.
async fn mount_images(server: &MockServer) {
    let photo_url = format!("{}/photo.png", server.uri());
    Mock::given(method("GET"))
        .and(path("/search/photos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "total": 1,
            "results": [{
                "urls": { "regular": photo_url },
                "links": { "html": "https://photos.example/abc" },
                "user": { "name": "Ada Lovelace" }
            }]
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(tiny_png())
                .insert_header("content-type", "image/png"),
        )
        .mount(server)
        .await;
}

fn config_for(llm: &MockServer, images: &MockServer, out_dir: &Path) -> DeckConfig {
    DeckConfig::builder()
        .llm_api_key("test-llm-key")
        .image_api_key("test-image-key")
        .base_url(llm.uri())
        .image_api_url(images.uri())
        .output_dir(out_dir)
        .build()
        .unwrap()
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_run_produces_both_artifacts() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let artifacts = generate_to_files("self-watering office plants", &config)
        .await
        .expect("run should succeed");

    // Both files exist, the PDF is a PDF, and paths are siblings.
    let pdf = std::fs::read(&artifacts.pdf_path).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(
        artifacts.pdf_path.parent(),
        artifacts.export_path.parent()
    );

    // The export contains exactly the nine keys, each non-empty.
    let export: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&artifacts.export_path).unwrap()).unwrap();
    let object = export.as_object().unwrap();
    assert_eq!(object.len(), 9);
    for section in Section::ALL {
        let value = object
            .get(section.title())
            .unwrap_or_else(|| panic!("export missing {section}"));
        let non_empty = match value {
            serde_json::Value::String(s) => !s.trim().is_empty(),
            serde_json::Value::Array(items) => !items.is_empty(),
            _ => false,
        };
        assert!(non_empty, "{section} is empty in the export");
    }

    assert_eq!(artifacts.stats.images_fetched, 9);
    assert_eq!(artifacts.stats.images_failed, 0);
    assert_eq!(artifacts.stats.prompt_tokens, 120);
    assert_eq!(artifacts.stats.completion_tokens, 640);
}

#[tokio::test]
async fn export_round_trips_through_read_export() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let artifacts = generate_to_files("plant sensors", &config).await.unwrap();

    let reread = read_export(&artifacts.export_path).unwrap();
    let expected: deckforge::DeckContent =
        serde_json::from_value(full_payload()).unwrap();
    assert_eq!(reread, expected);
}

#[tokio::test]
async fn attribution_flows_into_the_deck() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let deck = generate("plant sensors", &config).await.unwrap();

    let img = deck.images.get(&Section::Problem).expect("image fetched");
    assert_eq!(img.author, "Ada Lovelace");
    assert_eq!(img.source_url, "https://photos.example/abc");
    assert_eq!((img.width, img.height), (6, 4));
}

#[tokio::test]
async fn two_runs_produce_byte_identical_exports() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();

    let a = generate_to_files("plant sensors", &config_for(&llm, &images, out_a.path()))
        .await
        .unwrap();
    let b = generate_to_files("plant sensors", &config_for(&llm, &images, out_b.path()))
        .await
        .unwrap();

    assert_eq!(
        std::fs::read(&a.export_path).unwrap(),
        std::fs::read(&b.export_path).unwrap()
    );
}

#[tokio::test]
async fn fenced_model_output_is_tolerated() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    let fenced = format!(
        "```json\n{}\n```",
        serde_json::to_string_pretty(&full_payload()).unwrap()
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(&fenced)))
        .mount(&llm)
        .await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    assert!(generate_to_files("plant sensors", &config).await.is_ok());
}

// ── Image degradation ────────────────────────────────────────────────────────

#[tokio::test]
async fn zero_image_results_still_produce_a_full_document() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    Mock::given(method("GET"))
        .and(path("/search/photos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "total": 0, "results": [] })),
        )
        .mount(&images)
        .await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let artifacts = generate_to_files("plant sensors", &config)
        .await
        .expect("run must not abort on missing images");

    assert!(std::fs::read(&artifacts.pdf_path).unwrap().starts_with(b"%PDF"));
    assert_eq!(artifacts.stats.images_fetched, 0);
    assert_eq!(artifacts.stats.images_failed, 9);
}

#[tokio::test]
async fn image_rate_limit_is_soft_and_distinct() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    Mock::given(method("GET"))
        .and(path("/search/photos"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Rate Limit Exceeded"))
        .mount(&images)
        .await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let deck = generate("plant sensors", &config).await.unwrap();

    assert_eq!(deck.image_failures.len(), 9);
    assert!(deck
        .image_failures
        .values()
        .all(|e| matches!(e, ImageError::RateLimited { .. })));
}

#[tokio::test]
async fn text_only_deck_skips_the_image_api_entirely() {
    let llm = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    let images = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/photos"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&images)
        .await;
    let out = tempfile::tempdir().unwrap();

    let config = DeckConfig::builder()
        .llm_api_key("test-llm-key")
        .fetch_images(false)
        .base_url(llm.uri())
        .image_api_url(images.uri())
        .output_dir(out.path())
        .build()
        .unwrap();

    let artifacts = generate_to_files("plant sensors", &config).await.unwrap();
    assert_eq!(artifacts.stats.images_fetched, 0);
    assert_eq!(artifacts.stats.images_failed, 0);
}

// ── Fatal content failures ───────────────────────────────────────────────────

#[tokio::test]
async fn missing_section_fails_fast_with_no_output_files() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    let mut payload = full_payload();
    payload.as_object_mut().unwrap().remove("Call to Action");
    mount_llm(&llm, &payload).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let err = generate_to_files("plant sensors", &config).await.unwrap_err();

    match err {
        DeckError::MalformedResponse { detail } => {
            assert!(detail.contains("Call to Action"), "got: {detail}");
        }
        other => panic!("expected MalformedResponse, got {other:?}"),
    }
    assert!(dir_entries(out.path()).is_empty(), "no files may be written");
}

#[tokio::test]
async fn auth_failure_is_fatal_and_distinct() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string(r#"{"error":"invalid key"}"#))
        .mount(&llm)
        .await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let err = generate_to_files("plant sensors", &config).await.unwrap_err();
    assert!(matches!(err, DeckError::AuthFailed { .. }), "got {err:?}");
    assert!(dir_entries(out.path()).is_empty());
}

#[tokio::test]
async fn llm_rate_limit_is_fatal_and_distinct() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "42")
                .set_body_string("slow down"),
        )
        .mount(&llm)
        .await;
    let out = tempfile::tempdir().unwrap();

    let config = config_for(&llm, &images, out.path());
    let err = generate("plant sensors", &config).await.unwrap_err();
    match err {
        DeckError::RateLimited {
            retry_after_secs, ..
        } => assert_eq!(retry_after_secs, Some(42)),
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

// ── Startup validation & cancellation ────────────────────────────────────────

#[tokio::test]
async fn missing_credential_fails_before_any_request() {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&llm)
        .await;

    let err = DeckConfig::builder()
        .image_api_key("present")
        .base_url(llm.uri())
        .build()
        .unwrap_err();
    assert!(matches!(err, DeckError::InvalidConfig(_)));
}

#[tokio::test]
async fn cancelled_run_leaves_no_files() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let config = DeckConfig::builder()
        .llm_api_key("test-llm-key")
        .image_api_key("test-image-key")
        .base_url(llm.uri())
        .image_api_url(images.uri())
        .output_dir(out.path())
        .cancel_token(token)
        .build()
        .unwrap();

    let err = generate_to_files("plant sensors", &config).await.unwrap_err();
    assert!(matches!(err, DeckError::Cancelled));
    assert!(dir_entries(out.path()).is_empty());
}

// ── Deck aggregation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn images_are_keyed_by_section_not_arrival_order() {
    let llm = MockServer::start().await;
    let images = MockServer::start().await;
    mount_llm(&llm, &full_payload()).await;
    mount_images(&images).await;
    let out = tempfile::tempdir().unwrap();

    // Fan the fetches out as wide as allowed so completion order scrambles.
    let config = DeckConfig::builder()
        .llm_api_key("test-llm-key")
        .image_api_key("test-image-key")
        .base_url(llm.uri())
        .image_api_url(images.uri())
        .image_concurrency(9)
        .output_dir(out.path())
        .build()
        .unwrap();

    let deck = generate("plant sensors", &config).await.unwrap();
    let keys: Vec<Section> = deck.images.keys().copied().collect();
    let mut expected: BTreeMap<Section, ()> = BTreeMap::new();
    for section in Section::ALL {
        expected.insert(section, ());
    }
    assert_eq!(keys, expected.keys().copied().collect::<Vec<_>>());
}
