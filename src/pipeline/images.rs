//! Stock-photo fetching: one search + download per section.
//!
//! Every failure in this module is soft. A deck with eight photos and one
//! empty slot is a better outcome than no deck, so nothing here returns
//! [`crate::error::DeckError`] — each section independently resolves to a
//! [`SectionImage`] or an [`ImageError`] and the renderer copes with both.
//!
//! ## Rate limits
//!
//! Unsplash free-tier keys are capped at 50 requests/hour and the API
//! signals exhaustion as a plain-text 403 rather than a 429, so both are
//! recognised. The distinct [`ImageError::RateLimited`] lets a caller tell
//! "this keyword has no photos" from "stop asking for an hour".

use std::collections::BTreeMap;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use image::GenericImageView as _;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::DeckConfig;
use crate::error::ImageError;
use crate::output::{Section, SectionImage};

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Deserialize)]
struct SearchHit {
    urls: HitUrls,
    links: HitLinks,
    user: HitUser,
}

#[derive(Deserialize)]
struct HitUrls {
    regular: String,
}

#[derive(Deserialize)]
struct HitLinks {
    html: String,
}

#[derive(Deserialize)]
struct HitUser {
    #[serde(default)]
    name: String,
}

/// Fetch the top photo for one section's keyword.
///
/// Two requests: the keyword search, then the download of the top result.
/// The downloaded bytes are decoded once to prove they are a usable image
/// and to capture pixel dimensions for layout.
pub async fn fetch_section_image(
    client: &Client,
    config: &DeckConfig,
    section: Section,
) -> Result<SectionImage, ImageError> {
    let query = section.search_query();
    let timeout = Duration::from_secs(config.image_timeout_secs);
    let search_url = format!(
        "{}/search/photos",
        config.image_api_url.trim_end_matches('/')
    );

    let response = client
        .get(&search_url)
        .query(&[("query", query), ("per_page", "1")])
        .header(
            reqwest::header::AUTHORIZATION,
            format!("Client-ID {}", config.image_api_key),
        )
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport(section, config.image_timeout_secs, e))?;

    let status = response.status().as_u16();
    if !(200..300).contains(&status) {
        let body = response.text().await.unwrap_or_default();
        if is_rate_limited(status, &body) {
            return Err(ImageError::RateLimited { section });
        }
        return Err(ImageError::Network {
            section,
            detail: format!("photo search returned HTTP {status}"),
        });
    }

    let search: SearchResponse = response.json().await.map_err(|e| ImageError::Network {
        section,
        detail: format!("unexpected search response: {e}"),
    })?;

    let hit = search
        .results
        .into_iter()
        .next()
        .ok_or_else(|| ImageError::NotFound {
            section,
            query: query.to_string(),
        })?;

    debug!("{section}: downloading {}", hit.urls.regular);
    let download = client
        .get(&hit.urls.regular)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport(section, config.image_timeout_secs, e))?;

    let status = download.status().as_u16();
    if !(200..300).contains(&status) {
        return Err(ImageError::Network {
            section,
            detail: format!("photo download returned HTTP {status}"),
        });
    }

    let bytes = download
        .bytes()
        .await
        .map_err(|e| classify_transport(section, config.image_timeout_secs, e))?;

    let decoded = image::load_from_memory(&bytes).map_err(|e| ImageError::Decode {
        section,
        detail: e.to_string(),
    })?;

    Ok(SectionImage {
        bytes: bytes.to_vec(),
        author: hit.user.name,
        source_url: hit.links.html,
        width: decoded.width(),
        height: decoded.height(),
    })
}

/// Fetch photos for all nine sections with bounded concurrency.
///
/// Results are keyed by section, so completion order is irrelevant — a
/// photo that arrives last still lands on the right page. Progress events
/// fire per section as each fetch starts and settles.
pub async fn fetch_all(
    client: &Client,
    config: &DeckConfig,
) -> BTreeMap<Section, Result<SectionImage, ImageError>> {
    stream::iter(Section::ALL.iter().map(|&section| {
        let client = client.clone();
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_start(section);
            }
            let result = fetch_section_image(&client, config, section).await;
            match &result {
                Ok(img) => {
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_image_complete(section, img.bytes.len());
                    }
                }
                Err(e) => {
                    warn!("{e}");
                    if let Some(ref cb) = config.progress_callback {
                        cb.on_image_error(section, &e.to_string());
                    }
                }
            }
            (section, result)
        }
    }))
    .buffer_unordered(config.image_concurrency)
    .collect()
    .await
}

fn classify_transport(section: Section, timeout_secs: u64, e: reqwest::Error) -> ImageError {
    if e.is_timeout() {
        ImageError::Timeout {
            section,
            secs: timeout_secs,
        }
    } else {
        ImageError::Network {
            section,
            detail: e.to_string(),
        }
    }
}

/// Unsplash signals quota exhaustion as `403 Rate Limit Exceeded`; other
/// OpenAPI-ish providers use 429. Recognise both.
fn is_rate_limited(status: u16, body: &str) -> bool {
    status == 429 || (status == 403 && body.to_ascii_lowercase().contains("rate limit"))
}
