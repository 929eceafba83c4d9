//! Content generation: one JSON-mode chat call, parsed into [`DeckContent`].
//!
//! This module is intentionally thin — all prompt text lives in
//! [`crate::prompts`] so it can be tuned without touching the network or
//! validation logic here.
//!
//! ## Error mapping
//!
//! The error taxonomy is driven directly off the HTTP exchange:
//! 401/403 become [`DeckError::AuthFailed`], 429 becomes
//! [`DeckError::RateLimited`] (honouring `Retry-After`), transport failures
//! become [`DeckError::Network`], and any response that cannot be parsed
//! into all nine non-empty sections becomes
//! [`DeckError::MalformedResponse`]. Nothing is silently defaulted: a deck
//! with an invented "Problem" paragraph is worse than no deck.

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::DeckConfig;
use crate::error::DeckError;
use crate::output::{DeckContent, Section};
use crate::prompts::{content_prompt, DEFAULT_SYSTEM_PROMPT};

/// Token usage reported by the content endpoint's `usage` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// Ask the model for all nine sections and parse the reply.
///
/// One outbound request; consumes API quota. The per-call timeout comes
/// from `config.api_timeout_secs` and is fatal — no deck can be built
/// without content.
pub async fn generate_content(
    client: &Client,
    config: &DeckConfig,
    idea: &str,
) -> Result<(DeckContent, TokenUsage), DeckError> {
    let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let body = json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": system_prompt },
            { "role": "user", "content": content_prompt(idea) },
        ],
        "temperature": config.temperature,
        "max_tokens": config.max_tokens,
        "response_format": { "type": "json_object" },
    });

    let started = Instant::now();
    let response = client
        .post(&endpoint)
        .bearer_auth(&config.llm_api_key)
        .timeout(Duration::from_secs(config.api_timeout_secs))
        .json(&body)
        .send()
        .await
        .map_err(|e| DeckError::Network {
            endpoint: endpoint.clone(),
            detail: if e.is_timeout() {
                format!("request timed out after {}s", config.api_timeout_secs)
            } else {
                e.to_string()
            },
        })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        let detail = truncate(&response.text().await.unwrap_or_default(), 200);
        return Err(match status.as_u16() {
            401 | 403 => DeckError::AuthFailed { endpoint, detail },
            429 => DeckError::RateLimited {
                endpoint,
                retry_after_secs,
            },
            code => DeckError::LlmApi {
                status: code,
                detail,
            },
        });
    }

    let parsed: ChatResponse = response.json().await.map_err(|e| DeckError::MalformedResponse {
        detail: format!("response body is not valid JSON: {e}"),
    })?;

    let usage = parsed
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();

    let raw = parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| DeckError::MalformedResponse {
            detail: "response contains no choices".into(),
        })?;

    debug!(
        "content call: {}ms, {} prompt / {} completion tokens",
        started.elapsed().as_millis(),
        usage.prompt_tokens,
        usage.completion_tokens
    );

    let content = parse_deck_content(&raw)?;
    Ok((content, usage))
}

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n(.*)\n```\s*$").unwrap());

/// Strip an outer ```json fence if the model disobeyed the JSON-only
/// instruction. Models wrap structured output in fences often enough that
/// rejecting such replies would fail otherwise-perfect runs.
fn strip_json_fences(raw: &str) -> &str {
    match RE_OUTER_FENCES.captures(raw.trim()) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(raw),
        None => raw.trim(),
    }
}

/// Parse the model's reply into a [`DeckContent`], validating that all nine
/// sections are present and non-empty first.
pub fn parse_deck_content(raw: &str) -> Result<DeckContent, DeckError> {
    let cleaned = strip_json_fences(raw);

    let value: Value =
        serde_json::from_str(cleaned).map_err(|e| DeckError::MalformedResponse {
            detail: format!("model output is not valid JSON: {e}"),
        })?;

    let object = value.as_object().ok_or_else(|| DeckError::MalformedResponse {
        detail: "model output is not a JSON object".into(),
    })?;

    let mut missing: Vec<&str> = Vec::new();
    let mut malformed: Vec<&str> = Vec::new();
    for section in Section::ALL {
        let key = section.title();
        match object.get(key) {
            None => missing.push(key),
            Some(body) if !body_is_usable(body) => malformed.push(key),
            Some(_) => {}
        }
    }
    if !missing.is_empty() {
        return Err(DeckError::MalformedResponse {
            detail: format!("missing sections: {}", missing.join(", ")),
        });
    }
    if !malformed.is_empty() {
        return Err(DeckError::MalformedResponse {
            detail: format!("empty or malformed sections: {}", malformed.join(", ")),
        });
    }

    serde_json::from_value(value).map_err(|e| DeckError::MalformedResponse {
        detail: format!("sections do not match the expected shape: {e}"),
    })
}

/// A section value is usable when it is a non-blank string, or a non-empty
/// array of strings of which at least one is non-blank.
fn body_is_usable(value: &Value) -> bool {
    match value {
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => {
            !items.is_empty()
                && items.iter().all(|i| i.is_string())
                && items
                    .iter()
                    .any(|i| i.as_str().is_some_and(|s| !s.trim().is_empty()))
        }
        _ => false,
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.trim().to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}\u{2026}", s[..cut].trim())
    }
}
