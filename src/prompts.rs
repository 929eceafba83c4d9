//! Prompts for structured pitch-deck content generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing what the model is asked to
//!    produce (a new section, a different shape constraint) is an edit in
//!    exactly one place.
//!
//! 2. **Testability** — unit tests can assert the prompt names all nine
//!    section keys without calling a real model.
//!
//! Callers can override the system prompt via
//! [`crate::config::DeckConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

use crate::output::Section;

/// Default system prompt for content generation.
///
/// The JSON-only instruction is belt-and-braces on top of the request's
/// `response_format: json_object` — some OpenAI-compatible backends honour
/// the instruction more reliably than the parameter.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a startup pitch consultant that responds with \
valid JSON only. Do not include any explanatory text, markdown formatting, or code blocks in \
your response. The response must be a single JSON object that can be parsed directly.";

/// Build the user prompt asking for all nine sections for `idea`.
///
/// Every key is spelled out verbatim so the response parses into
/// [`crate::output::DeckContent`] without any key normalisation. The value
/// shape is constrained to the two forms the data model accepts.
pub fn content_prompt(idea: &str) -> String {
    let keys = Section::ALL
        .iter()
        .map(|s| format!("\"{}\"", s.title()))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Generate a JSON object for a startup pitch deck based on the idea: '{idea}'.\n\
         The object must contain exactly these keys: {keys}.\n\
         Each value must be either a short paragraph (a JSON string) or a list of \
         concise bullet points (a JSON array of strings). Every section must be \
         non-empty, specific to the idea, and written in a confident, investor-facing tone."
    )
}
