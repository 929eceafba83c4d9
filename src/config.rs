//! Configuration for a pitch-deck generation run.
//!
//! All run behaviour is controlled through [`DeckConfig`], built via its
//! [`DeckConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to pass the same run settings to every pipeline stage and to construct
//! fully-specified configs in tests with no environment access.
//!
//! # Design choice: builder over constructor
//! A constructor with a dozen positional fields breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest. Credentials are explicit fields — the
//! library never reads an API key from an ambient singleton; only
//! [`DeckConfig::from_env`] touches the environment, and only at startup.

use std::fmt;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::error::DeckError;
use crate::progress::ProgressCallback;

/// Default OpenAI-compatible content endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.novita.ai/v3/openai";

/// Default content model.
pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-maverick-17b-128e-instruct-fp8";

/// Default image-search endpoint.
pub const DEFAULT_IMAGE_API_URL: &str = "https://api.unsplash.com";

/// Environment variable holding the content-API key.
pub const LLM_KEY_VAR: &str = "NOVITA_API_KEY";

/// Environment variable holding the image-API access key.
pub const IMAGE_KEY_VAR: &str = "UNSPLASH_ACCESS_KEY";

/// Configuration for one generation run.
///
/// Built via [`DeckConfig::builder()`] or [`DeckConfig::from_env()`].
///
/// # Example
/// ```rust
/// use deckforge::DeckConfig;
///
/// let config = DeckConfig::builder()
///     .llm_api_key("sk-test")
///     .image_api_key("access-test")
///     .temperature(0.4)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_tokens, 4096);
/// ```
#[derive(Clone)]
pub struct DeckConfig {
    /// API key for the content endpoint. Required.
    pub llm_api_key: String,

    /// Access key for the image-search API. Required unless
    /// `fetch_images` is false.
    pub image_api_key: String,

    /// Base URL of the OpenAI-compatible content endpoint.
    pub base_url: String,

    /// Base URL of the image-search API.
    pub image_api_url: String,

    /// Content model identifier.
    pub model: String,

    /// Sampling temperature for content generation. Default: 0.7.
    ///
    /// Pitch copy benefits from some variety; this is deliberately higher
    /// than a transcription-style near-zero setting.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// Nine sections of a short paragraph each fit comfortably; setting
    /// this too low truncates the JSON mid-object and fails the run.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// Fetch a stock photo per section. Default: true.
    ///
    /// Turning this off produces a text-only deck and skips the image API
    /// entirely (no image credential needed).
    pub fetch_images: bool,

    /// Concurrent image fetches. Default: 4.
    ///
    /// The nine fetches are independent; a small fan-out hides network
    /// latency without tripping the provider's burst limits.
    pub image_concurrency: usize,

    /// Per-call timeout for the content request in seconds. Default: 60.
    /// A timeout here is fatal — no deck exists without content.
    pub api_timeout_secs: u64,

    /// Per-image timeout in seconds. Default: 30.
    /// A timeout here fails that image only.
    pub image_timeout_secs: u64,

    /// Directory the two artifacts are written into. Default: ".".
    pub output_dir: PathBuf,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Cooperative cancellation. The pipeline checks this between stages
    /// and races it against in-flight network calls.
    pub cancel: CancellationToken,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            image_api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            image_api_url: DEFAULT_IMAGE_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
            fetch_images: true,
            image_concurrency: 4,
            api_timeout_secs: 60,
            image_timeout_secs: 30,
            output_dir: PathBuf::from("."),
            progress_callback: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for DeckConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeckConfig")
            .field("llm_api_key", &"<redacted>")
            .field("image_api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("image_api_url", &self.image_api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("fetch_images", &self.fetch_images)
            .field("image_concurrency", &self.image_concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("image_timeout_secs", &self.image_timeout_secs)
            .field("output_dir", &self.output_dir)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DeckProgressCallback>"),
            )
            .finish()
    }
}

impl DeckConfig {
    /// Create a new builder.
    pub fn builder() -> DeckConfigBuilder {
        DeckConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from the environment.
    ///
    /// Reads [`LLM_KEY_VAR`] and [`IMAGE_KEY_VAR`]. A missing or empty
    /// credential is a startup-time error — the pipeline never discovers a
    /// bad environment halfway through a run.
    pub fn from_env() -> Result<Self, DeckError> {
        let llm_api_key = require_env(
            LLM_KEY_VAR,
            "Get a key at https://novita.ai and export it before running.",
        )?;
        let image_api_key = require_env(
            IMAGE_KEY_VAR,
            "Use your Unsplash Access Key (not the Secret key), from https://unsplash.com/oauth/applications.",
        )?;
        Self::builder()
            .llm_api_key(llm_api_key)
            .image_api_key(image_api_key)
            .build()
    }
}

fn require_env(var: &'static str, hint: &'static str) -> Result<String, DeckError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DeckError::MissingCredential { var, hint }),
    }
}

/// Builder for [`DeckConfig`].
#[derive(Debug)]
pub struct DeckConfigBuilder {
    config: DeckConfig,
}

impl DeckConfigBuilder {
    pub fn llm_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.llm_api_key = key.into();
        self
    }

    pub fn image_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.image_api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn image_api_url(mut self, url: impl Into<String>) -> Self {
        self.config.image_api_url = url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn fetch_images(mut self, v: bool) -> Self {
        self.config.fetch_images = v;
        self
    }

    pub fn image_concurrency(mut self, n: usize) -> Self {
        self.config.image_concurrency = n.clamp(1, 9);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    pub fn image_timeout_secs(mut self, secs: u64) -> Self {
        self.config.image_timeout_secs = secs.max(1);
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.config.cancel = token;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Credentials are validated here, not at call time, so a misconfigured
    /// run fails before any network request is made.
    pub fn build(self) -> Result<DeckConfig, DeckError> {
        let c = &self.config;
        if c.llm_api_key.trim().is_empty() {
            return Err(DeckError::InvalidConfig(
                "llm_api_key must not be empty".into(),
            ));
        }
        if c.fetch_images && c.image_api_key.trim().is_empty() {
            return Err(DeckError::InvalidConfig(
                "image_api_key must not be empty while fetch_images is enabled".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DeckError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.base_url.trim().is_empty() || c.image_api_url.trim().is_empty() {
            return Err(DeckError::InvalidConfig("endpoint URLs must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = DeckConfig::builder()
            .llm_api_key("k")
            .image_api_key("i")
            .build()
            .unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.image_concurrency, 4);
        assert!(config.fetch_images);
    }

    #[test]
    fn missing_llm_key_is_rejected_at_build_time() {
        let err = DeckConfig::builder().image_api_key("i").build().unwrap_err();
        assert!(matches!(err, DeckError::InvalidConfig(_)));
    }

    #[test]
    fn image_key_not_needed_without_images() {
        let config = DeckConfig::builder()
            .llm_api_key("k")
            .fetch_images(false)
            .build()
            .unwrap();
        assert!(!config.fetch_images);
    }

    #[test]
    fn concurrency_is_clamped_to_section_count() {
        let config = DeckConfig::builder()
            .llm_api_key("k")
            .image_api_key("i")
            .image_concurrency(64)
            .build()
            .unwrap();
        assert_eq!(config.image_concurrency, 9);
    }

    #[test]
    fn debug_redacts_credentials() {
        let config = DeckConfig::builder()
            .llm_api_key("super-secret")
            .image_api_key("also-secret")
            .build()
            .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("also-secret"));
    }
}
