//! CLI binary for deckforge.
//!
//! A thin shim over the library crate that maps CLI flags to `DeckConfig`,
//! drives the progress bar, and turns errors into single user-facing
//! messages with the right exit code (0 success, 1 failure, 130 cancelled).

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use deckforge::config::{IMAGE_KEY_VAR, LLM_KEY_VAR};
use deckforge::{
    generate_to_files, DeckConfig, DeckError, DeckProgressCallback, ProgressCallback, Section,
    Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner during content generation that
/// becomes a nine-slot bar while photos download, with per-event log lines
/// printed above it. Image events can arrive out of order (concurrent
/// fetches); the bar only counts them.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(Section::ALL.len() as u64);
        bar.set_style(Self::spinner_style());
        bar.set_prefix("Starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"])
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:36.green/238}] {pos}/{len} photos  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"])
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl DeckProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        match stage {
            Stage::Content => {
                self.bar.set_style(Self::spinner_style());
                self.bar.set_prefix("Content");
                self.bar.set_message("asking the model…");
            }
            Stage::Images => {
                self.bar.set_style(Self::bar_style());
                self.bar.set_prefix("Photos");
                self.bar.set_message(String::new());
                self.bar.set_position(0);
            }
            Stage::Render => {
                self.bar.set_style(Self::spinner_style());
                self.bar.set_prefix("Render");
                self.bar.set_message("laying out the document…");
            }
            Stage::Export => {
                self.bar.set_prefix("Export");
                self.bar.set_message("writing files…");
            }
        }
    }

    fn on_content_complete(&self, prompt_tokens: u32, completion_tokens: u32) {
        self.bar.println(format!(
            "  {} Slide content generated  {}",
            green("✓"),
            dim(&format!("{prompt_tokens} tokens in / {completion_tokens} out")),
        ));
    }

    fn on_image_start(&self, section: Section) {
        self.bar.set_message(section.to_string());
    }

    fn on_image_complete(&self, section: Section, bytes: usize) {
        self.bar.println(format!(
            "  {} {:<34} {}",
            green("✓"),
            section.to_string(),
            dim(&format!("{} KB", bytes / 1024)),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, section: Section, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if error.chars().count() > 70 {
            format!("{}…", error.chars().take(69).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<34} {}",
            red("✗"),
            section.to_string(),
            red(&msg),
        ));
        self.bar.inc(1);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive: prompts for the idea (and keys, if not in the environment)
  deckforge

  # One-shot
  deckforge "an AI-powered dog walker" -o decks/

  # Text-only deck, no image API needed
  deckforge --no-images "a subscription service for houseplants"

  # Different OpenAI-compatible endpoint and model
  deckforge --base-url https://api.openai.com/v1 --model gpt-4o-mini "..."

OUTPUT:
  <slug>_pitch_deck.pdf    the rendered deck (title page + nine sections)
  <slug>_pitch_deck.json   the generated text, editable and re-parseable

ENVIRONMENT VARIABLES:
  NOVITA_API_KEY           content-generation API key (required)
  UNSPLASH_ACCESS_KEY      Unsplash Access Key (required unless --no-images)
  DECKFORGE_MODEL          override the content model
  DECKFORGE_BASE_URL       override the content endpoint
  DECKFORGE_OUTPUT_DIR     default output directory

EXIT CODES:
  0  success        1  failure        130  cancelled (Ctrl-C)
"#;

/// Generate a startup pitch deck from a one-line idea.
#[derive(Parser, Debug)]
#[command(
    name = "deckforge",
    version,
    about = "Generate a startup pitch deck (PDF + JSON) from a one-line idea",
    long_about = "Generate a startup pitch deck from a one-line idea: structured slide content \
from an OpenAI-compatible LLM endpoint, one stock photo per section from Unsplash, a branded \
multi-page PDF, and an editable JSON export.",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Startup idea. Prompted for interactively when omitted.
    idea: Option<String>,

    /// Directory for the generated PDF and JSON export.
    #[arg(short, long, env = "DECKFORGE_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Content model ID.
    #[arg(long, env = "DECKFORGE_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible content endpoint base URL.
    #[arg(long, env = "DECKFORGE_BASE_URL")]
    base_url: Option<String>,

    /// Skip stock photos and produce a text-only deck.
    #[arg(long, env = "DECKFORGE_NO_IMAGES")]
    no_images: bool,

    /// Concurrent photo fetches (1-9).
    #[arg(long, env = "DECKFORGE_IMAGE_CONCURRENCY", default_value_t = 4)]
    image_concurrency: usize,

    /// Sampling temperature (0.0-2.0).
    #[arg(long, env = "DECKFORGE_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Max tokens the model may generate.
    #[arg(long, env = "DECKFORGE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Content request timeout in seconds.
    #[arg(long, env = "DECKFORGE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Per-photo timeout in seconds.
    #[arg(long, env = "DECKFORGE_IMAGE_TIMEOUT", default_value_t = 30)]
    image_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "DECKFORGE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DECKFORGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DECKFORGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", red("✗"));
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the progress bar owns the
    // terminal; the bar provides all the feedback that matters.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Gather inputs (idea + credentials) before any network work ──────
    let idea = match cli.idea.clone() {
        Some(idea) => idea,
        None => prompt_line("Enter your startup idea: ")?,
    };
    if idea.trim().is_empty() {
        bail!("The startup idea must not be empty.");
    }

    let llm_api_key = resolve_credential(LLM_KEY_VAR, "Novita AI API key")?;
    let image_api_key = if cli.no_images {
        String::new()
    } else {
        resolve_credential(IMAGE_KEY_VAR, "Unsplash Access Key")?
    };

    // ── Cancellation: first Ctrl-C cancels the run cleanly ──────────────
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };

    let mut builder = DeckConfig::builder()
        .llm_api_key(llm_api_key)
        .image_api_key(image_api_key)
        .fetch_images(!cli.no_images)
        .image_concurrency(cli.image_concurrency)
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout)
        .image_timeout_secs(cli.image_timeout)
        .output_dir(&cli.output_dir)
        .cancel_token(cancel.clone());
    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref base_url) = cli.base_url {
        builder = builder.base_url(base_url.as_str());
    }
    if let Some(ref cb) = progress {
        builder = builder.progress_callback(Arc::clone(cb) as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Run the pipeline ─────────────────────────────────────────────────
    let result = generate_to_files(&idea, &config).await;
    if let Some(ref cb) = progress {
        cb.finish();
    }

    match result {
        Ok(artifacts) => {
            if !cli.quiet {
                let stats = &artifacts.stats;
                eprintln!(
                    "{} Pitch deck generated  {}",
                    green("✔"),
                    dim(&format!(
                        "{}/{} photos, {}ms",
                        stats.images_fetched,
                        Section::ALL.len(),
                        stats.total_duration_ms
                    )),
                );
                if stats.images_failed > 0 {
                    eprintln!(
                        "   {}",
                        cyan(&format!(
                            "{} photo slot(s) left empty — see log for details",
                            stats.images_failed
                        ))
                    );
                }
            }
            println!("{}", bold(&artifacts.pdf_path.display().to_string()));
            println!("{}", bold(&artifacts.export_path.display().to_string()));
            Ok(ExitCode::SUCCESS)
        }
        Err(DeckError::Cancelled) => {
            eprintln!("{} Cancelled — no files were written.", cyan("⚠"));
            Ok(ExitCode::from(130))
        }
        Err(e) => {
            eprintln!("{} {e}", red("✗"));
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Read a credential from the environment, falling back to an interactive
/// prompt on a TTY. Missing credentials fail here, before any network call.
fn resolve_credential(var: &'static str, label: &str) -> Result<String> {
    if let Ok(value) = std::env::var(var) {
        if !value.trim().is_empty() {
            return Ok(value);
        }
    }
    if io::stdin().is_terminal() {
        let value = prompt_line(&format!("Enter your {label}: "))?;
        if !value.trim().is_empty() {
            return Ok(value.trim().to_string());
        }
    }
    bail!("Missing {label}: set the {var} environment variable.");
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}");
    io::stderr().flush().ok();
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}
