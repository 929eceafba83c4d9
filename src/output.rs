//! Deck data model: sections, generated content, fetched images, stats.
//!
//! Everything here is created during one `generate` run and dropped when the
//! run ends — there is no persistent store and no edit operation on a deck
//! that has already been produced. The two artifacts written to disk (PDF +
//! JSON export) are projections of [`PitchDeck`], not live state.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ImageError;

/// The nine fixed pitch-deck sections, in deck order.
///
/// The order of [`Section::ALL`] is the order of pages in the rendered
/// document and of keys in the JSON export. The display names double as the
/// export keys, so an export re-parses into the same [`DeckContent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Problem,
    Solution,
    MarketAnalysis,
    Competitors,
    UniqueSellingProposition,
    BusinessModel,
    FinancialProjections,
    TeamOverview,
    CallToAction,
}

impl Section {
    /// All sections in deck order.
    pub const ALL: [Section; 9] = [
        Section::Problem,
        Section::Solution,
        Section::MarketAnalysis,
        Section::Competitors,
        Section::UniqueSellingProposition,
        Section::BusinessModel,
        Section::FinancialProjections,
        Section::TeamOverview,
        Section::CallToAction,
    ];

    /// Display name, also the JSON export key and the key the model is
    /// instructed to produce.
    pub fn title(self) -> &'static str {
        match self {
            Section::Problem => "Problem",
            Section::Solution => "Solution",
            Section::MarketAnalysis => "Market Analysis",
            Section::Competitors => "Competitors",
            Section::UniqueSellingProposition => "Unique Selling Proposition (USP)",
            Section::BusinessModel => "Business Model",
            Section::FinancialProjections => "Financial Projections",
            Section::TeamOverview => "Team Overview",
            Section::CallToAction => "Call to Action",
        }
    }

    /// Static stock-photo search keyword for this section.
    ///
    /// Searching the raw section title returns poor matches ("Problem" finds
    /// math worksheets); these queries are tuned for business imagery.
    pub fn search_query(self) -> &'static str {
        match self {
            Section::Problem => "business problem",
            Section::Solution => "innovative solution",
            Section::MarketAnalysis => "market growth chart",
            Section::Competitors => "business competition",
            Section::UniqueSellingProposition => "unique idea lightbulb",
            Section::BusinessModel => "business strategy meeting",
            Section::FinancialProjections => "financial growth graph",
            Section::TeamOverview => "startup team office",
            Section::CallToAction => "business handshake",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Generated text for one section: a short paragraph or a bulleted list.
///
/// The model is free to answer either shape per section; both round-trip
/// through the JSON export unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionBody {
    /// A paragraph of prose.
    Text(String),
    /// An ordered sequence of bullet points.
    Bullets(Vec<String>),
}

impl SectionBody {
    /// True when the body carries no visible text at all.
    pub fn is_empty(&self) -> bool {
        match self {
            SectionBody::Text(t) => t.trim().is_empty(),
            SectionBody::Bullets(items) => items.iter().all(|i| i.trim().is_empty()),
        }
    }
}

/// The complete generated content: one body per section, fixed key set.
///
/// Field order is deck order, which fixes the key order of the JSON export
/// and makes repeated exports of identical content byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckContent {
    #[serde(rename = "Problem")]
    pub problem: SectionBody,
    #[serde(rename = "Solution")]
    pub solution: SectionBody,
    #[serde(rename = "Market Analysis")]
    pub market_analysis: SectionBody,
    #[serde(rename = "Competitors")]
    pub competitors: SectionBody,
    #[serde(rename = "Unique Selling Proposition (USP)")]
    pub unique_selling_proposition: SectionBody,
    #[serde(rename = "Business Model")]
    pub business_model: SectionBody,
    #[serde(rename = "Financial Projections")]
    pub financial_projections: SectionBody,
    #[serde(rename = "Team Overview")]
    pub team_overview: SectionBody,
    #[serde(rename = "Call to Action")]
    pub call_to_action: SectionBody,
}

impl DeckContent {
    /// Body for one section.
    pub fn get(&self, section: Section) -> &SectionBody {
        match section {
            Section::Problem => &self.problem,
            Section::Solution => &self.solution,
            Section::MarketAnalysis => &self.market_analysis,
            Section::Competitors => &self.competitors,
            Section::UniqueSellingProposition => &self.unique_selling_proposition,
            Section::BusinessModel => &self.business_model,
            Section::FinancialProjections => &self.financial_projections,
            Section::TeamOverview => &self.team_overview,
            Section::CallToAction => &self.call_to_action,
        }
    }

    /// Iterate `(section, body)` pairs in deck order.
    pub fn iter(&self) -> impl Iterator<Item = (Section, &SectionBody)> {
        Section::ALL.iter().map(move |s| (*s, self.get(*s)))
    }
}

/// A downloaded stock photo plus the attribution the provider's terms
/// require. Lives only inside one [`PitchDeck`]; the bytes are embedded
/// into the PDF and then dropped with the deck.
#[derive(Clone)]
pub struct SectionImage {
    /// Raw encoded image bytes as downloaded (JPEG or PNG).
    pub bytes: Vec<u8>,
    /// Photographer name, shown beneath the image.
    pub author: String,
    /// Photo page URL at the provider.
    pub source_url: String,
    /// Pixel dimensions, captured while validating the download.
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for SectionImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SectionImage")
            .field("bytes", &format_args!("{} bytes", self.bytes.len()))
            .field("author", &self.author)
            .field("source_url", &self.source_url)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// The full output aggregate of one run: content, images, per-image
/// failures, and timing stats. Immutable after creation.
#[derive(Debug)]
pub struct PitchDeck {
    /// The idea text the deck was generated from.
    pub idea: String,
    /// Generated text for all nine sections.
    pub content: DeckContent,
    /// Fetched photos, keyed by section. Sections whose fetch failed are
    /// simply absent; the document renders with an empty image slot.
    pub images: BTreeMap<Section, SectionImage>,
    /// Why each absent image is absent.
    pub image_failures: BTreeMap<Section, ImageError>,
    /// Run statistics.
    pub stats: DeckStats,
}

/// Statistics for one generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeckStats {
    /// Photos successfully fetched (0..=9).
    pub images_fetched: usize,
    /// Photos that soft-failed (0..=9).
    pub images_failed: usize,
    /// Prompt tokens reported by the content endpoint.
    pub prompt_tokens: u32,
    /// Completion tokens reported by the content endpoint.
    pub completion_tokens: u32,
    /// Wall-clock time of the content-generation call.
    pub content_duration_ms: u64,
    /// Wall-clock time of the image-fetch stage.
    pub images_duration_ms: u64,
    /// Total run time, excluding file writes.
    pub total_duration_ms: u64,
}

/// The two artifact paths written by
/// [`crate::generate::generate_to_files`], plus the run stats.
#[derive(Debug)]
pub struct DeckArtifacts {
    pub pdf_path: PathBuf,
    pub export_path: PathBuf,
    pub stats: DeckStats,
}

/// Derive a deterministic file-name slug from the idea text.
///
/// Lowercases, collapses every non-alphanumeric run into a single `_`, and
/// caps the result at 50 characters so derived paths stay well inside
/// filesystem limits.
pub fn slugify(idea: &str) -> String {
    let mut slug = String::with_capacity(50);
    let mut prev_sep = true;
    for c in idea.trim().to_lowercase().chars() {
        if slug.len() >= 50 {
            break;
        }
        if c.is_ascii_alphanumeric() {
            slug.push(c);
            prev_sep = false;
        } else if !prev_sep {
            slug.push('_');
            prev_sep = true;
        }
    }
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug.to_string()
    }
}

/// Sibling output paths for an idea: `<slug>_pitch_deck.pdf` and
/// `<slug>_pitch_deck.json` in `dir`.
pub fn deck_paths(dir: &Path, idea: &str) -> (PathBuf, PathBuf) {
    let slug = slugify(idea);
    (
        dir.join(format!("{slug}_pitch_deck.pdf")),
        dir.join(format!("{slug}_pitch_deck.json")),
    )
}
