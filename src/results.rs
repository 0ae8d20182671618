use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal outcome of one scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    /// Every section completed without degradation
    Success,

    /// The page loaded but at least one section or asset degraded
    Partial,

    /// The page never stabilized; no sections were produced
    Failure,
}

/// Which section a warning is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Page,
    Content,
    Assets,
    Tokens,
    Meta,
}

/// A non-fatal degradation recorded during a scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    /// Section the degradation is scoped to
    pub section: Section,

    /// Human-readable reason
    pub message: String,
}

impl Warning {
    pub fn new(section: Section, message: impl Into<String>) -> Self {
        Self {
            section,
            message: message.into(),
        }
    }
}

/// A heading with its h1-h6 level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 for h1 through 6 for h6
    pub level: u8,

    /// Flattened visible text
    pub text: String,
}

/// A single ul/ol list, nested lists flattened into their parent item text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlock {
    /// "ul" or "ol"
    pub kind: String,

    /// Item texts in document order
    pub items: Vec<String>,
}

/// One navigation link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavEntry {
    /// Link text
    pub text: String,

    /// Resolved absolute target, if the anchor had an href
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

/// A landmark container and the headings it holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureEntry {
    /// Tag name of the landmark (section, article, main, aside, header, footer)
    pub tag: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Heading texts inside this container, document order
    #[serde(default)]
    pub headings: Vec<String>,
}

/// Textual content hierarchy of the page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSection {
    /// Headings in document order
    #[serde(default)]
    pub headings: Vec<Heading>,

    /// Non-empty paragraph texts in document order
    #[serde(default)]
    pub paragraphs: Vec<String>,

    /// Top-level lists in document order
    #[serde(default)]
    pub lists: Vec<ListBlock>,

    /// Navigation entries in document order
    #[serde(default)]
    pub navigation: Vec<NavEntry>,

    /// Landmark outline of the page
    #[serde(default)]
    pub structure: Vec<StructureEntry>,
}

/// What kind of reference an asset scan produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    /// An img src or srcset candidate
    Image,

    /// Inline vector markup, self-contained
    Svg,

    /// A CSS background-image URL
    Background,
}

/// A raw asset reference as found in the page, before resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRef {
    /// The reference exactly as it appeared (may be relative or a data: URI)
    pub original_url: String,

    pub kind: AssetKind,

    /// alt attribute for img-derived refs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    /// Full element markup for inline SVG refs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_markup: Option<String>,
}

impl AssetRef {
    pub fn new(original_url: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            original_url: original_url.into(),
            kind,
            alt_text: None,
            inline_markup: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        let alt = alt.into();
        if !alt.is_empty() {
            self.alt_text = Some(alt);
        }
        self
    }
}

/// Terminal state of one asset record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Fetched,
    Skipped,
    Failed,
}

/// One deduplicated asset with its acquisition outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Canonical identity: host + path + sorted query, fragment stripped
    pub dedup_key: String,

    /// Absolute URL the asset resolved to
    pub resolved_url: String,

    pub kind: AssetKind,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,

    /// Where the bytes were written, when fetched and saved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,

    /// Final encoding of the stored bytes (e.g. "jpeg", "svg", "png")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    pub status: AssetStatus,

    /// Why a failed record failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// One histogram bucket for font sizes or weights
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramEntry {
    /// Computed value as reported by the browser (e.g. "16px", "700")
    pub value: String,

    /// Number of sampled elements carrying this value
    pub count: u32,
}

/// Color buckets keyed by the property the color was read from, plus the
/// heuristic primary bucket. Bucket assignment is policy, not a classifier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColorBuckets {
    #[serde(default)]
    pub primary: Vec<String>,

    #[serde(default)]
    pub text: Vec<String>,

    #[serde(default)]
    pub background: Vec<String>,

    #[serde(default)]
    pub border: Vec<String>,
}

/// Design tokens sampled from computed styles
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSection {
    pub colors: ColorBuckets,

    /// First resolvable family per distinct stack, order of first appearance
    #[serde(default)]
    pub font_families: Vec<String>,

    /// Font size histogram, count descending then first seen
    #[serde(default)]
    pub font_sizes: Vec<HistogramEntry>,

    /// Font weight histogram, count descending then first seen
    #[serde(default)]
    pub font_weights: Vec<HistogramEntry>,

    /// Spacing values sampled from container padding/margin/gap
    #[serde(default)]
    pub spacing: Vec<String>,

    /// Root custom properties, first-defined-wins
    #[serde(default)]
    pub css_variables: BTreeMap<String, String>,
}

/// SEO and social metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,

    /// og:* properties with the prefix stripped
    #[serde(default)]
    pub opengraph: BTreeMap<String, String>,

    /// twitter:* properties with the prefix stripped
    #[serde(default)]
    pub twitter: BTreeMap<String, String>,
}

/// The four result sections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectionData {
    pub content: ContentSection,
    pub assets: Vec<AssetRecord>,
    pub tokens: TokenSection,
    pub meta: MetaSection,
}

/// Final envelope returned to the caller for one scrape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub status: ScrapeStatus,

    /// The requested URL
    pub url: String,

    /// When the scrape finished
    pub timestamp: DateTime<Utc>,

    pub data: SectionData,

    /// Degradations in the order they were recorded
    #[serde(default)]
    pub warnings: Vec<Warning>,
}

impl ScrapeResult {
    /// Derive the terminal status from the collected warnings. Failure is
    /// decided earlier, at the stabilization boundary, never here.
    pub fn finish(url: String, data: SectionData, warnings: Vec<Warning>) -> Self {
        let status = if warnings.is_empty() {
            ScrapeStatus::Success
        } else {
            ScrapeStatus::Partial
        };
        Self {
            status,
            url,
            timestamp: Utc::now(),
            data,
            warnings,
        }
    }

    /// Envelope for a scrape whose page never stabilized
    pub fn failed(url: String, warnings: Vec<Warning>) -> Self {
        Self {
            status: ScrapeStatus::Failure,
            url,
            timestamp: Utc::now(),
            data: SectionData::default(),
            warnings,
        }
    }
}
