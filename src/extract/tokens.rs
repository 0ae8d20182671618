use crate::results::{ColorBuckets, HistogramEntry, TokenSection};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Script run in the page to sample computed styles and root custom
/// properties. Deliberately a thin probe: every normalization and bucketing
/// decision lives on the Rust side where it can be unit tested.
pub const TOKEN_PROBE_JS: &str = r#"
return (() => {
    const vars = [];
    const rootStyles = window.getComputedStyle(document.documentElement);
    for (let i = 0; i < rootStyles.length; i++) {
        const prop = rootStyles[i];
        if (prop.startsWith('--')) {
            vars.push([prop, rootStyles.getPropertyValue(prop).trim()]);
        }
    }

    const pick = (sel) => Array.from(document.querySelectorAll(sel));
    const els = [
        ...pick('h1, h2, h3, h4, h5, h6'),
        ...pick('p'),
        ...pick('a'),
        ...pick('button'),
        ...pick('[class*="button"], [class*="btn"]'),
        document.body,
        document.querySelector('header'),
        document.querySelector('nav'),
        document.querySelector('footer')
    ].filter(Boolean);

    const samples = [];
    for (const el of els.slice(0, 400)) {
        const s = window.getComputedStyle(el);
        samples.push({
            tag: el.tagName.toLowerCase(),
            classes: typeof el.className === 'string' ? el.className : '',
            color: s.color,
            background_color: s.backgroundColor,
            border_color: s.borderTopColor,
            font_family: s.fontFamily,
            font_size: s.fontSize,
            font_weight: s.fontWeight
        });
    }

    const spacing = [];
    const containers = document.querySelectorAll(
        'section, div[class*="container"], div[class*="wrapper"]');
    for (const el of containers) {
        const s = window.getComputedStyle(el);
        spacing.push({ padding: s.padding, margin: s.margin, gap: s.gap });
    }

    return { css_variables: vars, samples: samples, spacing: spacing };
})();
"#;

/// Raw probe output, straight from the page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenProbe {
    /// (name, value) pairs in the order the browser reported them
    #[serde(default)]
    pub css_variables: Vec<(String, String)>,

    #[serde(default)]
    pub samples: Vec<StyleSample>,

    #[serde(default)]
    pub spacing: Vec<SpacingSample>,
}

/// Computed style of one sampled element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StyleSample {
    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub classes: String,

    #[serde(default)]
    pub color: String,

    #[serde(default)]
    pub background_color: String,

    #[serde(default)]
    pub border_color: String,

    #[serde(default)]
    pub font_family: String,

    #[serde(default)]
    pub font_size: String,

    #[serde(default)]
    pub font_weight: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpacingSample {
    #[serde(default)]
    pub padding: String,

    #[serde(default)]
    pub margin: String,

    #[serde(default)]
    pub gap: String,
}

/// How many times a color must recur on interactive elements before it is
/// promoted to the primary bucket. A heuristic, not a classifier; callers
/// should rely on bucket membership, not exact bucket choice.
const PRIMARY_THRESHOLD: u32 = 2;

/// Cap per color bucket and for the spacing list
const BUCKET_CAP: usize = 10;
const SPACING_CAP: usize = 15;

/// Builds the token section from a raw probe. Pure.
pub fn build_token_section(probe: &TokenProbe) -> TokenSection {
    let mut css_variables = BTreeMap::new();
    for (name, value) in &probe.css_variables {
        // First-defined-wins; true cascade resolution is not attempted
        css_variables
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }

    let mut text = ColorCounter::new();
    let mut background = ColorCounter::new();
    let mut border = ColorCounter::new();
    let mut primary = ColorCounter::new();

    let mut families = Vec::new();
    let mut sizes = Counter::new();
    let mut weights = Counter::new();

    for sample in &probe.samples {
        let color = normalize_color(&sample.color);
        let bg = normalize_color(&sample.background_color);
        let border_color = normalize_color(&sample.border_color);

        if is_text_element(&sample.tag) {
            text.add(color.clone());
        }
        background.add(bg.clone());
        border.add(border_color);

        if is_interactive(&sample.tag, &sample.classes) {
            primary.add(color);
            primary.add(bg);
        }

        if let Some(family) = first_family(&sample.font_family) {
            if !families.contains(&family) {
                families.push(family);
            }
        }
        if !sample.font_size.is_empty() {
            sizes.add(sample.font_size.clone());
        }
        if !sample.font_weight.is_empty() {
            weights.add(sample.font_weight.clone());
        }
    }

    let mut spacing = Vec::new();
    for s in &probe.spacing {
        for value in [&s.padding, &s.margin, &s.gap] {
            if !value.is_empty() && value.as_str() != "0px" && !spacing.contains(value) {
                spacing.push(value.clone());
            }
        }
    }
    spacing.truncate(SPACING_CAP);

    TokenSection {
        colors: ColorBuckets {
            primary: primary.ranked_at_least(PRIMARY_THRESHOLD, BUCKET_CAP),
            text: text.ranked(BUCKET_CAP),
            background: background.ranked(BUCKET_CAP),
            border: border.ranked(BUCKET_CAP),
        },
        font_families: families,
        font_sizes: sizes.histogram(),
        font_weights: weights.histogram(),
        spacing,
        css_variables,
    }
}

fn is_text_element(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "span")
}

fn is_interactive(tag: &str, classes: &str) -> bool {
    matches!(tag, "a" | "button")
        || classes.contains("btn")
        || classes.contains("button")
}

/// First resolvable family of a computed font-family stack, quotes stripped
pub fn first_family(stack: &str) -> Option<String> {
    let first = stack.split(',').next()?.trim();
    let family = first.trim_matches(|c| c == '"' || c == '\'').trim();
    if family.is_empty() {
        None
    } else {
        Some(family.to_string())
    }
}

fn rgb_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*([0-9.]+)\s*)?\)$")
            .unwrap()
    })
}

/// Normalizes a computed color to lowercase hex when fully opaque, a
/// lowercase rgba() string otherwise. Fully transparent colors and empty
/// values normalize to None.
pub fn normalize_color(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("transparent") {
        return None;
    }

    if let Some(caps) = rgb_regex().captures(value) {
        let r: u8 = caps[1].parse().ok()?;
        let g: u8 = caps[2].parse().ok()?;
        let b: u8 = caps[3].parse().ok()?;
        let a: f64 = caps
            .get(4)
            .map(|m| m.as_str().parse().ok())
            .unwrap_or(Some(1.0))?;

        if a <= 0.0 {
            return None;
        }
        if a >= 1.0 {
            return Some(format!("#{:02x}{:02x}{:02x}", r, g, b));
        }
        return Some(format!("rgba({}, {}, {}, {})", r, g, b, a));
    }

    // Hex and named colors pass through lowercased
    Some(value.to_ascii_lowercase())
}

/// Frequency counter preserving first-seen order
struct Counter {
    order: Vec<String>,
    counts: std::collections::HashMap<String, u32>,
}

impl Counter {
    fn new() -> Self {
        Self {
            order: Vec::new(),
            counts: std::collections::HashMap::new(),
        }
    }

    fn add(&mut self, value: String) {
        if !self.counts.contains_key(&value) {
            self.order.push(value.clone());
        }
        *self.counts.entry(value).or_insert(0) += 1;
    }

    /// Entries ordered by descending count, first-seen breaking ties
    fn histogram(&self) -> Vec<HistogramEntry> {
        let mut entries: Vec<HistogramEntry> = self
            .order
            .iter()
            .map(|value| HistogramEntry {
                value: value.clone(),
                count: self.counts[value],
            })
            .collect();
        // stable sort keeps first-seen order inside equal counts
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}

/// Counter over already-normalized colors, skipping unnormalizable input
struct ColorCounter(Counter);

impl ColorCounter {
    fn new() -> Self {
        Self(Counter::new())
    }

    fn add(&mut self, color: Option<String>) {
        if let Some(color) = color {
            self.0.add(color);
        }
    }

    fn ranked(&self, cap: usize) -> Vec<String> {
        self.0
            .histogram()
            .into_iter()
            .take(cap)
            .map(|e| e.value)
            .collect()
    }

    fn ranked_at_least(&self, threshold: u32, cap: usize) -> Vec<String> {
        self.0
            .histogram()
            .into_iter()
            .filter(|e| e.count >= threshold)
            .take(cap)
            .map(|e| e.value)
            .collect()
    }
}
