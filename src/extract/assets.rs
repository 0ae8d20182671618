use crate::results::{AssetKind, AssetRef};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Script run in the page to collect computed background-image values from
/// visible elements, in document order. URL parsing happens in Rust.
pub const BACKGROUND_PROBE_JS: &str = r#"
return (() => {
    const out = [];
    for (const el of document.querySelectorAll('*')) {
        const s = window.getComputedStyle(el);
        if (s.display === 'none' || s.visibility === 'hidden') continue;
        const bg = s.backgroundImage;
        if (bg && bg !== 'none') out.push(bg);
    }
    return out;
})();
"#;

/// Scans the page-source snapshot for img and inline-svg references.
/// Enumeration only; nothing is downloaded here. Order is document order,
/// with each img's srcset candidates following its src.
pub fn scan_refs(html: &str) -> Vec<AssetRef> {
    let doc = Html::parse_document(html);
    let mut refs = Vec::new();

    let img_sel = Selector::parse("img").unwrap();
    for img in doc.select(&img_sel) {
        let alt = img.value().attr("alt").unwrap_or("");

        let src = img
            .value()
            .attr("src")
            .or_else(|| img.value().attr("data-src"));
        if let Some(src) = src.filter(|s| !s.is_empty()) {
            refs.push(AssetRef::new(src, AssetKind::Image).with_alt(alt));
        }

        if let Some(srcset) = img.value().attr("srcset") {
            for candidate in srcset.split(',') {
                let url = candidate.trim().split_whitespace().next().unwrap_or("");
                if !url.is_empty() {
                    refs.push(AssetRef::new(url, AssetKind::Image).with_alt(alt));
                }
            }
        }
    }

    let svg_sel = Selector::parse("svg").unwrap();
    let mut svg_index = 0usize;
    for svg in doc.select(&svg_sel) {
        if has_svg_ancestor(&svg) {
            continue;
        }
        let mut r = AssetRef::new(format!("inline:svg:{}", svg_index), AssetKind::Svg);
        r.inline_markup = Some(svg.html());
        refs.push(r);
        svg_index += 1;
    }

    ::log::debug!("Asset scan found {} refs", refs.len());
    refs
}

fn has_svg_ancestor(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| a.value().name() == "svg")
}

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"url\(\s*["']?([^"')]+?)["']?\s*\)"#).unwrap())
}

/// Turns the raw background-image values from the probe into asset refs.
/// One declaration may carry several url() layers; all are kept.
pub fn background_refs(values: &[String]) -> Vec<AssetRef> {
    let mut refs = Vec::new();
    for value in values {
        for caps in url_regex().captures_iter(value) {
            let url = caps[1].trim();
            if !url.is_empty() {
                refs.push(AssetRef::new(url, AssetKind::Background));
            }
        }
    }
    refs
}
