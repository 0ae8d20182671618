use crate::results::MetaSection;
use scraper::{Html, Selector};

/// Extracts SEO and social metadata from a page-source snapshot.
///
/// Missing fields stay `None`; nothing is defaulted to an empty-string
/// guess. No network access, cannot fail.
pub fn extract(html: &str) -> MetaSection {
    let doc = Html::parse_document(html);
    let mut section = MetaSection::default();

    let title_sel = Selector::parse("title").unwrap();
    section.title = doc
        .select(&title_sel)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let meta_sel = Selector::parse("meta").unwrap();
    for meta in doc.select(&meta_sel) {
        let name = meta
            .value()
            .attr("name")
            .or_else(|| meta.value().attr("property"));
        let (Some(name), Some(content)) = (name, meta.value().attr("content")) else {
            continue;
        };
        if content.is_empty() {
            continue;
        }

        let name = name.to_ascii_lowercase();
        match name.as_str() {
            "description" => section.description = Some(content.to_string()),
            "author" => section.author = Some(content.to_string()),
            "language" | "lang" => section.language = Some(content.to_string()),
            "keywords" => {
                section.keywords = content
                    .split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect();
            }
            _ => {}
        }

        if let Some(key) = name.strip_prefix("og:") {
            section
                .opengraph
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        } else if let Some(key) = name.strip_prefix("twitter:") {
            section
                .twitter
                .entry(key.to_string())
                .or_insert_with(|| content.to_string());
        }
    }

    let canonical_sel = Selector::parse(r#"link[rel="canonical"]"#).unwrap();
    section.canonical = doc
        .select(&canonical_sel)
        .next()
        .and_then(|l| l.value().attr("href"))
        .map(|s| s.to_string());

    let icon_sel = Selector::parse(r#"link[rel="icon"], link[rel="shortcut icon"]"#).unwrap();
    section.favicon = doc
        .select(&icon_sel)
        .next()
        .and_then(|l| l.value().attr("href"))
        .map(|s| s.to_string());

    // html lang attribute is the fallback when no language meta tag exists
    if section.language.is_none() {
        let html_sel = Selector::parse("html").unwrap();
        section.language = doc
            .select(&html_sel)
            .next()
            .and_then(|h| h.value().attr("lang"))
            .filter(|l| !l.is_empty())
            .map(|s| s.to_string());
    }

    section
}
