use crate::extract::flatten_text;
use crate::results::{ContentSection, Heading, ListBlock, NavEntry, StructureEntry};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// Extracts the textual content hierarchy from a page-source snapshot.
///
/// Pure and read-only; the only degenerate case is a page with no body
/// content, which yields an empty section plus a warning message.
pub fn extract(html: &str, base: &Url) -> (ContentSection, Vec<String>) {
    let doc = Html::parse_document(html);
    let mut warnings = Vec::new();

    if !has_body_content(&doc) {
        warnings.push("page has no body content".to_string());
        return (ContentSection::default(), warnings);
    }

    let section = ContentSection {
        headings: extract_headings(&doc),
        paragraphs: extract_paragraphs(&doc),
        lists: extract_lists(&doc),
        navigation: extract_navigation(&doc, base),
        structure: extract_structure(&doc),
    };

    ::log::debug!(
        "Content: {} headings, {} paragraphs, {} lists, {} nav entries",
        section.headings.len(),
        section.paragraphs.len(),
        section.lists.len(),
        section.navigation.len()
    );

    (section, warnings)
}

fn has_body_content(doc: &Html) -> bool {
    let body = Selector::parse("body").unwrap();
    doc.select(&body)
        .next()
        .is_some_and(|b| b.children().any(|c| c.value().is_element()) || !flatten_text(&b).is_empty())
}

fn extract_headings(doc: &Html) -> Vec<Heading> {
    let sel = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();
    doc.select(&sel)
        .filter_map(|el| {
            let level = el.value().name().as_bytes().get(1).map(|b| *b - b'0')?;
            let text = flatten_text(&el);
            if text.is_empty() {
                None
            } else {
                Some(Heading { level, text })
            }
        })
        .collect()
}

fn extract_paragraphs(doc: &Html) -> Vec<String> {
    let sel = Selector::parse("p").unwrap();
    doc.select(&sel)
        .map(|el| flatten_text(&el))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Collects top-level lists. A list nested inside another list is not
/// emitted on its own; its item text is already flattened into the parent
/// item. Known limitation: nesting structure is not preserved.
fn extract_lists(doc: &Html) -> Vec<ListBlock> {
    let sel = Selector::parse("ul, ol").unwrap();
    doc.select(&sel)
        .filter(|el| !has_list_ancestor(el))
        .filter_map(|el| {
            let items: Vec<String> = el
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|child| child.value().name() == "li")
                .map(|li| flatten_text(&li))
                .filter(|text| !text.is_empty())
                .collect();
            if items.is_empty() {
                None
            } else {
                Some(ListBlock {
                    kind: el.value().name().to_string(),
                    items,
                })
            }
        })
        .collect()
}

fn has_list_ancestor(el: &ElementRef) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| matches!(a.value().name(), "ul" | "ol"))
}

/// Navigation entries come from landmark navigation containers; when a page
/// has none, the single container holding the most anchors stands in.
fn extract_navigation(doc: &Html, base: &Url) -> Vec<NavEntry> {
    let landmark = Selector::parse(r#"nav a, header a, [role="navigation"] a"#).unwrap();
    let anchors: Vec<ElementRef> = doc.select(&landmark).collect();

    let anchors = if !anchors.is_empty() {
        anchors
    } else {
        densest_link_container(doc)
    };

    anchors
        .into_iter()
        .filter_map(|a| {
            let text = flatten_text(&a);
            if text.is_empty() {
                return None;
            }
            let href = a
                .value()
                .attr("href")
                .and_then(|h| base.join(h).ok())
                .map(|u| u.to_string());
            Some(NavEntry { text, href })
        })
        .collect()
}

/// Finds the anchors of the parent element holding the most anchors.
/// Ties go to the first such parent in document order.
fn densest_link_container(doc: &Html) -> Vec<ElementRef> {
    let sel = Selector::parse("a").unwrap();
    let mut counts = HashMap::new();
    let mut order = Vec::new();

    let anchors: Vec<ElementRef> = doc.select(&sel).collect();
    for a in &anchors {
        if let Some(parent) = a.parent().and_then(ElementRef::wrap) {
            let id = parent.id();
            if !counts.contains_key(&id) {
                order.push(id);
            }
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    // Strictly-greater comparison keeps the first container on ties
    let mut best = None;
    let mut best_count = 0;
    for id in &order {
        let count = counts.get(id).copied().unwrap_or(0);
        if count > best_count {
            best_count = count;
            best = Some(*id);
        }
    }

    match best {
        Some(parent_id) => anchors
            .into_iter()
            .filter(|a| {
                a.parent()
                    .and_then(ElementRef::wrap)
                    .is_some_and(|p| p.id() == parent_id)
            })
            .collect(),
        None => Vec::new(),
    }
}

/// Landmark outline: section-like containers and the headings they hold.
/// header and footer are kept even without headings, matching how real
/// pages use them as pure chrome.
fn extract_structure(doc: &Html) -> Vec<StructureEntry> {
    let sel = Selector::parse("section, article, main, aside, header, footer").unwrap();
    let heading_sel = Selector::parse("h1, h2, h3, h4, h5, h6").unwrap();

    doc.select(&sel)
        .filter_map(|el| {
            let tag = el.value().name().to_string();
            let headings: Vec<String> = el
                .select(&heading_sel)
                .map(|h| flatten_text(&h))
                .filter(|t| !t.is_empty())
                .collect();
            if headings.is_empty() && tag != "header" && tag != "footer" {
                return None;
            }
            Some(StructureEntry {
                id: el.value().attr("id").map(|s| s.to_string()),
                tag,
                headings,
            })
        })
        .collect()
}
