pub mod assets;
pub mod content;
pub mod meta;
pub mod tokens;

#[cfg(test)]
mod tests;

use scraper::ElementRef;

/// Flattens an element's text nodes into one whitespace-normalized string.
/// Text nodes are concatenated as-is so punctuation after an inline element
/// stays attached to it.
pub(crate) fn flatten_text(el: &ElementRef) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
