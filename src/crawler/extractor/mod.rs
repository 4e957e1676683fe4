#[cfg(test)]
mod tests;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Extract the readable text of an HTML page.
///
/// The first `main` element is used when present, otherwise `body`, otherwise
/// the document root. `script` and `style` subtrees are dropped; every
/// remaining text node is trimmed, empty nodes are discarded and the rest are
/// joined with newlines.
#[inline]
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = find_content_root(&document);

    let mut lines = Vec::new();
    collect_text(root, &mut lines);

    debug!("Extracted {} text nodes", lines.len());
    lines.join("\n")
}

fn find_content_root(document: &Html) -> ElementRef<'_> {
    let main_selector = Selector::parse("main").expect("valid selector");
    let body_selector = Selector::parse("body").expect("valid selector");

    document
        .select(&main_selector)
        .next()
        .or_else(|| document.select(&body_selector).next())
        .unwrap_or_else(|| document.root_element())
}

fn collect_text<'a>(element: ElementRef<'a>, lines: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            match child_element.value().name() {
                "script" | "style" => {}
                _ => collect_text(child_element, lines),
            }
        } else if let Some(text_node) = child.value().as_text() {
            let text = text_node.trim();
            if !text.is_empty() {
                lines.push(text);
            }
        }
    }
}
