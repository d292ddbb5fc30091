//! Markup → plain text.
//!
//! [`ContentCleaner`] walks the parsed DOM, drops subtrees that never carry
//! article text (scripts, styles, navigation chrome, forms) and joins the
//! remaining text nodes. Whitespace runs collapse to a single space and the
//! result is cut to `max_length` characters.
//!
//! Input that does not look like markup skips parsing, so cleaning already
//! cleaned text is a no-op.

use scraper::{ElementRef, Html, Node};

/// Tags whose entire subtree is ignored.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "svg", "nav", "header", "footer", "aside", "form", "iframe",
    "template", "head", "button", "select",
];

/// Substrings that mark input as HTML rather than plain text.
const MARKUP_MARKERS: &[&str] = &["</", "/>", "<!doctype", "<!--", "<html", "<body", "<br", "<p>"];

#[derive(Debug, Clone, Copy)]
pub struct ContentCleaner {
    max_length: usize,
}

impl ContentCleaner {
    pub const DEFAULT_MAX_LENGTH: usize = 4000;

    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Extract readable text. Deterministic; malformed markup yields
    /// best-effort text or an empty string.
    pub fn clean(&self, raw: &str) -> String {
        let text = if looks_like_markup(raw) {
            html_to_text(raw)
        } else {
            raw.to_string()
        };
        truncate_chars(&collapse_whitespace(&text), self.max_length)
    }
}

impl Default for ContentCleaner {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_LENGTH)
    }
}

fn looks_like_markup(raw: &str) -> bool {
    let lower = raw.to_ascii_lowercase();
    MARKUP_MARKERS.iter().any(|m| lower.contains(m)) || has_opening_tag(&lower)
}

/// `<name` followed by `>`, `/` or whitespace, as in `<div>` or `<span class=x`.
fn has_opening_tag(text: &str) -> bool {
    text.match_indices('<').any(|(i, _)| {
        let rest = &text[i + 1..];
        let name_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        rest.starts_with(|c: char| c.is_ascii_alphabetic())
            && rest[name_len..].starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace())
    })
}

fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut parts = Vec::new();
    collect_element_text(document.root_element(), &mut parts);
    parts.join(" ")
}

fn collect_element_text(element: ElementRef<'_>, parts: &mut Vec<String>) {
    if SKIP_TAGS.contains(&element.value().name()) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let t = text.trim();
                if !t.is_empty() {
                    parts.push(t.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_element_text(child_el, parts);
                }
            }
            _ => {}
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_styles_and_chrome() {
        let html = r#"
        <html><head><title>Page</title></head><body>
            <nav><a href="/">Home</a></nav>
            <script>var x = 1;</script>
            <style>.foo { color: red; }</style>
            <article><h1>Chip demand</h1><p>Shares   rose
               sharply.</p></article>
            <footer>Copyright</footer>
        </body></html>
        "#;
        let text = ContentCleaner::default().clean(html);
        assert_eq!(text, "Chip demand Shares rose sharply.");
    }

    #[test]
    fn truncates_to_max_length_in_chars() {
        let cleaner = ContentCleaner::new(5);
        assert_eq!(cleaner.clean("<p>héllo wörld</p>"), "héllo");
        assert!(cleaner.clean("ééééééééé").chars().count() <= 5);
    }

    #[test]
    fn truncation_does_not_leave_trailing_space() {
        let cleaner = ContentCleaner::new(6);
        assert_eq!(cleaner.clean("hello world"), "hello");
    }

    #[test]
    fn empty_and_malformed_input() {
        let cleaner = ContentCleaner::default();
        assert_eq!(cleaner.clean(""), "");
        assert_eq!(cleaner.clean("<script>only()</script>"), "");
        assert_eq!(cleaner.clean("<div><p>unclosed <b>bold</div>"), "unclosed bold");
    }

    #[test]
    fn unclosed_fragments_are_parsed() {
        let cleaner = ContentCleaner::default();
        assert_eq!(cleaner.clean("<div>text"), "text");
        assert_eq!(cleaner.clean("<span class=\"x\">quote <em>here"), "quote here");
        assert_eq!(cleaner.clean("margin x<y"), "margin x<y");
    }

    #[test]
    fn decodes_entities() {
        let text = ContentCleaner::default().clean("<p>AT&amp;T &lt;up&gt;</p>");
        assert_eq!(text, "AT&T <up>");
    }

    #[test]
    fn cleaning_plain_text_is_idempotent() {
        let cleaner = ContentCleaner::new(20);
        for x in [
            "  plain\ttext\n with   gaps  ",
            "a < b and c > d",
            "Revenue rose 12% year over year, beating estimates",
            "",
        ] {
            let once = cleaner.clean(x);
            assert_eq!(cleaner.clean(&once), once, "input: {x:?}");
        }
    }
}
