//! Text flattening shared by the DOM extractor and the field transformer.
//!
//! Naive `element.text()` concatenation collapses `<br>` and paragraph boundaries,
//! which destroys the structure of long-form fields like summaries. The walkers here
//! turn break markup into `\n` first and only then normalize whitespace.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};

static INLINE_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\u{a0}\r\x0B\x0C]+").expect("valid inline whitespace regex"));

/// Opening, closing, comment or doctype tag. A bare `<` ("I <3 this") is prose.
static MARKUP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[a-zA-Z/!]").expect("valid markup tag regex"));

const PARAGRAPH_TAGS: &[&str] = &["p", "blockquote"];
const BLOCK_TAGS: &[&str] = &["div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "dd", "dt"];
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript"];

/// Flatten an element to plain text, keeping line breaks from `<br>` and block boundaries.
pub fn element_text_with_breaks(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    tidy_text(&out)
}

/// Flatten a plain-text or HTML-ish string. Markup-free input only gets whitespace
/// tidied, so its newlines survive.
pub fn html_fragment_to_text(input: &str) -> String {
    if !MARKUP_TAG.is_match(input) {
        return tidy_text(input);
    }
    let fragment = Html::parse_fragment(input);
    element_text_with_breaks(fragment.root_element())
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // Source newlines are formatting, not content
                let flattened = text.replace(['\n', '\r'], " ");
                out.push_str(&flattened);
            }
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                if SKIPPED_TAGS.contains(&name)
                    || (name == "sup" && el.classes().any(|c| c == "reference"))
                {
                    continue;
                }
                let Some(child_element) = ElementRef::wrap(child) else {
                    continue;
                };
                if PARAGRAPH_TAGS.contains(&name) {
                    out.push_str("\n\n");
                    collect_text(child_element, out);
                    out.push_str("\n\n");
                } else if BLOCK_TAGS.contains(&name) {
                    out.push('\n');
                    collect_text(child_element, out);
                    out.push('\n');
                } else {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

/// Collapse runs of inline whitespace, trim each line, and keep at most one blank line
/// between paragraphs.
pub fn tidy_text(input: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;
    for line in input.lines() {
        let line = INLINE_WHITESPACE.replace_all(line, " ").trim().to_string();
        if line.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(line);
            previous_blank = false;
        }
    }
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}

/// Single-line text: every whitespace run becomes one space.
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, whitespace-collapsed value, or `None` when nothing is left.
pub fn non_blank<S: AsRef<str>>(value: Option<S>) -> Option<String> {
    value
        .map(|v| collapse_whitespace(v.as_ref()))
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_br_becomes_newline() {
        let html = Html::parse_fragment("<div id=\"s\">First line<br>Second   line<br/>Third</div>");
        let selector = Selector::parse("#s").unwrap();
        let element = html.select(&selector).next().unwrap();
        assert_eq!(
            element_text_with_breaks(element),
            "First line\nSecond line\nThird"
        );
    }

    #[test]
    fn test_paragraphs_are_separated_by_blank_line() {
        let text = html_fragment_to_text("<p>One\n  wrapped</p><p>Two</p>");
        assert_eq!(text, "One wrapped\n\nTwo");
    }

    #[test]
    fn test_source_newlines_do_not_split_lines() {
        let text = html_fragment_to_text("<span>a\nb</span>");
        assert_eq!(text, "a b");
    }

    #[test]
    fn test_plain_text_keeps_newlines() {
        assert_eq!(html_fragment_to_text("  a  b \n\n\n c "), "a b\n\nc");
    }

    #[test]
    fn test_angle_bracket_in_prose_is_not_markup() {
        assert_eq!(
            html_fragment_to_text("Line one\nLine two\n\nI <3 this book, 2 < 3"),
            "Line one\nLine two\n\nI <3 this book, 2 < 3"
        );
    }

    #[test]
    fn test_reference_markers_and_scripts_are_dropped() {
        let text = html_fragment_to_text(
            "<p>Fact<sup class=\"reference\">[1]</sup> stated.<script>var x;</script></p>",
        );
        assert_eq!(text, "Fact stated.");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Tor \n Books ")), Some("Tor Books".to_string()));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None::<&str>), None);
    }
}
