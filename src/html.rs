//! Thin view over a parsed HTML document.
//!
//! The scrapers only need three things from a page: an element looked up by
//! tag and `id`, every anchor as `(text, href)`, and the flattened text. This
//! module hides `scraper` behind exactly that surface.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

/// A hyperlink as it appears on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Visible text, each text node trimmed, then concatenated.
    pub text: String,
    /// Raw `href` attribute, or empty if absent.
    pub href: String,
}

/// A parsed HTML document.
pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(body: &str) -> Self {
        Self {
            document: Html::parse_document(body),
        }
    }

    /// First `<tag id="...">` element, if any.
    pub fn find_by_id(&self, tag: &str, id: &str) -> Option<ElementRef<'_>> {
        let selector = Selector::parse(tag).ok()?;
        self.document
            .select(&selector)
            .find(|el| el.value().id() == Some(id))
    }

    /// Every anchor in the document, in document order.
    pub fn anchors(&self) -> Vec<Anchor> {
        anchors_in(self.document.root_element())
    }

    /// All text nodes joined by newlines.
    pub fn text(&self) -> String {
        self.document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Every anchor below `element`, in document order.
pub fn anchors_in(element: ElementRef<'_>) -> Vec<Anchor> {
    element
        .select(&ANCHOR)
        .map(|a| Anchor {
            text: a.text().map(str::trim).collect(),
            href: a.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<html><body>
        <p>Intro <a href="/about/"> About <b>us</b> </a></p>
        <table id="listing"><tr><td><a href="https://a.test/">A</a></td></tr></table>
        <table id="other"></table>
    </body></html>"#;

    #[test]
    fn test_find_by_id() {
        let page = Page::parse(DOC);
        let table = page.find_by_id("table", "listing").unwrap();
        assert_eq!(anchors_in(table).len(), 1);
        assert!(page.find_by_id("table", "missing").is_none());
        assert!(page.find_by_id("div", "listing").is_none());
    }

    #[test]
    fn test_anchors_trim_and_concatenate_text() {
        let page = Page::parse(DOC);
        let anchors = page.anchors();
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0].text, "Aboutus");
        assert_eq!(anchors[0].href, "/about/");
        assert_eq!(anchors[1].text, "A");
    }

    #[test]
    fn test_text_splits_nodes_on_newlines() {
        let page = Page::parse("<p><strong>Country:</strong> USA</p>");
        let text = page.text();
        assert!(text.contains("Country:\n USA"), "{text:?}");
    }
}
