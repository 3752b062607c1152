use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{CrawlError, Result};

/// Detached copy of one matched element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementSnapshot {
    /// Visible text, one line per block element.
    pub text: String,
    /// Outer HTML, for sub-selection.
    pub html: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementSnapshot {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Elements inside this one matching `selector`.
    pub fn select(&self, selector: &str) -> Result<Vec<ElementSnapshot>> {
        select_snapshots(&self.html, selector)
    }
}

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| CrawlError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Parse `html` and snapshot every element matching `selector`, in document order.
pub fn select_snapshots(html: &str, selector: &str) -> Result<Vec<ElementSnapshot>> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(html);
    Ok(document.select(&selector).map(snapshot).collect())
}

fn snapshot(element: ElementRef<'_>) -> ElementSnapshot {
    ElementSnapshot {
        text: inner_text(element),
        html: element.html(),
        attributes: element
            .value()
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "br", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tbody", "td", "th", "thead", "tr", "ul",
];

const HIDDEN_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// Rendered-style text: inline runs join on one line, block elements
/// start a new one. Whitespace inside a line collapses to single spaces.
fn inner_text(element: ElementRef<'_>) -> String {
    let mut buf = String::new();
    push_text(element, &mut buf);
    buf.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_text(element: ElementRef<'_>, buf: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                // source newlines are layout, not line breaks
                buf.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
            }
            Node::Element(el) => {
                let name = el.name();
                if HIDDEN_TAGS.contains(&name) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    buf.push('\n');
                }
                if let Some(child) = ElementRef::wrap(child) {
                    push_text(child, buf);
                }
                if block {
                    buf.push('\n');
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
        <div id="normal-jobs">
          <a href="/companies/acme/jobs/1"><h3>Frontend Engineer</h3><p>ACME</p></a>
          <a href="/companies/acme/jobs/2"><h3>Designer</h3></a>
        </div>"#;

    #[test]
    fn snapshots_carry_text_and_attributes() {
        let found = select_snapshots(CARD, "#normal-jobs a").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].text, "Frontend Engineer\nACME");
        assert_eq!(found[0].attr("href"), Some("/companies/acme/jobs/1"));
        assert_eq!(found[1].select("h3").unwrap()[0].text, "Designer");
    }

    #[test]
    fn inline_markup_stays_on_one_line() {
        let html = r#"
            <a href="/jobs/7">
              <h3>前端<b>工程師</b></h3>
              <div>月薪 <span>60,000</span> - <em>80,000</em><br>遠端</div>
              <script>var x = 1;</script>
            </a>"#;
        let found = select_snapshots(html, "a").unwrap();
        assert_eq!(found[0].text, "前端工程師\n月薪 60,000 - 80,000\n遠端");
    }

    #[test]
    fn bad_selector_is_an_error() {
        assert!(matches!(
            select_snapshots(CARD, "a[href^="),
            Err(CrawlError::Selector { .. })
        ));
    }
}
