//! Resource discovery: find script and stylesheet elements on a page.
//!
//! [`PageScanner`] is a lightweight regex scan, not an HTML parser. It skips
//! elements inside comments, keeps page order, and resolves the
//! `data-suppress-analysis` attribute into [`ResourceRef::suppressed`].

use crate::models::{ResourceRef, Resources};
use crate::suppress::SUPPRESSION_ATTRIBUTE;
use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

pub trait ResourceDiscovery: Send + Sync {
    fn discover(&self) -> Resources;
}

/// A precomputed resource list discovers itself.
impl ResourceDiscovery for Resources {
    fn discover(&self) -> Resources {
        self.clone()
    }
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("valid regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<link\b([^>]*)>").expect("valid regex"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("valid regex")
    })
}

fn comment_or_script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<!--.*?-->|<script\b[^>]*>.*?</script\s*>").expect("valid regex")
    })
}

/// Byte ranges of HTML comments, in page order. Script elements are opaque:
/// a `<!--` inside a script body does not open a comment.
pub fn comment_spans(html: &str) -> Vec<Range<usize>> {
    comment_or_script_re()
        .find_iter(html)
        .filter(|m| m.as_str().starts_with("<!--"))
        .map(|m| m.range())
        .collect()
}

/// Byte offset of attribute `name` (case-insensitive) within an element's
/// attribute text.
pub fn attr_offset(text: &str, name: &str) -> Option<usize> {
    attr_re()
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .find(|m| m.as_str().eq_ignore_ascii_case(name))
        .map(|m| m.start())
}

/// Blank out HTML comments, keeping byte offsets and line breaks intact so
/// positions found in the result map back onto the original text.
pub fn mask_comments(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    for span in comment_spans(html) {
        out.push_str(&html[last..span.start]);
        for c in html[span.clone()].chars() {
            match c {
                '\n' | '\r' => out.push(c),
                _ => out.extend(std::iter::repeat(' ').take(c.len_utf8())),
            }
        }
        last = span.end;
    }
    out.push_str(&html[last..]);
    out
}

/// Parse an element's attribute text into a lowercase-keyed map. Valueless
/// attributes map to an empty string.
pub fn parse_attrs(text: &str) -> HashMap<String, String> {
    attr_re()
        .captures_iter(text)
        .map(|c| {
            let name = c[1].to_ascii_lowercase();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or("", |m| m.as_str());
            (name, value.to_string())
        })
        .collect()
}

fn is_javascript_type(ty: Option<&str>) -> bool {
    match ty.map(|t| t.trim().to_ascii_lowercase()) {
        None => true,
        Some(t) => matches!(
            t.as_str(),
            "" | "module"
                | "text/javascript"
                | "application/javascript"
                | "text/ecmascript"
                | "application/ecmascript"
                | "application/x-javascript"
        ),
    }
}

/// Discovers resources by scanning the page text.
#[derive(Debug, Clone)]
pub struct PageScanner {
    html: String,
}

impl PageScanner {
    pub fn new(html: impl Into<String>) -> Self {
        PageScanner { html: html.into() }
    }

    pub fn scan(html: &str) -> Resources {
        let masked = mask_comments(html);
        let mut scripts = Vec::new();
        for (index, caps) in script_re().captures_iter(&masked).enumerate() {
            let attrs = parse_attrs(&caps[1]);
            let suppressed = attrs.contains_key(SUPPRESSION_ATTRIBUTE);
            match attrs.get("src").filter(|s| !s.is_empty()) {
                Some(src) => {
                    scripts.push(ResourceRef::external(index, src.clone()).with_suppressed(suppressed))
                }
                None => {
                    if !is_javascript_type(attrs.get("type").map(String::as_str)) {
                        continue;
                    }
                    // read the body from the original text, not the masked copy
                    let body = caps.get(2).map_or("", |m| &html[m.range()]);
                    scripts.push(ResourceRef::inline(index, body).with_suppressed(suppressed));
                }
            }
        }

        let mut stylesheets = Vec::new();
        for caps in link_re().captures_iter(&masked) {
            let attrs = parse_attrs(&caps[1]);
            let is_stylesheet = attrs.get("rel").is_some_and(|rel| {
                rel.split_ascii_whitespace()
                    .any(|t| t.eq_ignore_ascii_case("stylesheet"))
            });
            let href = attrs.get("href").filter(|h| !h.is_empty());
            if let (true, Some(href)) = (is_stylesheet, href) {
                let index = stylesheets.len();
                stylesheets.push(
                    ResourceRef::external(index, href.clone())
                        .with_suppressed(attrs.contains_key(SUPPRESSION_ATTRIBUTE)),
                );
            }
        }

        Resources {
            scripts,
            stylesheets,
        }
    }
}

impl ResourceDiscovery for PageScanner {
    fn discover(&self) -> Resources {
        Self::scan(&self.html)
    }
}
