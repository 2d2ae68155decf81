//! Built-in markup rules.
//!
//! - `no-inline-style`: elements must not carry a `style` attribute.
//! - `no-commented-code`: comments must not contain markup.
//!
//! Configuration is a `{rule-id: bool}` object. `null` or an empty object
//! enables every rule; otherwise only rules set to `true` run. Unknown rule
//! ids are ignored so a shared ruleset for a fuller markup engine can be
//! passed unchanged.

use crate::discovery::{attr_offset, comment_spans, mask_comments};
use crate::models::RawFinding;
use crate::verify::Verifier;
use regex::Regex;
use serde_json::{json, Value as Json};
use std::sync::OnceLock;

pub const NO_INLINE_STYLE: &str = "no-inline-style";
pub const NO_COMMENTED_CODE: &str = "no-commented-code";

const INLINE_STYLE_MESSAGE: &str = "Inline style not allowed.";
const COMMENTED_CODE_MESSAGE: &str = "Comments must not contain HTML code";

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<([a-zA-Z][a-zA-Z0-9:-]*)(\s[^>]*)?>").expect("valid regex"))
}

/// Maps byte offsets to 1-based line/column and line text.
struct LineIndex<'a> {
    source: &'a str,
    starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    fn new(source: &'a str) -> Self {
        let starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        LineIndex { source, starts }
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset);
        let col = offset - self.starts[line - 1] + 1;
        (line, col)
    }

    fn line_text(&self, line: usize) -> &'a str {
        let start = self.starts[line - 1];
        let end = self
            .starts
            .get(line)
            .map_or(self.source.len(), |&next| next - 1);
        &self.source[start..end]
    }
}

#[derive(Debug, Default, Clone, Copy)]
/// Verifier running the built-in markup rules.
pub struct MarkupRules;

impl MarkupRules {
    fn enabled(config: &Json, rule: &str) -> bool {
        match config.as_object() {
            Some(rules) if !rules.is_empty() => {
                rules.get(rule).and_then(Json::as_bool).unwrap_or(false)
            }
            _ => true,
        }
    }

    fn finding(index: &LineIndex, (line, col): (usize, usize), rule: &str, message: &str, raw: &str) -> RawFinding {
        json!({
            "type": "error",
            "message": message,
            "line": line,
            "col": col,
            "evidence": index.line_text(line),
            "raw": raw,
            "rule": { "id": rule, "description": message },
        })
    }
}

impl Verifier for MarkupRules {
    fn verify(&self, source: &str, config: &Json) -> Vec<RawFinding> {
        if source.is_empty() {
            return Vec::new();
        }
        let index = LineIndex::new(source);
        let mut found: Vec<(usize, RawFinding)> = Vec::new();

        if Self::enabled(config, NO_COMMENTED_CODE) {
            for span in comment_spans(source) {
                let comment = &source[span.clone()];
                if comment[4..comment.len() - 3].contains('<') {
                    let at = index.position(span.start);
                    found.push((
                        span.start,
                        Self::finding(&index, at, NO_COMMENTED_CODE, COMMENTED_CODE_MESSAGE, comment),
                    ));
                }
            }
        }

        if Self::enabled(config, NO_INLINE_STYLE) {
            let masked = mask_comments(source);
            for caps in tag_re().captures_iter(&masked) {
                let (Some(tag), Some(attrs)) = (caps.get(0), caps.get(2)) else {
                    continue;
                };
                if let Some(style) = attr_offset(attrs.as_str(), "style") {
                    // line of the tag, column of the attribute
                    let (line, tag_col) = index.position(tag.start());
                    let col = tag_col + attrs.start() + style - tag.start();
                    found.push((
                        tag.start(),
                        Self::finding(&index, (line, col), NO_INLINE_STYLE, INLINE_STYLE_MESSAGE, &source[tag.range()]),
                    ));
                }
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, f)| f).collect()
    }
}
