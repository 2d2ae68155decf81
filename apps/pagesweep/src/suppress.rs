//! Suppression of resources and findings.
//!
//! Two independent filters:
//! - Resource exclusion, applied before any fetch: the path matches the
//!   caller's exclusion pattern, or the element carries
//!   `data-suppress-analysis`.
//! - Line suppression, applied to markup findings after verification: the
//!   referenced source line contains the `suppress-analysis` token.

use crate::models::{ResourceRef, Violation};
use regex::Regex;
use serde::Serialize;

/// Token that silences markup findings on the line containing it.
pub const SUPPRESSION_MARKER: &str = "suppress-analysis";

/// Element attribute that removes a script or stylesheet from analysis.
pub const SUPPRESSION_ATTRIBUTE: &str = "data-suppress-analysis";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
/// Why a resource is (not) analyzed.
pub enum Disposition {
    Analyzed,
    /// Path matched the exclusion pattern.
    Excluded,
    /// Element carries the suppression attribute.
    Suppressed,
    /// Inline analysis is switched off for the run.
    Ignored,
}

impl Disposition {
    pub fn as_str(self) -> &'static str {
        match self {
            Disposition::Analyzed => "analyzed",
            Disposition::Excluded => "excluded",
            Disposition::Suppressed => "suppressed",
            Disposition::Ignored => "ignored",
        }
    }
}

/// Classify a resource against the exclusion policy. Element suppression is
/// checked first; the pattern only applies to resources with a path.
pub fn disposition(resource: &ResourceRef, exclude: Option<&Regex>) -> Disposition {
    if resource.suppressed {
        return Disposition::Suppressed;
    }
    match (resource.src.as_deref(), exclude) {
        (Some(src), Some(re)) if !src.is_empty() && re.is_match(src) => Disposition::Excluded,
        _ => Disposition::Analyzed,
    }
}

/// Source lines of one analyzed resource, used for line suppression.
pub struct SuppressionContext<'a> {
    lines: Vec<&'a str>,
}

impl<'a> SuppressionContext<'a> {
    pub fn from_source(source: &'a str) -> Self {
        SuppressionContext {
            lines: source.lines().collect(),
        }
    }

    /// A violation is suppressed when its 1-indexed line carries the marker.
    /// Lines outside the source are never suppressed.
    pub fn is_suppressed(&self, violation: &Violation) -> bool {
        usize::try_from(violation.line)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.lines.get(i))
            .is_some_and(|line| line.contains(SUPPRESSION_MARKER))
    }

    pub fn retain_unsuppressed(&self, violations: Vec<Violation>) -> Vec<Violation> {
        violations
            .into_iter()
            .filter(|v| !self.is_suppressed(v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value as Json;

    fn at_line(line: u64) -> Violation {
        Violation {
            resource: "html".into(),
            line,
            reason: "r".into(),
            evidence: String::new(),
            raw: Json::Null,
        }
    }

    #[test]
    fn test_marker_line_is_suppressed_other_lines_kept() {
        let src = "<!DOCTYPE html>\n<html>\n<body><!--suppress-analysis--><!--<br/>--></body>\n<div style=\"x\"></div>\n</html>";
        let ctx = SuppressionContext::from_source(src);
        assert!(ctx.is_suppressed(&at_line(3)));
        assert!(!ctx.is_suppressed(&at_line(4)));
        let kept = ctx.retain_unsuppressed(vec![at_line(3), at_line(4)]);
        assert_eq!(kept.iter().map(|v| v.line).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_out_of_range_lines_are_kept() {
        let ctx = SuppressionContext::from_source("suppress-analysis");
        assert!(!ctx.is_suppressed(&at_line(0)));
        assert!(!ctx.is_suppressed(&at_line(2)));
        assert!(ctx.is_suppressed(&at_line(1)));
    }

    #[test]
    fn test_disposition_prefers_element_suppression() {
        let re = Regex::new("vendor/").unwrap();
        let plain = ResourceRef::external(0, "app.js");
        let vendored = ResourceRef::external(1, "vendor/jquery.js");
        let flagged = ResourceRef::external(2, "vendor/x.js").with_suppressed(true);
        assert_eq!(disposition(&plain, Some(&re)), Disposition::Analyzed);
        assert_eq!(disposition(&vendored, Some(&re)), Disposition::Excluded);
        assert_eq!(disposition(&flagged, Some(&re)), Disposition::Suppressed);
        assert_eq!(disposition(&vendored, None), Disposition::Analyzed);
    }
}
