//! Shared data models for analysis inputs and outputs.

pub mod resource;

pub use resource::{ResourceRef, Resources};

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Verifier-specific finding, kept as loose JSON because every verifier
/// reports a different shape. `null` entries are allowed and skipped.
pub type RawFinding = Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Verification domain. Each one has its own verifier and configuration.
pub enum Linter {
    Markup,
    Script,
    Stylesheet,
}

impl Linter {
    pub const ALL: [Linter; 3] = [Linter::Markup, Linter::Script, Linter::Stylesheet];

    pub fn as_str(self) -> &'static str {
        match self {
            Linter::Markup => "markup",
            Linter::Script => "script",
            Linter::Stylesheet => "stylesheet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
/// Result group of an analysis run. Declaration order is the order in which
/// groups appear in the final violation list.
pub enum Category {
    Markup,
    Script,
    InlineScript,
    Stylesheet,
}

impl Category {
    pub const ORDER: [Category; 4] = [
        Category::Markup,
        Category::Script,
        Category::InlineScript,
        Category::Stylesheet,
    ];

    /// Inline and external scripts share the script verifier and its config.
    pub fn linter(self) -> Linter {
        match self {
            Category::Markup => Linter::Markup,
            Category::Script | Category::InlineScript => Linter::Script,
            Category::Stylesheet => Linter::Stylesheet,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Markup => "markup",
            Category::Script => "script",
            Category::InlineScript => "inline-script",
            Category::Stylesheet => "stylesheet",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Canonical violation produced by the normalizer.
pub struct Violation {
    /// Bare file name of the analyzed resource (or a synthetic label).
    pub resource: String,
    pub line: u64,
    pub reason: String,
    pub evidence: String,
    /// Original verifier output for consumers that need rule-specific detail.
    pub raw: RawFinding,
}
