//! Resource references produced by page discovery.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// A script or stylesheet element found on the page.
pub struct ResourceRef {
    /// Position among elements of the same tag on the page.
    pub index: usize,
    /// Referenced path, absent for inline blocks.
    pub src: Option<String>,
    /// Inline text, when the element carries its content.
    pub content: Option<String>,
    /// The element opted out of analysis via `data-suppress-analysis`.
    pub suppressed: bool,
}

impl ResourceRef {
    pub fn external(index: usize, src: impl Into<String>) -> Self {
        ResourceRef {
            index,
            src: Some(src.into()),
            ..ResourceRef::default()
        }
    }

    pub fn inline(index: usize, content: impl Into<String>) -> Self {
        ResourceRef {
            index,
            content: Some(content.into()),
            ..ResourceRef::default()
        }
    }

    pub fn with_suppressed(mut self, suppressed: bool) -> Self {
        self.suppressed = suppressed;
        self
    }

    /// An element without a usable `src` is treated as carrying its own content.
    pub fn is_inline(&self) -> bool {
        self.src.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Ordered candidate resources per element kind.
pub struct Resources {
    /// Every `<script>` element, external and inline, in page order.
    pub scripts: Vec<ResourceRef>,
    /// Every stylesheet `<link>` element in page order.
    pub stylesheets: Vec<ResourceRef>,
}

impl Resources {
    pub fn external_scripts(&self) -> impl Iterator<Item = &ResourceRef> {
        self.scripts.iter().filter(|r| !r.is_inline())
    }

    pub fn inline_scripts(&self) -> impl Iterator<Item = &ResourceRef> {
        self.scripts.iter().filter(|r| r.is_inline())
    }
}
