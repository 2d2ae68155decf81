//! Verifier capability consumed by the analysis.
//!
//! A verifier inspects source text against its own rules and returns raw,
//! verifier-shaped findings. Concrete script and stylesheet engines live
//! outside this crate; they plug in through [`Verifier`] or [`FnVerifier`].

use crate::models::{Linter, RawFinding};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

pub trait Verifier: Send + Sync {
    /// Inspect `source` with the category's `config`. Empty source must
    /// produce no findings.
    fn verify(&self, source: &str, config: &Json) -> Vec<RawFinding>;

    /// Field of each raw finding that holds the human-readable reason.
    fn message_field(&self) -> &str {
        "message"
    }
}

/// Stand-in used when no verifier is installed for a domain.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVerifier;

impl Verifier for NullVerifier {
    fn verify(&self, _source: &str, _config: &Json) -> Vec<RawFinding> {
        Vec::new()
    }
}

/// Adapter turning a closure into a verifier with a chosen message field.
pub struct FnVerifier<F> {
    message_field: String,
    verify: F,
}

impl<F> FnVerifier<F>
where
    F: Fn(&str, &Json) -> Vec<RawFinding> + Send + Sync,
{
    pub fn new(message_field: impl Into<String>, verify: F) -> Self {
        FnVerifier {
            message_field: message_field.into(),
            verify,
        }
    }
}

impl<F> Verifier for FnVerifier<F>
where
    F: Fn(&str, &Json) -> Vec<RawFinding> + Send + Sync,
{
    fn verify(&self, source: &str, config: &Json) -> Vec<RawFinding> {
        (self.verify)(source, config)
    }

    fn message_field(&self) -> &str {
        &self.message_field
    }
}

/// Verifier per domain; unset domains resolve to [`NullVerifier`].
#[derive(Clone, Default)]
pub struct Verifiers {
    installed: HashMap<Linter, Arc<dyn Verifier>>,
}

impl Verifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, linter: Linter, verifier: Arc<dyn Verifier>) -> Self {
        self.installed.insert(linter, verifier);
        self
    }

    pub fn is_installed(&self, linter: Linter) -> bool {
        self.installed.contains_key(&linter)
    }

    /// Domains that fall back to the null verifier, in [`Linter::ALL`] order.
    pub fn uninstalled(&self) -> Vec<Linter> {
        Linter::ALL
            .into_iter()
            .filter(|l| !self.is_installed(*l))
            .collect()
    }

    pub fn get(&self, linter: Linter) -> Arc<dyn Verifier> {
        self.installed
            .get(&linter)
            .cloned()
            .unwrap_or_else(|| Arc::new(NullVerifier) as Arc<dyn Verifier>)
    }
}
