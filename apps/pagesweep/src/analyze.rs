//! Analysis orchestration.
//!
//! One task per result category (markup, external scripts, inline scripts,
//! stylesheets) is joined with [`Join`]. Script and stylesheet tasks fan out
//! again, one nested join task per resource. Every resource task fetches,
//! verifies, normalizes and filters before completing, so data is reduced as
//! it arrives. The final list is flattened in category order and handed to
//! the sink exactly once.
//!
//! Each call to [`Analyzer::analyze`] owns its [`AnalysisConfig`]; nothing is
//! shared between runs.

use crate::discovery::ResourceDiscovery;
use crate::fetch::Fetcher;
use crate::join::{Join, Task};
use crate::models::{Category, Linter, ResourceRef, Resources, Violation};
use crate::normalize::{normalize_all, resource_label};
use crate::output;
use crate::suppress::{disposition, Disposition, SuppressionContext};
use crate::verify::{Verifier, Verifiers};
use regex::Regex;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Receives the final violation list exactly once.
pub type Sink = Box<dyn FnOnce(Vec<Violation>) + Send>;

/// Label used for markup findings when the page path has no file name.
pub const MARKUP_LABEL: &str = "html";

static NULL_CONFIG: Json = Json::Null;

#[derive(Debug, Clone, Default)]
/// Options for one analysis run.
pub struct AnalysisConfig {
    /// Path handed to the fetcher for the page markup.
    pub page: String,
    /// Scripts and stylesheets whose path matches are skipped before fetch.
    pub exclude: Option<Regex>,
    pub ignore_inline_scripts: bool,
    /// Opaque configuration handed to each domain's verifier.
    pub verifier_config: HashMap<Linter, Json>,
}

impl AnalysisConfig {
    pub fn verifier_config(&self, linter: Linter) -> &Json {
        self.verifier_config.get(&linter).unwrap_or(&NULL_CONFIG)
    }

    pub fn markup_label(&self) -> &str {
        match resource_label(&self.page) {
            "" => MARKUP_LABEL,
            label => label,
        }
    }
}

/// Synthetic label of an inline script block; `index` is the element's
/// position among all script elements on the page.
pub fn inline_label(index: usize) -> String {
    format!("(embedded-js-{index})")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A resource and whether the run will analyze it.
pub struct PlannedResource {
    pub category: Category,
    pub path: String,
    pub disposition: Disposition,
}

/// Decide, per category and in final output order, which resources a run
/// with `config` analyzes.
pub fn plan(resources: &Resources, config: &AnalysisConfig) -> Vec<PlannedResource> {
    let exclude = config.exclude.as_ref();
    let mut out = vec![PlannedResource {
        category: Category::Markup,
        path: config.page.clone(),
        disposition: Disposition::Analyzed,
    }];
    let external = |category: Category, r: &ResourceRef| PlannedResource {
        category,
        path: r.src.clone().unwrap_or_default(),
        disposition: disposition(r, exclude),
    };
    out.extend(resources.external_scripts().map(|r| external(Category::Script, r)));
    out.extend(resources.inline_scripts().map(|r| PlannedResource {
        category: Category::InlineScript,
        path: inline_label(r.index),
        disposition: match disposition(r, exclude) {
            Disposition::Analyzed if config.ignore_inline_scripts => Disposition::Ignored,
            d => d,
        },
    }));
    out.extend(
        resources
            .stylesheets
            .iter()
            .filter(|r| !r.is_inline())
            .map(|r| external(Category::Stylesheet, r)),
    );
    out
}

fn analyzed_paths(plan: &[PlannedResource], category: Category) -> Vec<String> {
    plan.iter()
        .filter(|p| p.category == category)
        .filter(|p| {
            if p.disposition != Disposition::Analyzed {
                debug!(category = category.as_str(), path = %p.path, reason = p.disposition.as_str(), "skipping resource");
                return false;
            }
            true
        })
        .map(|p| p.path.clone())
        .collect()
}

/// Runs analyses against a fixed set of collaborators.
#[derive(Clone)]
pub struct Analyzer {
    fetcher: Arc<dyn Fetcher>,
    discovery: Arc<dyn ResourceDiscovery>,
    verifiers: Verifiers,
}

impl Analyzer {
    pub fn new(fetcher: Arc<dyn Fetcher>, discovery: Arc<dyn ResourceDiscovery>) -> Self {
        Analyzer {
            fetcher,
            discovery,
            verifiers: Verifiers::new(),
        }
    }

    pub fn with_verifier(mut self, linter: Linter, verifier: Arc<dyn Verifier>) -> Self {
        self.verifiers = self.verifiers.with(linter, verifier);
        self
    }

    pub fn discover(&self) -> Resources {
        self.discovery.discover()
    }

    /// Start an analysis. `sink` receives the violations once every category
    /// has completed; without one they are printed to the console.
    pub fn analyze(&self, config: AnalysisConfig, sink: Option<Sink>) {
        let config = Arc::new(config);
        let resources = self.discovery.discover();
        let planned = plan(&resources, &config);
        let off = self.verifiers.uninstalled();
        if !off.is_empty() {
            let names: Vec<_> = off.iter().map(|l| l.as_str()).collect();
            info!(domains = %names.join(","), "no verifier installed; these checks are off");
        }
        info!(
            page = %config.page,
            scripts = resources.scripts.len(),
            stylesheets = resources.stylesheets.len(),
            "analysis running"
        );

        let tasks: Vec<_> = Category::ORDER
            .into_iter()
            .map(|category| {
                let task = match category {
                    Category::Markup => self.markup_task(&config),
                    Category::InlineScript => self.inline_task(&resources, &config),
                    Category::Script | Category::Stylesheet => {
                        self.group_task(category, analyzed_paths(&planned, category), &config)
                    }
                };
                (category, task)
            })
            .collect();
        let join = Join::keyed(tasks);
        debug!(total = join.total(), pending = join.pending(), "joining categories");

        let deliver = sink.unwrap_or_else(|| Box::new(output::to_console) as Sink);
        let registered = join.on_complete(move |results| {
            let violations: Vec<Violation> = results.into_items().into_iter().flatten().collect();
            info!(violations = violations.len(), "analysis done");
            deliver(violations);
        });
        if let Err(e) = registered {
            warn!(error = %e, "analysis continuation rejected");
        }
    }

    /// Run an analysis and wait for its result on the calling thread.
    ///
    /// Returns an empty list if a collaborator drops its callback without
    /// ever completing it.
    pub fn analyze_blocking(&self, config: AnalysisConfig) -> Vec<Violation> {
        let (tx, rx) = mpsc::channel();
        self.analyze(
            config,
            Some(Box::new(move |violations: Vec<Violation>| {
                let _ = tx.send(violations);
            })),
        );
        rx.recv().unwrap_or_default()
    }

    fn markup_task(&self, config: &Arc<AnalysisConfig>) -> Task<Category, Vec<Violation>> {
        let fetcher = Arc::clone(&self.fetcher);
        let verifier = self.verifiers.get(Linter::Markup);
        let config = Arc::clone(config);
        Box::new(move |done| {
            let page = config.page.clone();
            fetcher.fetch(
                &page,
                Box::new(move |source: String| {
                    let raw = verifier.verify(&source, config.verifier_config(Linter::Markup));
                    let found = normalize_all(&raw, config.markup_label(), verifier.message_field());
                    let kept = SuppressionContext::from_source(&source).retain_unsuppressed(found);
                    debug!(findings = raw.len(), kept = kept.len(), "markup verified");
                    done.complete(kept);
                }),
            );
        })
    }

    /// Category task fanning out one nested join task per resource path.
    fn group_task(
        &self,
        category: Category,
        paths: Vec<String>,
        config: &Arc<AnalysisConfig>,
    ) -> Task<Category, Vec<Violation>> {
        let fetcher = Arc::clone(&self.fetcher);
        let verifier = self.verifiers.get(category.linter());
        let config = Arc::clone(config);
        Box::new(move |done| {
            let per_resource: Vec<Task<usize, Vec<Violation>>> = paths
                .into_iter()
                .map(|path| resource_task(&fetcher, &verifier, &config, category.linter(), path))
                .collect();
            let group = Join::new(per_resource);
            let registered = group.on_complete(move |results| {
                let violations: Vec<Violation> =
                    results.into_items().into_iter().flatten().collect();
                debug!(
                    category = category.as_str(),
                    violations = violations.len(),
                    "category verified"
                );
                done.complete(violations);
            });
            if let Err(e) = registered {
                warn!(category = category.as_str(), error = %e, "category continuation rejected");
            }
        })
    }

    /// Inline blocks carry their text, so this task completes synchronously.
    fn inline_task(
        &self,
        resources: &Resources,
        config: &Arc<AnalysisConfig>,
    ) -> Task<Category, Vec<Violation>> {
        let blocks: Vec<(usize, String)> = if config.ignore_inline_scripts {
            Vec::new()
        } else {
            resources
                .inline_scripts()
                .filter(|r| !r.suppressed)
                .map(|r| (r.index, r.content.clone().unwrap_or_default()))
                .collect()
        };
        let verifier = self.verifiers.get(Linter::Script);
        let config = Arc::clone(config);
        Box::new(move |done| {
            let violations = blocks
                .iter()
                .flat_map(|(index, text)| {
                    let raw = verifier.verify(text, config.verifier_config(Linter::Script));
                    normalize_all(&raw, &inline_label(*index), verifier.message_field())
                })
                .collect();
            done.complete(violations);
        })
    }
}

fn resource_task(
    fetcher: &Arc<dyn Fetcher>,
    verifier: &Arc<dyn Verifier>,
    config: &Arc<AnalysisConfig>,
    linter: Linter,
    path: String,
) -> Task<usize, Vec<Violation>> {
    let fetcher = Arc::clone(fetcher);
    let verifier = Arc::clone(verifier);
    let config = Arc::clone(config);
    Box::new(move |done| {
        let label = path.clone();
        fetcher.fetch(
            &path,
            Box::new(move |source: String| {
                let raw = verifier.verify(&source, config.verifier_config(linter));
                let found = normalize_all(&raw, &label, verifier.message_field());
                debug!(path = %label, findings = found.len(), "resource verified");
                done.complete(found);
            }),
        );
    })
}
