//! Configuration discovery and effective settings resolution.
//!
//! Pagesweep reads `pagesweep.toml|yaml|yml` from the repository root (or
//! closest ancestor) and merges it with CLI flags to produce an `Effective`
//! config. Defaults:
//! - `page`: none (must come from CLI or config)
//! - `exclude`: none
//! - `ignoreInlineScripts`: false
//! - `output`: `human`
//! - `preset`: `none`
//!
//! `[verifiers.<markup|script|stylesheet>]` tables are shallow-merged over the
//! preset's options for that domain.
//!
//! Overrides precedence: CLI > config file > defaults.

use crate::analyze::AnalysisConfig;
use crate::error::{Error, Result};
use crate::models::Linter;
use crate::presets;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_NAMES: [&str; 3] = ["pagesweep.toml", "pagesweep.yaml", "pagesweep.yml"];

#[derive(Debug, Default, Deserialize, Clone)]
/// Root configuration loaded from `pagesweep.toml|yaml`.
pub struct PagesweepConfig {
    pub page: Option<String>,
    pub exclude: Option<String>,
    #[serde(rename = "ignoreInlineScripts")]
    pub ignore_inline_scripts: Option<bool>,
    pub output: Option<String>,
    pub preset: Option<String>,
    #[serde(default)]
    pub verifiers: HashMap<Linter, Json>, // [verifiers.<linter>]
}

#[derive(Debug, Clone)]
/// Fully-resolved configuration used by commands after applying precedence.
pub struct Effective {
    pub repo_root: PathBuf,
    pub page: Option<String>,
    pub exclude: Option<String>,
    pub ignore_inline_scripts: bool,
    pub output: String,
    pub preset: String,
    pub verifiers: HashMap<Linter, Json>,
}

/// Walk upward from `start` to detect the repository root.
///
/// Stops when a `pagesweep.toml|yaml|yml` or a `.git` directory is found.
pub fn detect_repo_root(start: &Path) -> PathBuf {
    let mut cur = start;
    loop {
        if CONFIG_NAMES.iter().any(|n| cur.join(n).exists()) || cur.join(".git").exists() {
            return cur.to_path_buf();
        }
        match cur.parent() {
            Some(p) => cur = p,
            None => return start.to_path_buf(),
        }
    }
}

/// Load `PagesweepConfig` from `pagesweep.toml` or `pagesweep.yaml|yml` if
/// present. A file that exists but cannot be read or parsed is an error.
pub fn load_config(root: &Path) -> Result<Option<PagesweepConfig>> {
    for name in CONFIG_NAMES {
        let path = root.join(name);
        if !path.exists() {
            continue;
        }
        let s = fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        let cfg: PagesweepConfig = if name.ends_with(".toml") {
            toml::from_str(&s).map_err(|source| Error::Toml { path, source })?
        } else {
            serde_yaml::from_str(&s).map_err(|source| Error::Yaml { path, source })?
        };
        return Ok(Some(cfg));
    }
    Ok(None)
}

/// Resolve `Effective` by merging CLI flags, discovered config, and defaults.
pub fn resolve_effective(
    cli_repo_root: Option<&str>,
    cli_page: Option<&str>,
    cli_exclude: Option<&str>,
    cli_ignore_inline: Option<bool>,
    cli_output: Option<&str>,
    cli_preset: Option<&str>,
) -> Result<Effective> {
    let start = PathBuf::from(cli_repo_root.unwrap_or("."));
    let repo_root = detect_repo_root(&start);
    let cfg = load_config(&repo_root)?.unwrap_or_default();

    let page = cli_page.map(|s| s.to_string()).or(cfg.page);
    let exclude = cli_exclude.map(|s| s.to_string()).or(cfg.exclude);
    let ignore_inline_scripts = cli_ignore_inline
        .or(cfg.ignore_inline_scripts)
        .unwrap_or(false);
    let output = cli_output
        .map(|s| s.to_string())
        .or(cfg.output)
        .unwrap_or_else(|| "human".to_string());
    let preset = cli_preset
        .map(|s| s.to_string())
        .or(cfg.preset)
        .unwrap_or_else(|| presets::NONE.to_string());

    Ok(Effective {
        repo_root,
        page,
        exclude,
        ignore_inline_scripts,
        output,
        preset,
        verifiers: cfg.verifiers,
    })
}

/// Shallow merge: top-level keys of `over` replace those of `base`. A
/// non-object on either side replaces `base` entirely.
fn merge_shallow(base: Json, over: Json) -> Json {
    match (base, over) {
        (Json::Object(mut b), Json::Object(o)) => {
            b.extend(o);
            Json::Object(b)
        }
        (_, over) => over,
    }
}

impl Effective {
    /// Page path resolved against the repository root.
    pub fn page_path(&self) -> Result<PathBuf> {
        let page = self.page.as_deref().ok_or(Error::PageNotConfigured)?;
        Ok(self.repo_root.join(page))
    }

    /// Per-domain verifier options: the preset with configured tables merged
    /// over it.
    pub fn verifier_config(&self) -> Result<HashMap<Linter, Json>> {
        let mut merged = presets::by_name(&self.preset)?;
        for (linter, over) in &self.verifiers {
            let base = merged.remove(linter).unwrap_or(Json::Null);
            merged.insert(*linter, merge_shallow(base, over.clone()));
        }
        Ok(merged)
    }

    /// Build the options for one analysis run. `page` is the path the
    /// fetcher will be asked for.
    pub fn analysis_config(&self, page: &str) -> Result<AnalysisConfig> {
        let exclude = match self.exclude.as_deref() {
            Some(pattern) => Some(Regex::new(pattern).map_err(|source| Error::Pattern {
                pattern: pattern.to_string(),
                source,
            })?),
            None => None,
        };
        Ok(AnalysisConfig {
            page: page.to_string(),
            exclude,
            ignore_inline_scripts: self.ignore_inline_scripts,
            verifier_config: self.verifier_config()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_detect_and_load_toml() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let mut f = fs::File::create(root.join("pagesweep.toml")).unwrap();
        writeln!(
            f,
            "{}",
            r#"
page = "site/index.html"
exclude = "^vendor/"
ignoreInlineScripts = true
output = "json"
            "#
        )
        .unwrap();

        // Resolve using explicit repo_root to avoid global CWD races
        let eff = resolve_effective(root.to_str(), None, None, None, None, None).unwrap();
        assert_eq!(eff.page.as_deref(), Some("site/index.html"));
        assert_eq!(eff.exclude.as_deref(), Some("^vendor/"));
        assert!(eff.ignore_inline_scripts);
        assert_eq!(eff.output, "json");
        assert_eq!(eff.preset, "none");
        assert_eq!(eff.page_path().unwrap(), root.join("site/index.html"));
    }

    #[test]
    fn test_detect_walks_up_to_config() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("pagesweep.yml"), "page: index.html\n").unwrap();
        let nested = root.join("a/b");
        fs::create_dir_all(&nested).unwrap();
        assert_eq!(detect_repo_root(&nested), root.to_path_buf());
    }

    #[test]
    fn test_load_yaml_and_cli_precedence() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("pagesweep.yaml"),
            "page: index.html\noutput: html\nignoreInlineScripts: true\n",
        )
        .unwrap();

        let eff = resolve_effective(
            root.to_str(),
            Some("other.html"),
            None,
            Some(false),
            None,
            Some("strict"),
        )
        .unwrap();
        assert_eq!(eff.page.as_deref(), Some("other.html"));
        assert!(!eff.ignore_inline_scripts);
        assert_eq!(eff.output, "html");
        assert_eq!(eff.preset, "strict");
    }

    #[test]
    fn test_verifier_tables_merge_over_preset() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("pagesweep.toml"),
            r#"
page = "index.html"
preset = "strict"
[verifiers.script]
curly = false
globals = { singleton = true }
[verifiers.stylesheet]
important = false
            "#,
        )
        .unwrap();

        let eff = resolve_effective(root.to_str(), None, None, None, None, None).unwrap();
        let cfg = eff.analysis_config("index.html").unwrap();
        let script = cfg.verifier_config(Linter::Script);
        assert_eq!(script["curly"], json!(false));
        assert_eq!(script["eqeqeq"], json!(true));
        assert_eq!(script["globals"], json!({"singleton": true}));
        assert_eq!(
            cfg.verifier_config(Linter::Stylesheet),
            &json!({"important": false})
        );
        assert_eq!(cfg.verifier_config(Linter::Markup)["no-inline-style"], json!(true));
    }

    #[test]
    fn test_missing_page_and_bad_inputs_are_errors() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        let eff = resolve_effective(root.to_str(), None, Some("("), None, None, None).unwrap();
        assert!(matches!(eff.page_path(), Err(Error::PageNotConfigured)));
        assert!(matches!(
            eff.analysis_config("x.html"),
            Err(Error::Pattern { pattern, .. }) if pattern == "("
        ));

        let eff = resolve_effective(root.to_str(), None, None, None, None, Some("loose")).unwrap();
        assert!(matches!(
            eff.analysis_config("x.html"),
            Err(Error::UnknownPreset(_))
        ));

        fs::write(root.join("pagesweep.toml"), "page = [").unwrap();
        assert!(matches!(
            resolve_effective(root.to_str(), None, None, None, None, None),
            Err(Error::Toml { .. })
        ));
    }
}
