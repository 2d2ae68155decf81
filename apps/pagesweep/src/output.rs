//! Output rendering for analysis results.
//!
//! Supports `human` (default), `json`, and `html`. The JSON form lists the
//! violations and a top-level summary; the HTML form is a self-contained
//! overlay fragment that can be dropped into the analyzed page.

use crate::analyze::PlannedResource;
use crate::models::Violation;
use crate::suppress::Disposition;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;
use std::collections::BTreeSet;

fn use_colors(output: &str) -> bool {
    output != "json" && output != "html" && std::env::var_os("NO_COLOR").is_none()
}

/// Prefix for fatal CLI messages on stderr.
pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors("human") {
        "note:".cyan().to_string()
    } else {
        "note:".to_string()
    }
}

/// Number of distinct resources that produced at least one violation.
fn resources_with_violations(violations: &[Violation]) -> usize {
    violations
        .iter()
        .map(|v| v.resource.as_str())
        .collect::<BTreeSet<_>>()
        .len()
}

/// One human-readable line: `resource #line ❲reason❳ evidence`.
pub fn format_violation(v: &Violation, color: bool) -> String {
    if color {
        format!(
            "{} {} {} ❲{}❳ {}",
            "▲".yellow(),
            v.resource.bold(),
            format!("#{}", v.line).cyan(),
            v.reason,
            v.evidence.bright_black()
        )
    } else {
        format!("▲ {} #{} ❲{}❳ {}", v.resource, v.line, v.reason, v.evidence)
    }
}

/// Print violations in the requested format.
pub fn print_violations(violations: &[Violation], output: &str) {
    match output {
        "json" => match serde_json::to_string_pretty(&compose_json(violations)) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("failed to serialize violations: {}", e),
        },
        "html" => {
            if let Some(overlay) = render_overlay(violations) {
                println!("{}", overlay);
            }
        }
        _ => {
            let color = use_colors(output);
            for v in violations {
                println!("{}", format_violation(v, color));
            }
            let summary = format!(
                "— Summary — violations={} resources={}",
                violations.len(),
                resources_with_violations(violations)
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Default sink: human-readable lines on stdout.
pub fn to_console(violations: Vec<Violation>) {
    print_violations(&violations, "human");
}

/// Compose the JSON report (pure) for testing/snapshot purposes.
pub fn compose_json(violations: &[Violation]) -> JsonVal {
    json!({
        "violations": violations,
        "summary": {
            "violations": violations.len(),
            "resources": resources_with_violations(violations),
        }
    })
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const OVERLAY_STYLE: &str = "position:absolute;z-index:2000;top:0;left:0;right:0;width:50%;\
max-height:100px;overflow:auto;box-shadow:0px 0px 4px 0px #888;margin:0 auto;\
font-family:Verdana,sans-serif;font-size:70%;background:#fff;color:#444444";

const ROW_STYLE: &str =
    "padding:2px 10px 2px;white-space:nowrap;text-overflow:ellipsis;overflow-x:hidden";

/// Render a bounded, scrollable overlay listing the violations. Returns
/// `None` when there is nothing to show.
pub fn render_overlay(violations: &[Violation]) -> Option<String> {
    if violations.is_empty() {
        return None;
    }
    let mut out = format!("<div id=\"pagesweep-report\" style=\"{}\">\n", OVERLAY_STYLE);
    for v in violations {
        let evidence = escape_html(&v.evidence);
        out.push_str(&format!(
            "  <div style=\"{}\" title=\"{}\">{} #{} <b>{} </b><tt style=\"color:#888\">&nbsp;&nbsp;{}</tt></div>\n",
            ROW_STYLE,
            evidence,
            escape_html(&v.resource),
            v.line,
            escape_html(&v.reason),
            evidence
        ));
    }
    out.push_str("</div>");
    Some(out)
}

/// Print the resources a run would analyze, with their disposition.
pub fn print_plan(planned: &[PlannedResource], output: &str) {
    match output {
        "json" => match serde_json::to_string_pretty(&planned) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("failed to serialize resources: {}", e),
        },
        _ => {
            let color = use_colors(output);
            for p in planned {
                let status = match (p.disposition, color) {
                    (Disposition::Analyzed, true) => "analyzed".green().to_string(),
                    (d, true) => d.as_str().bright_black().to_string(),
                    (d, false) => d.as_str().to_string(),
                };
                println!("{:<13} {:<10} {}", p.category.as_str(), status, p.path);
            }
        }
    }
}
