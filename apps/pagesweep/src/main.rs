//! Pagesweep CLI binary entry point.
//! Resolves configuration, wires the file-backed collaborators into an
//! analyzer and prints results.

use clap::Parser;
use pagesweep::analyze::{self, AnalysisConfig, Analyzer};
use pagesweep::cli::{Cli, Commands, PageArgs};
use pagesweep::config::{self, Effective};
use pagesweep::discovery::PageScanner;
use pagesweep::error::{Error, Result};
use pagesweep::fetch::FileFetcher;
use pagesweep::models::Linter;
use pagesweep::output;
use pagesweep::rules::MarkupRules;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn resolve(args: &PageArgs) -> Result<Effective> {
    config::resolve_effective(
        args.repo_root.as_deref(),
        args.page.as_deref(),
        args.exclude.as_deref(),
        args.ignore_inline_override(),
        args.output.as_deref(),
        args.preset.as_deref(),
    )
}

/// Build an analyzer serving files next to the page, plus the run options.
/// The page itself is fetched by file name from its own directory.
fn prepare(eff: &Effective) -> Result<(Analyzer, AnalysisConfig)> {
    let page_path = eff.page_path()?;
    let html = fs::read_to_string(&page_path).map_err(|source| Error::Io {
        path: page_path.clone(),
        source,
    })?;
    let root = page_path.parent().unwrap_or(Path::new("."));
    let page = page_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let analyzer = Analyzer::new(
        Arc::new(FileFetcher::new(root)),
        Arc::new(PageScanner::new(html)),
    )
    .with_verifier(Linter::Markup, Arc::new(MarkupRules));
    Ok((analyzer, eff.analysis_config(&page)?))
}

fn fail(e: Error) -> ! {
    eprintln!("{} {}", output::error_prefix(), e);
    std::process::exit(2);
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::Analyze(args) => {
            let eff = resolve(&args).unwrap_or_else(|e| fail(e));
            if matches!(config::load_config(&eff.repo_root), Ok(None)) && eff.output == "human" {
                eprintln!(
                    "{} No pagesweep.toml found; using defaults.",
                    output::note_prefix()
                );
            }
            let (analyzer, run_cfg) = prepare(&eff).unwrap_or_else(|e| fail(e));
            let violations = analyzer.analyze_blocking(run_cfg);
            output::print_violations(&violations, &eff.output);
            if !violations.is_empty() {
                std::process::exit(1);
            }
        }
        Commands::Resources(args) => {
            let eff = resolve(&args).unwrap_or_else(|e| fail(e));
            let (analyzer, run_cfg) = prepare(&eff).unwrap_or_else(|e| fail(e));
            let planned = analyze::plan(&analyzer.discover(), &run_cfg);
            output::print_plan(&planned, &eff.output);
        }
    }
}
