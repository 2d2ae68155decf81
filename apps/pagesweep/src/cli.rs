//! CLI argument parsing via `clap`.

use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pagesweep",
    version,
    about = "Pagesweep: lint a web page and the resources it references",
    long_about = "Pagesweep verifies a page's markup, its scripts (external and inline) and its stylesheets, and reports every violation in one list.\n\nConfiguration precedence: CLI > pagesweep.toml > defaults.",
    after_help = "Examples:\n  pagesweep analyze --page site/index.html\n  pagesweep analyze --page index.html --exclude '^vendor/' --output json\n  pagesweep resources --page index.html",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity (-v info, -vv debug)")]
    pub verbose: u8,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Debug, Clone, Default)]
/// Options shared by commands that look at a page.
pub struct PageArgs {
    #[arg(long, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, help = "Page to analyze, relative to the repository root")]
    pub page: Option<String>,
    #[arg(long, help = "Regex; matching script and stylesheet paths are skipped")]
    pub exclude: Option<String>,
    #[arg(long, action = ArgAction::SetTrue, help = "Do not analyze inline script blocks")]
    pub ignore_inline_scripts: bool,
    #[arg(long, help = "Output mode: human|json|html (default: human)")]
    pub output: Option<String>,
    #[arg(long, help = "Verifier option preset: strict|none (default: none)")]
    pub preset: Option<String>,
}

impl PageArgs {
    /// `--ignore-inline-scripts` only overrides config when given.
    pub fn ignore_inline_override(&self) -> Option<bool> {
        self.ignore_inline_scripts.then_some(true)
    }
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current pagesweep version.")]
    Version,
    /// Analyze a page
    #[command(
        about = "Run analysis",
        long_about = "Verify the page markup, scripts and stylesheets. Exits 1 when violations are found, 2 on configuration errors.",
        after_help = "Examples:\n  pagesweep analyze --page index.html\n  pagesweep analyze --page index.html --preset strict --output html"
    )]
    Analyze(PageArgs),
    /// List discovered resources
    #[command(
        about = "List resources",
        long_about = "List the page's scripts and stylesheets and whether each would be analyzed, excluded, suppressed or ignored."
    )]
    Resources(PageArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = Cli::try_parse_from([
            "pagesweep",
            "-vv",
            "analyze",
            "--page",
            "index.html",
            "--exclude",
            "^vendor/",
            "--ignore-inline-scripts",
            "--output",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.cmd {
            Commands::Analyze(args) => {
                assert_eq!(args.page.as_deref(), Some("index.html"));
                assert_eq!(args.exclude.as_deref(), Some("^vendor/"));
                assert_eq!(args.ignore_inline_override(), Some(true));
                assert_eq!(args.output.as_deref(), Some("json"));
                assert!(args.preset.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_absent_flag_defers_to_config() {
        let cli = Cli::try_parse_from(["pagesweep", "resources", "--page", "a.html"]).unwrap();
        match cli.cmd {
            Commands::Resources(args) => assert_eq!(args.ignore_inline_override(), None),
            _ => panic!("expected resources"),
        }
    }
}
