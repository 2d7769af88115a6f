//! Command-line interface for gdscan.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::info;

use crate::checks::{self, CheckOptions, Runner, Status};
use crate::config::{self, Config};
use crate::fix;
use crate::orchestrator::{self, Mode, SuiteOptions};
use crate::project::{self, Layer, Project};
use crate::report::{self, Format};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 1;

/// Static analysis for GDScript projects.
///
/// Scans `.gd` scripts, `.tscn` scenes and `.json` data files under a Godot
/// project root and reports naming, structure, data integrity and engine
/// pattern issues.
#[derive(Parser)]
#[command(name = "gdscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project root (default: nearest ancestor containing project.godot)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Config file (default: gdscan.yaml or .gdscan.yaml at the root)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single check
    Check(CheckArgs),
    /// Run the check suite
    Run(RunArgs),
    /// Apply a line-based auto-fixer
    Fix(FixArgs),
    /// List available checks
    List,
}

/// Output selection shared by `check` and `run`.
#[derive(Args)]
pub struct OutputArgs {
    /// Machine-readable JSON
    #[arg(long, conflicts_with_all = ["markdown", "sarif"])]
    pub json: bool,

    /// Markdown report
    #[arg(long, conflicts_with = "sarif")]
    pub markdown: bool,

    /// SARIF 2.1.0 for CI annotation
    #[arg(long)]
    pub sarif: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl OutputArgs {
    pub fn format(&self) -> Format {
        if self.json {
            Format::Json
        } else if self.markdown {
            Format::Markdown
        } else if self.sarif {
            Format::Sarif
        } else {
            Format::Text
        }
    }
}

#[derive(Args)]
pub struct CheckArgs {
    /// Check id (see `gdscan list`)
    pub id: String,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Only report issues in this file
    #[arg(long)]
    pub file: Option<String>,

    /// Expand the rule set or lower thresholds
    #[arg(long)]
    pub strict: bool,

    /// Check-specific numeric threshold
    #[arg(long)]
    pub threshold: Option<usize>,

    /// Restrict layer-based checks to one layer
    #[arg(long)]
    pub layer: Option<String>,

    /// Exit non-zero when the check fails
    #[arg(long)]
    pub ci: bool,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub output: OutputArgs,

    /// Only run checks marked quick
    #[arg(long)]
    pub quick: bool,

    /// Exit non-zero when any check fails
    #[arg(long)]
    pub ci: bool,

    /// Expand the rule set or lower thresholds
    #[arg(long)]
    pub strict: bool,

    /// Per-check timeout in seconds (default: config timeout_secs)
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct FixArgs {
    /// Fixer to apply: dict-access or unused-preloads
    pub fixer: String,

    /// Only fix this file
    #[arg(long)]
    pub file: Option<String>,

    /// Show the changes without writing them
    #[arg(long)]
    pub dry_run: bool,
}

/// Resolve the project root: explicit, discovered, or the current directory.
pub fn resolve_root(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root.to_path_buf());
    }
    let cwd = std::env::current_dir().context("reading current directory")?;
    Ok(project::find_root(&cwd).unwrap_or(cwd))
}

/// Load config and project for a command.
pub fn load_project(cli: &Cli) -> anyhow::Result<Project> {
    let root = resolve_root(cli.root.as_deref())?;
    let config = Config::load_for_root(&root, cli.config.as_deref())?;
    config::validate(&config).context("invalid config")?;
    Ok(Project::load(&root, config)?)
}

/// Print or write rendered output. Writing to a file disables colors.
fn emit(rendered: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => {
            print!("{}", rendered);
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }
    Ok(())
}

/// Render in the requested format; with `-o`, also print the text summary.
fn deliver(
    output: &OutputArgs,
    render: impl Fn(Format) -> anyhow::Result<String>,
) -> anyhow::Result<()> {
    let format = output.format();
    if output.output.is_some() || format != Format::Text {
        colored::control::set_override(false);
    }
    emit(&render(format)?, output.output.as_deref())?;
    if output.output.is_some() {
        colored::control::unset_override();
        emit(&render(Format::Text)?, None)?;
    }
    Ok(())
}

/// Run the check command.
pub fn run_check(cli: &Cli, args: &CheckArgs) -> anyhow::Result<i32> {
    let Some(check) = checks::find(&args.id) else {
        eprintln!("Error: unknown check {:?}", args.id);
        eprintln!("Run 'gdscan list' to see available checks");
        return Ok(EXIT_ERROR);
    };
    let layer = match args.layer.as_deref() {
        Some(name) => match Layer::parse(name) {
            Some(layer) => Some(layer),
            None => {
                eprintln!("Error: unknown layer {:?}", name);
                return Ok(EXIT_ERROR);
            }
        },
        None => None,
    };

    let project = Arc::new(load_project(cli)?);
    let runner = Runner::new()
        .timeout(Duration::from_secs(project.config.timeout_secs))
        .options(CheckOptions {
            strict: args.strict,
            file: args.file.clone(),
            threshold: args.threshold,
            layer,
        });
    let run = runner.run(&project, check);
    deliver(&args.output, |format| report::render_check(&run, format))?;

    if args.ci && run.status() == Status::Fail {
        Ok(EXIT_FAILED)
    } else {
        Ok(EXIT_SUCCESS)
    }
}

/// Run the suite command.
pub fn run_suite(cli: &Cli, args: &RunArgs) -> anyhow::Result<i32> {
    let project = Arc::new(load_project(cli)?);
    let options = SuiteOptions {
        mode: if args.quick { Mode::Quick } else { Mode::Full },
        strict: args.strict,
        timeout: Duration::from_secs(args.timeout.unwrap_or(project.config.timeout_secs)),
        progress: args.output.output.is_none(),
    };
    let report = orchestrator::run_suite(project, &options);
    deliver(&args.output, |format| report::render_suite(&report, format))?;
    Ok(report.exit_code(args.ci))
}

/// Run the fix command.
pub fn run_fix(cli: &Cli, args: &FixArgs) -> anyhow::Result<i32> {
    let Some(fixer) = fix::find(&args.fixer) else {
        eprintln!("Error: unknown fixer {:?}", args.fixer);
        eprintln!("Available fixers: {}", fix::FIXERS.join(", "));
        return Ok(EXIT_ERROR);
    };
    let project = load_project(cli)?;
    let outcomes = fix::apply(&project, fixer.as_ref(), args.file.as_deref(), args.dry_run)?;

    let mut lines = 0;
    for outcome in &outcomes {
        println!("{}", outcome.file);
        for change in &outcome.changes {
            println!("  {:>5} - {}", change.line, change.before.trim_end());
            match &change.after {
                Some(after) => println!("  {:>5} + {}", change.line, after.trim_end()),
                None => println!("  {:>5}   (removed)", change.line),
            }
        }
        lines += outcome.changes.len();
    }
    println!(
        "{} line(s) changed in {} file(s){}",
        lines,
        outcomes.len(),
        if args.dry_run { " (dry run)" } else { "" }
    );
    Ok(EXIT_SUCCESS)
}

/// Run the list command.
pub fn run_list() -> anyhow::Result<i32> {
    println!("{:<22} {:<15} {:<6} {}", "ID", "CATEGORY", "QUICK", "METRIC");
    for check in checks::registry() {
        println!(
            "{:<22} {:<15} {:<6} {}",
            check.id(),
            check.category().as_str(),
            if check.quick() { "yes" } else { "" },
            check.threshold().metric
        );
    }
    Ok(EXIT_SUCCESS)
}

/// Dispatch a parsed command line.
pub fn dispatch(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Check(args) => run_check(cli, args),
        Commands::Run(args) => run_suite(cli, args),
        Commands::Fix(args) => run_fix(cli, args),
        Commands::List => run_list(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_check_flags() {
        let cli = Cli::parse_from([
            "gdscan", "--root", "game", "check", "coupling", "--json", "--layer", "sim", "--threshold", "3",
        ]);
        let Commands::Check(args) = &cli.command else {
            panic!("expected check");
        };
        assert_eq!(args.id, "coupling");
        assert_eq!(args.output.format(), Format::Json);
        assert_eq!(args.layer.as_deref(), Some("sim"));
        assert_eq!(args.threshold, Some(3));
        assert_eq!(cli.root.as_deref(), Some(Path::new("game")));
    }

    #[test]
    fn test_parse_run_and_fix() {
        let cli = Cli::parse_from(["gdscan", "-vv", "run", "--quick", "--ci", "--markdown", "-o", "r.md"]);
        assert_eq!(cli.verbose, 2);
        let Commands::Run(args) = &cli.command else {
            panic!("expected run");
        };
        assert!(args.quick && args.ci);
        assert_eq!(args.output.format(), Format::Markdown);

        let cli = Cli::parse_from(["gdscan", "fix", "unused-preloads", "--dry-run"]);
        assert!(matches!(&cli.command, Commands::Fix(a) if a.dry_run && a.fixer == "unused-preloads"));
    }

    #[test]
    fn test_conflicting_formats_rejected() {
        assert!(Cli::try_parse_from(["gdscan", "check", "naming", "--json", "--sarif"]).is_err());
    }
}
