use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use code_clipper::config::{apply_plan_with, load_from_path, ClipOutcome, EntryResult};
use code_clipper::{Clipper, PositionSelector, SelectOptions, Selector};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "clipper")]
#[command(about = "Structural code insertion for Go and Protocol Buffers", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply clip plans to a source tree
    Apply {
        /// Clip plan files, or directories containing *.toml plans
        #[arg(required = true)]
        plans: Vec<PathBuf>,

        /// Root that plan file paths are relative to
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Run one selector against a file and print the selection as JSON
    Select {
        /// Go or proto source file
        file: PathBuf,

        /// Selector name, see `clipper list`
        #[arg(short, long)]
        selector: Selector,

        /// Selector option as key=value, e.g. -o functionName=InitGenesis
        #[arg(short = 'o', long = "option", value_parser = parse_option)]
        options: Vec<(String, String)>,
    },

    /// List available selectors and the options they read
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Apply {
            plans,
            root,
            dry_run,
            diff,
        } => cmd_apply(plans, root, dry_run, diff),

        Commands::Select {
            file,
            selector,
            options,
        } => cmd_select(file, selector, options),

        Commands::List => cmd_list(),
    }
}

/// Logs go to stderr so `select` output stays machine readable.
fn init_logging(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

/// Helper: Expand directories into the *.toml plans they contain.
fn collect_plan_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(input).max_depth(1) {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
            {
                found.push(entry.path().to_path_buf());
            }
        }
        found.sort();

        if found.is_empty() {
            anyhow::bail!("No .toml clip plans found in {}", input.display());
        }
        files.extend(found);
    }

    Ok(files)
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (clipped)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn cmd_apply(plans: Vec<PathBuf>, root: PathBuf, dry_run: bool, show_diff: bool) -> Result<()> {
    let plan_files = collect_plan_files(&plans)?;

    println!("Root: {}", root.display());
    if dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }
    println!();

    // One session for all plans, so misses are reported together.
    let mut clipper = Clipper::new();
    let mut total_applied = 0;
    let mut total_already_applied = 0;
    let mut total_missed = 0;
    let mut outcomes: Vec<ClipOutcome> = Vec::new();

    for plan_file in plan_files {
        let plan = load_from_path(&plan_file)?;
        match plan.meta.name.as_str() {
            "" => println!("Applying {}...", plan_file.display()),
            name => println!("Applying {} ({})...", plan_file.display(), name),
        }

        let (results, files) = apply_plan_with(&mut clipper, &plan, &root, dry_run)
            .with_context(|| format!("failed to apply {}", plan_file.display()))?;

        for (entry_id, result) in results {
            match result {
                EntryResult::Applied { file } => {
                    let verb = if dry_run { "Would apply to" } else { "Applied to" };
                    println!("{} {}: {} {}", "✓".green(), entry_id, verb, file.display());
                    total_applied += 1;
                }
                EntryResult::AlreadyApplied { file } => {
                    println!(
                        "{} {}: Already applied to {}",
                        "⊙".yellow(),
                        entry_id,
                        file.display()
                    );
                    total_already_applied += 1;
                }
                EntryResult::Missed { file, reason } => {
                    eprintln!("{} {}: Missed - {}", "✗".red(), entry_id, reason);
                    eprintln!("  File: {}", file.display());
                    total_missed += 1;
                }
            }
        }
        outcomes.extend(files);

        println!();
    }

    if show_diff {
        for outcome in outcomes.iter().filter(|o| o.changed()) {
            display_diff(&outcome.file, &outcome.original, &outcome.updated);
        }
        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  {} applied", format!("{}", total_applied).green());
    println!(
        "  {} already applied",
        format!("{}", total_already_applied).yellow()
    );
    println!("  {} missed", format!("{}", total_missed).red());

    if let Some(err) = clipper.err() {
        eprintln!();
        eprintln!("{}", err.to_string().red());
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_select(file: PathBuf, selector: Selector, options: Vec<(String, String)>) -> Result<()> {
    let code = fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let options: SelectOptions = options.into_iter().collect();

    let selection = selector.select(&file, &code, &options)?;
    let output = serde_json::json!({
        "selector": selector.name(),
        "file": file.display().to_string(),
        "found": selection.found(),
        "offset": selection.offset,
        "data": selection.data,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    if !selection.found() {
        let missing = code_clipper::MissingSelection {
            selector,
            path: file,
            options,
        };
        eprintln!("{}", missing.message().red());
        std::process::exit(1);
    }

    Ok(())
}

fn cmd_list() -> Result<()> {
    println!("{}", "Selectors:".bold());
    for selector in Selector::ALL {
        let keys = selector.option_keys();
        if keys.is_empty() {
            println!("  {}", selector.name());
        } else {
            println!(
                "  {} {}",
                selector.name(),
                format!("[{}]", keys.join(", ")).dimmed()
            );
        }
    }
    Ok(())
}
