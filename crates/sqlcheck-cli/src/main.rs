use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::{ColoredString, Colorize};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use sqlcheck_core::{CheckOptions, CheckerResult, Config, Dialect, Report, WarningKind};
use sqlcheck_sql::{Checker, SqlParser};

const DEFAULT_CONFIG: &str = "sqlcheck.toml";

/// sqlcheck - Syntax and logic checks for SQL queries
#[derive(Parser)]
#[command(name = "sqlcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: sqlcheck.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQL dialect, overrides the config file
    #[arg(short, long, global = true)]
    dialect: Option<Dialect>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check SQL files (or stdin when no files are given)
    Check {
        /// Files to check
        files: Vec<PathBuf>,

        /// Skip the syntax check
        #[arg(long)]
        no_syntax: bool,

        /// Skip the logic rules
        #[arg(long)]
        no_logic: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the effective rule table
    Rules,

    /// Write a default sqlcheck.toml
    Init {
        /// Where to write the config
        #[arg(default_value = DEFAULT_CONFIG)]
        path: PathBuf,
    },

    /// Print the tables and columns a query references
    Tables {
        /// SQL file to inspect
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = load_config(cli.config.as_deref(), cli.verbose)?;
    if let Some(dialect) = cli.dialect {
        config.dialect = dialect;
    }

    if cli.verbose {
        eprintln!("{} dialect: {}", "Using".cyan(), config.dialect);
    }

    match cli.command {
        Commands::Check {
            files,
            no_syntax,
            no_logic,
            format,
        } => {
            if no_syntax {
                config.run_syntax_check = false;
            }
            if no_logic {
                config.run_logic_analysis = false;
            }
            check_command(&config, &files, format, cli.verbose)
        }
        Commands::Rules => rules_command(&config),
        Commands::Init { path } => init_command(&path),
        Commands::Tables { file } => tables_command(&config, &file),
    }
}

/// Load the config named on the command line, or ./sqlcheck.toml when present
fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let default_path = Path::new(DEFAULT_CONFIG);
    if default_path.exists() {
        return Config::from_file(default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Check command - run every input through the checker
fn check_command(
    config: &Config,
    files: &[PathBuf],
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let checker = Checker::from_config(config);
    let options = config.check_options();
    let mut report = Report::new();

    if files.is_empty() {
        if verbose {
            eprintln!("{}", "Reading SQL from stdin...".cyan());
        }

        let mut sql = String::new();
        std::io::stdin()
            .read_to_string(&mut sql)
            .context("Failed to read stdin")?;

        check_input(&checker, &options, &mut report, "<stdin>", &sql);
    }

    for file in files {
        let sql = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        check_input(&checker, &options, &mut report, &file.display().to_string(), &sql);
    }

    match format {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => print_report(&report, &options),
    }

    // Exit with error code if there are errors
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Check one input and record it in the report
fn check_input(
    checker: &Checker,
    options: &CheckOptions,
    report: &mut Report,
    source: &str,
    sql: &str,
) {
    let result = checker.check(sql, options);

    tracing::debug!(
        source,
        valid = result.is_valid,
        warnings = result.warnings.len(),
        "checked input"
    );

    report.add_result(source, result);
}

/// Rules command - print the rule table after config adjustments
fn rules_command(config: &Config) -> Result<()> {
    let checker = Checker::from_config(config);

    println!("{}", "Logic rules (in evaluation order):".bold());
    println!();

    for rule in checker.rules().rules() {
        println!(
            "  {:<28} {:<14} {}",
            rule.code.as_str(),
            kind_label(rule.kind),
            rule.message
        );
    }

    if !config.rules.disabled.is_empty() {
        println!();
        println!("{}", "Disabled:".bold());
        for code in &config.rules.disabled {
            println!("  {}", code.as_str().dimmed());
        }
    }

    Ok(())
}

/// Init command - write a default config
fn init_command(path: &Path) -> Result<()> {
    if path.exists() {
        bail!(
            "{} already exists. Remove it first to generate a fresh config.",
            path.display()
        );
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "Wrote".green(), path.display());
    Ok(())
}

/// Tables command - list table and column references
fn tables_command(config: &Config, file: &Path) -> Result<()> {
    let sql = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let parser = SqlParser::from_dialect(config.dialect);
    if parser.get_ast(&sql).is_none() {
        bail!(
            "{} does not parse as {} SQL; run `sqlcheck check` for details",
            file.display(),
            config.dialect
        );
    }

    println!("{}", "Tables:".bold());
    for table in parser.extract_table_names(&sql) {
        println!("  {}", table);
    }

    println!("{}", "Columns:".bold());
    for column in parser.extract_column_references(&sql) {
        println!("  {}", column);
    }

    Ok(())
}

/// Print report summary to stdout
fn print_report(report: &Report, options: &CheckOptions) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "SQL Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    for file in &report.files {
        println!("{} {}", "Input:".bold(), file.source);
        print_result(&file.result, options);
        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  Inputs checked: {}", report.summary.inputs_checked);

    if report.summary.syntax_errors > 0 {
        println!(
            "  Syntax errors:  {}",
            report.summary.syntax_errors.to_string().red().bold()
        );
    } else {
        println!("  Syntax errors:  {}", "0".green());
    }

    if report.summary.errors > 0 {
        println!("  Errors:         {}", report.summary.errors.to_string().red().bold());
    } else {
        println!("  Errors:         {}", "0".green());
    }

    println!("  Warnings:       {}", report.summary.warnings.to_string().yellow());
    println!("  Info:           {}", report.summary.info);
    println!("  Optimizations:  {}", report.summary.optimizations);
    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_result(result: &CheckerResult, options: &CheckOptions) {
    if let Some(error) = &result.syntax_error {
        print!("  [{}] {}", "SYNTAX".red().bold(), error.message);
        if let Some(line) = error.line {
            print!(" (line {}", line);
            if let Some(column) = error.column {
                print!(", column {}", column);
            }
            print!(")");
        }
        println!();

        if let Some(expected) = &error.expected {
            println!("    Expected: {}", expected.join(", "));
        }
        return;
    }

    if result.warnings.is_empty() {
        if options.run_syntax_check {
            println!("  {}", "✓ Valid, no issues found".green());
        } else {
            println!("  {}", "✓ No issues found".green());
        }
        return;
    }

    for warning in &result.warnings {
        println!(
            "  [{}] {}: {}",
            kind_label(warning.kind),
            warning.code,
            warning.message
        );

        if let Some(suggestion) = &warning.suggestion {
            println!("    Suggestion: {}", suggestion.dimmed());
        }
    }
}

fn kind_label(kind: WarningKind) -> ColoredString {
    let label = kind.label().to_uppercase();
    let label = label.as_str();
    match kind {
        WarningKind::Error => label.red().bold(),
        WarningKind::Warning => label.yellow().bold(),
        WarningKind::Info => label.blue(),
        WarningKind::Optimization => label.purple(),
    }
}
