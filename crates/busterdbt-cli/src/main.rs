use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use walkdir::WalkDir;

use busterdbt_core::{Config, Issue, ModelIssues, OutputModel, Severity, TransformReport};
use busterdbt_dbt::{
    contains_todo_markers, detect_file_type, load_file, validate_dbt_file_for_transformation,
    LoadError, LoadedFile,
};
use busterdbt_engine::{transform_source, TransformError};

/// busterdbt - Turn dbt schema files into Buster semantic models
#[derive(Parser)]
#[command(name = "busterdbt")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: busterdbt.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform dbt schema files into Buster models
    Transform {
        /// YAML files or directories to scan
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Write the models as JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a report.json with statistics and issues
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Load and validate files without transforming them
    Validate {
        /// YAML files or directories to scan
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print the detected shape of a file
    Detect {
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Transform { inputs, output, report } => {
            transform_command(&config, &inputs, output.as_deref(), report.as_deref(), cli.verbose)
        }
        Commands::Validate { inputs } => validate_command(&config, &inputs, cli.verbose),
        Commands::Detect { file } => detect_command(&file),
    }
}

/// Diagnostics go to stderr; `--verbose` shows debug output
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(config_path) = path {
        return Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()));
    }

    let default_path = Path::new("busterdbt.toml");
    if default_path.exists() {
        return Config::from_file(default_path).context("Failed to load busterdbt.toml");
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

/// Expand inputs into YAML files; directories are walked recursively
fn collect_yaml_files(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(input)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && is_yaml(e.path()))
                .map(|e| e.path().to_path_buf())
                .collect();
            found.sort();
            files.extend(found);
        } else if input.exists() {
            files.push(input.clone());
        } else {
            anyhow::bail!("Input not found: {}", input.display());
        }
    }

    Ok(files)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yml" || ext == "yaml")
}

/// Anchor issue paths at the file they came from
fn tag_with_file(file: &Path, group: ModelIssues) -> ModelIssues {
    let issues = group
        .issues
        .into_iter()
        .map(|issue| {
            let path = if issue.path.is_empty() {
                file.display().to_string()
            } else {
                format!("{}:{}", file.display(), issue.path)
            };
            issue.at(path)
        })
        .collect();

    ModelIssues {
        model: group.model,
        issues,
    }
}

/// Result of transforming a batch of files
#[derive(Debug, Default)]
struct TransformRun {
    models: Vec<OutputModel>,
    issues: Vec<ModelIssues>,

    /// Files whose shape was neither dbt nor Buster
    skipped: Vec<PathBuf>,
}

fn transform_files(files: &[PathBuf], config: &Config) -> Result<TransformRun> {
    let mut run = TransformRun::default();

    for file in files {
        let text = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))?;

        match transform_source(&text, config) {
            Ok(outcome) => {
                tracing::debug!(file = %file.display(), models = outcome.models.len(), "Transformed file");
                run.models.extend(outcome.models);
                run.issues
                    .extend(outcome.issues.into_iter().map(|g| tag_with_file(file, g)));
            }
            Err(TransformError::Load(LoadError::UnknownFileType)) => {
                run.skipped.push(file.clone());
            }
            Err(e) => {
                tracing::error!(file = %file.display(), error = %e, "Failed to transform file");
                run.issues
                    .push(tag_with_file(file, ModelIssues::file(e.to_issues())));
            }
        }
    }

    Ok(run)
}

/// Transform command - convert every input file and write the models
fn transform_command(
    config: &Config,
    inputs: &[PathBuf],
    output: Option<&Path>,
    report_path: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let files = collect_yaml_files(inputs)?;

    if verbose {
        eprintln!("{} {} YAML file(s)", "Transforming".cyan(), files.len());
    }

    let run = transform_files(&files, config)?;

    for skipped in &run.skipped {
        eprintln!(
            "{} {} (not a dbt or Buster file)",
            "Skipping".yellow(),
            skipped.display()
        );
    }

    let json = serde_json::to_string_pretty(&run.models)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if verbose {
                eprintln!("{} {}", "Models saved to:".green(), path.display());
            }
        }
        None => println!("{}", json),
    }

    let report = TransformReport::new(&run.models, run.issues);

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_report_summary(&report);

    // Exit with error code if there are errors
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Load one file and run file-level checks; `None` when the file shape is unknown
fn validate_file(file: &Path, config: &Config) -> Option<Vec<Issue>> {
    let issues = match load_file(file) {
        Ok(LoadedFile::Dbt(dbt)) => validate_dbt_file_for_transformation(&dbt).into_issues(),
        Ok(LoadedFile::Buster(_)) => Vec::new(),
        Err(LoadError::UnknownFileType) => return None,
        Err(e) => e.to_issues(),
    };

    Some(issues.into_iter().map(|i| config.severity.apply(i)).collect())
}

/// Validate command - load each file and run file-level checks
fn validate_command(config: &Config, inputs: &[PathBuf], verbose: bool) -> Result<()> {
    let files = collect_yaml_files(inputs)?;
    let mut error_count = 0;

    for file in &files {
        let Some(issues) = validate_file(file, config) else {
            eprintln!("{} {} (not a dbt or Buster file)", "Skipping".yellow(), file.display());
            continue;
        };

        let errors = issues.iter().filter(|i| i.is_error()).count();
        error_count += errors;

        if issues.is_empty() {
            if verbose {
                println!("{} {}", "✓".green(), file.display());
            }
            continue;
        }

        let marker = if errors > 0 { "✗".red() } else { "!".yellow() };
        println!("{} {}", marker, file.display());
        for issue in &issues {
            print_issue(issue);
        }
    }

    println!();
    if error_count > 0 {
        println!("{} error(s) in {} file(s)", error_count.to_string().red().bold(), files.len());
        std::process::exit(1);
    }

    println!("{}", format!("✓ {} file(s) valid", files.len()).green().bold());
    Ok(())
}

/// Detect command - print the sniffed file shape
fn detect_command(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    if contains_todo_markers(&text) {
        anyhow::bail!("{} contains {{{{TODO}}}} markers", file.display());
    }

    let document: serde_yaml::Value = serde_yaml::from_str(&text)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    println!("{}", detect_file_type(&document));
    Ok(())
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warn => "WARN".yellow().bold(),
        Severity::Info => "INFO".cyan(),
    }
}

fn print_issue(issue: &Issue) {
    println!("  [{}] {}: {}", severity_label(issue.severity), issue.code, issue.message);
    if !issue.path.is_empty() {
        println!("    at {}", issue.path);
    }
}

/// Print report summary to stderr (stdout may carry the models)
fn print_report_summary(report: &TransformReport) {
    eprintln!("\n{}", "=".repeat(60).bright_blue());
    eprintln!("{}", "Transform Report".bold().bright_blue());
    eprintln!("{}", "=".repeat(60).bright_blue());
    eprintln!();

    let stats = &report.stats;
    eprintln!("{}", "Summary:".bold());
    eprintln!("  Models:        {}", stats.models);
    eprintln!("  Dimensions:    {}", stats.dimensions);
    eprintln!("  Measures:      {}", stats.measures);
    eprintln!("  Metrics:       {}", stats.metrics);
    eprintln!("  Filters:       {}", stats.filters);
    eprintln!("  Relationships: {}", stats.relationships);

    if stats.errors > 0 {
        eprintln!("  Errors:        {}", stats.errors.to_string().red().bold());
    } else {
        eprintln!("  Errors:        {}", stats.errors.to_string().green());
    }

    if stats.warnings > 0 {
        eprintln!("  Warnings:      {}", stats.warnings.to_string().yellow());
    } else {
        eprintln!("  Warnings:      {}", stats.warnings.to_string().green());
    }
    eprintln!();

    if report.issues.iter().all(|g| g.issues.is_empty()) {
        eprintln!("{}", "✓ No issues found!".green().bold());
        return;
    }

    eprintln!("{}", "Issues:".bold());
    for group in &report.issues {
        if let Some(model) = &group.model {
            eprintln!("  {}", model.bold());
        }
        for issue in &group.issues {
            eprintln!("    [{}] {}: {}", severity_label(issue.severity), issue.code, issue.message);
            if !issue.path.is_empty() {
                eprintln!("      at {}", issue.path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busterdbt_core::IssueCode;
    use std::fs;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn collects_yaml_files_recursively() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.yaml"), "").unwrap();
        fs::write(dir.path().join("a.yml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        fs::write(dir.path().join("nested/c.yml"), "").unwrap();

        let files = collect_yaml_files(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();

        assert_eq!(names, vec!["a.yml", "b.yaml", "nested/c.yml"]);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_yaml_files(&[dir.path().join("missing.yml")]).is_err());
    }

    #[test]
    fn transforms_batch_and_skips_unknown_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("orders.yml"),
            "models:\n  - name: orders\n    columns:\n      - name: order_id\n",
        )
        .unwrap();
        fs::write(dir.path().join("sources.yml"), "sources:\n  - name: raw\n").unwrap();
        fs::write(dir.path().join("broken.yml"), "models:\n  - columns: []\n").unwrap();

        let files = collect_yaml_files(&[dir.path().to_path_buf()]).unwrap();
        let run = transform_files(&files, &Config::default()).unwrap();

        assert_eq!(run.models.len(), 1);
        assert_eq!(run.models[0].name, "orders");
        assert_eq!(run.skipped.len(), 1);
        assert!(run.skipped[0].ends_with("sources.yml"));

        let broken = &run.issues[0].issues[0];
        assert_eq!(broken.code, IssueCode::MissingField);
        assert!(broken.path.ends_with("broken.yml:models[0].name"));
    }

    #[test]
    fn validate_applies_severity_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders_sm.yml");
        fs::write(
            &path,
            "semantic_models:\n  - name: orders_sm\n    model: ref('orders')\n",
        )
        .unwrap();

        let issues = validate_file(&path, &Config::default()).unwrap();
        assert_eq!(issues[0].code, IssueCode::MissingBaseModel);
        assert_eq!(issues[0].severity, Severity::Warn);

        let config = Config::from_toml("[severity.overrides]\nMISSING_BASE_MODEL = \"error\"\n").unwrap();
        let issues = validate_file(&path, &config).unwrap();
        assert_eq!(issues[0].code, IssueCode::MissingBaseModel);
        assert!(issues[0].is_error());

        let unknown = dir.path().join("sources.yml");
        fs::write(&unknown, "sources:\n  - name: raw\n").unwrap();
        assert!(validate_file(&unknown, &config).is_none());
    }
}
