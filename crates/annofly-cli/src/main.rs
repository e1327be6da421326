use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use annofly_core::{
    BatchReport, Config, ConstraintSet, RecordPosition, ValidationError, ValidationOutcome,
};
use annofly_engine::{BatchValidator, LoadedTemplate, RawRecord};

/// Annofly - template-driven validation and annotation extraction for JSON documents
#[derive(Parser)]
#[command(name = "annofly")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: annofly.toml)
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
    /// List the annotation fields a template exposes
    Fields {
        /// Template name or path
        template: String,

        /// Print the catalog as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Validate a single document against a template
    Check {
        /// Template name or path
        template: String,

        /// Path to the JSON document
        document: PathBuf,

        /// Write the outcome as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract annotation values from a valid document
    Extract {
        /// Template name or path
        template: String,

        /// Path to the JSON document
        document: PathBuf,

        /// Write extracted values to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a batch of documents and write a report
    Batch {
        /// Template name or path
        template: String,

        /// JSONL file, JSON array file, or directory of .json files
        input: PathBuf,

        /// Input format
        #[arg(long, value_enum, default_value_t = BatchFormat::Auto)]
        format: BatchFormat,

        /// Output file for the JSON report (default from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },
}

/// Batch input format
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BatchFormat {
    /// Detect from the file extension and contents
    Auto,
    /// One JSON record per line
    Jsonl,
    /// A single JSON array of records
    Array,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("annofly.toml").exists() {
        Config::from_file(Path::new("annofly.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match cli.command {
        Commands::Fields { template, json } => {
            fields_command(&config, &template, json, cli.verbose)
        }
        Commands::Check {
            template,
            document,
            output,
        } => check_command(&config, &template, &document, output.as_deref(), cli.verbose),
        Commands::Extract {
            template,
            document,
            output,
        } => extract_command(&config, &template, &document, output.as_deref(), cli.verbose),
        Commands::Batch {
            template,
            input,
            format,
            output,
            markdown,
        } => batch_command(
            &config,
            &template,
            &input,
            format,
            output.as_deref(),
            markdown.as_deref(),
            cli.verbose,
        ),
    }
}

/// Initialize tracing for logging
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Resolve a template argument, load it, and surface loader warnings
fn load_template(config: &Config, template: &str, verbose: bool) -> Result<LoadedTemplate> {
    let path = config.resolve_template(template);

    if verbose {
        eprintln!("{} {}", "Loading template from:".cyan(), path.display());
    }

    let source = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read template {}: {}", path.display(), e))?;
    let loaded = LoadedTemplate::load(&source)
        .map_err(|e| anyhow::anyhow!("Failed to load template {}: {}", path.display(), e))?;

    for warning in &loaded.schema.warnings {
        eprintln!("{} {}", "⚠ Warning:".yellow(), warning);
    }

    tracing::debug!(
        "loaded template '{}' with {} annotation fields",
        loaded.schema.name,
        loaded.catalog.len()
    );

    Ok(loaded)
}

/// Read and parse a JSON document from disk
fn load_document(path: &Path) -> Result<serde_json::Value> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read document {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Document {} is not valid JSON: {}", path.display(), e))
}

/// Fields command - list a template's annotation targets
fn fields_command(config: &Config, template: &str, json: bool, verbose: bool) -> Result<()> {
    let loaded = load_template(config, template, verbose)?;
    let catalog = loaded.catalog();

    if json {
        println!("{}", serde_json::to_string_pretty(catalog)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(60).bright_blue());
    println!(
        "{}",
        format!("Annotation Fields: {}", loaded.schema.name)
            .bold()
            .bright_blue()
    );
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if catalog.is_empty() {
        println!("{}", "No annotation fields declared".yellow());
    } else {
        for field in catalog {
            let marker = if field.required {
                "*".red().bold().to_string()
            } else {
                " ".to_string()
            };
            println!(
                " {} {}  {}",
                marker,
                field.path.bold(),
                format!("{}", field.field_type).cyan()
            );

            if !field.description.is_empty() {
                println!("      {}", field.description);
            }
            if !field.constraints.is_empty() {
                println!("      {}", describe_constraints(&field.constraints).dimmed());
            }
        }

        let required = catalog.iter().filter(|f| f.required).count();
        println!();
        println!("{} fields ({} required)", catalog.len(), required);
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());

    Ok(())
}

/// Check command - validate one document
fn check_command(
    config: &Config,
    template: &str,
    document_path: &Path,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let loaded = load_template(config, template, verbose)?;

    if verbose {
        eprintln!("{} {}", "Validating:".cyan(), document_path.display());
    }

    let document = load_document(document_path)?;
    let outcome = loaded.validate(&document);

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&outcome)?)?;
        if verbose {
            eprintln!("{} {}", "Outcome saved to:".green(), path.display());
        }
    }

    print_outcome_summary(&loaded.schema.name, &outcome);

    if !outcome.is_valid() {
        std::process::exit(1);
    }

    Ok(())
}

/// Extract command - pull annotation values out of a valid document
fn extract_command(
    config: &Config,
    template: &str,
    document_path: &Path,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let loaded = load_template(config, template, verbose)?;
    let document = load_document(document_path)?;

    // Extraction reads the normalized document, so coerced scalars come
    // back in their declared types
    let normalized = match loaded.validate(&document) {
        ValidationOutcome::Valid { value } => value,
        ValidationOutcome::Invalid { errors } => {
            println!(
                "{}",
                format!("✗ Document failed validation with {} errors", errors.len())
                    .red()
                    .bold()
            );
            println!();
            print_errors(&errors, "  ");
            std::process::exit(1);
        }
    };

    let values = loaded.extract(&normalized);
    let json = serde_json::to_string_pretty(&values)?;

    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            if verbose {
                eprintln!("{} {}", "Extracted values saved to:".green(), path.display());
            }
        }
        None => println!("{}", json),
    }

    Ok(())
}

/// Batch command - validate many records and write a report
fn batch_command(
    config: &Config,
    template: &str,
    input: &Path,
    format: BatchFormat,
    output: Option<&Path>,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let loaded = load_template(config, template, verbose)?;

    let records = collect_records(input, format, verbose)?;
    let total = records.len();

    if verbose {
        eprintln!("{} {} records...", "Validating".cyan(), total);
    }

    let cancel = AtomicBool::new(false);
    let validator = BatchValidator::new(&loaded.schema).with_cancel_flag(&cancel);

    let max_invalid = config.batch.max_invalid;
    let mut report = BatchReport::new(&loaded.schema.name);
    let mut invalid_seen = 0usize;

    for result in validator.stream(records) {
        if !result.outcome.is_valid() {
            invalid_seen += 1;
            if max_invalid > 0 && invalid_seen >= max_invalid {
                cancel.store(true, Ordering::Relaxed);
            }
        }
        report.add_record(result);
    }
    report.cancelled = report.summary.total < total;

    if report.cancelled {
        eprintln!(
            "{}",
            format!(
                "Stopped after {} invalid records ({} of {} processed)",
                invalid_seen, report.summary.total, total
            )
            .yellow()
        );
    }

    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.batch.report.clone());
    report.save_to_file(&output_path)?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output_path.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_batch_summary(&report);

    if report.has_invalid() {
        std::process::exit(1);
    }

    Ok(())
}

/// Read batch records from a file or a directory of .json files
fn collect_records(input: &Path, format: BatchFormat, verbose: bool) -> Result<Vec<RawRecord>> {
    if input.is_dir() {
        return collect_dir_records(input, verbose);
    }

    let contents = std::fs::read_to_string(input)
        .map_err(|e| anyhow::anyhow!("Failed to read input {}: {}", input.display(), e))?;

    let as_array = match format {
        BatchFormat::Jsonl => false,
        BatchFormat::Array => true,
        BatchFormat::Auto => detect_array(input, &contents),
    };

    if as_array {
        let value: serde_json::Value = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Input {} is not valid JSON: {}", input.display(), e))?;
        let serde_json::Value::Array(items) = value else {
            return Err(anyhow::anyhow!(
                "Input {} is not a JSON array. Use --format jsonl for one record per line.",
                input.display()
            ));
        };

        Ok(items
            .iter()
            .enumerate()
            .map(|(i, item)| RawRecord::new(RecordPosition::Index(i), item.to_string()))
            .collect())
    } else {
        Ok(contents
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| RawRecord::new(RecordPosition::Line(i + 1), line))
            .collect())
    }
}

/// Guess whether a batch input file holds a JSON array
fn detect_array(path: &Path, contents: &str) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonl") | Some("ndjson") => false,
        Some("json") => true,
        _ => contents.trim_start().starts_with('['),
    }
}

/// Collect records from .json files under a directory, sorted by path
fn collect_dir_records(dir: &Path, verbose: bool) -> Result<Vec<RawRecord>> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    files.sort();

    if verbose {
        eprintln!(
            "{} {} document files in {}",
            "Found".cyan(),
            files.len(),
            dir.display()
        );
    }

    let mut records = Vec::with_capacity(files.len());
    for path in files {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        records.push(RawRecord::new(
            RecordPosition::File(path.display().to_string()),
            text,
        ));
    }

    Ok(records)
}

/// Print a single-document outcome to stdout
fn print_outcome_summary(template: &str, outcome: &ValidationOutcome) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Document Validation".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Template:".bold(), template);
    println!();

    match outcome {
        ValidationOutcome::Valid { .. } => {
            println!("{}", "✓ Document is valid".green().bold());
        }
        ValidationOutcome::Invalid { errors } => {
            println!(
                "{}",
                format!("✗ {} validation errors", errors.len()).red().bold()
            );
            println!();
            print_errors(errors, "  ");
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Print batch report summary to stdout
fn print_batch_summary(report: &BatchReport) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Batch Validation Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!("Template: {}", report.template);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total records: {}", report.summary.total);
    println!("  Valid:   {}", format!("{}", report.summary.valid).green());

    if report.summary.invalid > 0 {
        println!(
            "  Invalid: {}",
            format!("{}", report.summary.invalid).red().bold()
        );
    } else {
        println!(
            "  Invalid: {}",
            format!("{}", report.summary.invalid).green()
        );
    }

    if report.cancelled {
        println!("  {}", "Run stopped before the end of the input".yellow());
    }
    println!();

    if !report.has_invalid() {
        println!("{}", "✓ All records valid!".green().bold());
    } else {
        println!("{}", "Invalid Records:".bold());
        for record in report.invalid_records() {
            println!();
            println!("  {}", format!("{}", record.position).bold());
            print_errors(record.outcome.errors(), "    ");
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Print validation errors with their locations
fn print_errors(errors: &[ValidationError], indent: &str) {
    for error in errors {
        println!(
            "{}[{}] {}: {}",
            indent,
            error.kind.as_str().red().bold(),
            error.path.bold(),
            error.message
        );
        if let Some(expected) = &error.expected {
            println!("{}  Expected: {}", indent, expected);
        }
        if let Some(actual) = &error.actual {
            println!("{}  Actual:   {}", indent, actual);
        }
    }
}

/// Render a constraint set as a short human-readable summary
fn describe_constraints(constraints: &ConstraintSet) -> String {
    let mut parts = Vec::new();

    match (constraints.min_length, constraints.max_length) {
        (Some(min), Some(max)) => parts.push(format!("length {}..{}", min, max)),
        (Some(min), None) => parts.push(format!("length >= {}", min)),
        (None, Some(max)) => parts.push(format!("length <= {}", max)),
        (None, None) => {}
    }

    match (constraints.min, constraints.max) {
        (Some(min), Some(max)) => parts.push(format!("range {}..{}", min, max)),
        (Some(min), None) => parts.push(format!(">= {}", min)),
        (None, Some(max)) => parts.push(format!("<= {}", max)),
        (None, None) => {}
    }

    if let Some(pattern) = &constraints.pattern {
        parts.push(format!("pattern {}", pattern));
    }

    if let Some(values) = &constraints.enum_values {
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        parts.push(format!("one of [{}]", rendered.join(", ")));
    }

    if let Some(ui) = constraints.ui {
        parts.push(format!("ui: {}", ui));
    }

    parts.join(", ")
}

/// Generate markdown report
fn generate_markdown_report(report: &BatchReport) -> String {
    let mut md = String::new();

    md.push_str("# Batch Validation Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));
    md.push_str(&format!("**Template:** {}\n\n", report.template));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Total records: {}\n", report.summary.total));
    md.push_str(&format!("- Valid: {}\n", report.summary.valid));
    md.push_str(&format!("- Invalid: {}\n", report.summary.invalid));
    if report.cancelled {
        md.push_str("- Run stopped before the end of the input\n");
    }
    md.push_str("\n");

    if !report.has_invalid() {
        md.push_str("✅ **All records valid!**\n");
    } else {
        md.push_str("## Invalid Records\n\n");

        for record in report.invalid_records() {
            md.push_str(&format!("### ❌ {}\n\n", record.position));

            for error in record.outcome.errors() {
                md.push_str(&format!(
                    "- **{}** at `{}`: {}\n",
                    error.kind, error.path, error.message
                ));
                if let Some(expected) = &error.expected {
                    md.push_str(&format!("  - Expected: `{}`\n", expected));
                }
                if let Some(actual) = &error.actual {
                    md.push_str(&format!("  - Actual: `{}`\n", actual));
                }
            }

            md.push_str("\n");
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_detect_array() {
        assert!(detect_array(Path::new("records.json"), "{}"));
        assert!(!detect_array(Path::new("records.jsonl"), "["));
        assert!(!detect_array(Path::new("records.ndjson"), "["));
        assert!(detect_array(Path::new("records.txt"), "  [\n{}]"));
        assert!(!detect_array(Path::new("records.txt"), "{\"a\": 1}"));
    }

    #[test]
    fn test_describe_constraints() {
        let constraints = ConstraintSet::new()
            .with_min_length(5)
            .with_max_length(200)
            .with_enum_values(vec![serde_json::json!("draft"), serde_json::json!("final")]);
        let summary = describe_constraints(&constraints);
        assert!(summary.contains("length 5..200"));
        assert!(summary.contains("one of [\"draft\", \"final\"]"));
    }
}
