//! metamodel-schema CLI
//!
//! Command-line interface for exporting meta-models to schema documents,
//! importing them back, and linting document sets.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use metamodel_schema::{
    export_package, import_documents, is_url, lint, load_document_auto, load_documents,
    load_package, save_packages, write_documents, ExportOptions, FileStatus, ImportOptions,
    SchemaNode, Severity, SCHEMA_DIALECT,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "metamodel-schema")]
#[command(about = "Translate between meta-models and JSON schema documents")]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a model file to one schema document per classifier
    Export {
        /// Package tree persisted as JSON
        model: PathBuf,

        /// Output directory (stdout as a single JSON object if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Omit $schema from exported documents
        #[arg(long)]
        no_dialect: bool,
    },

    /// Import schema documents (files, directories or URLs) into packages
    Import {
        /// Document sources
        #[arg(required = true)]
        sources: Vec<String>,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Synthesize a placeholder when an opposite names a missing reference
        #[arg(long)]
        lenient_opposites: bool,
    },

    /// Lint schema documents for errors (syntax, vocabulary, identity, dangling refs)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Export {
            model,
            output,
            pretty,
            no_dialect,
        } => run_export(&model, output.as_deref(), pretty, no_dialect),

        Commands::Import {
            sources,
            output,
            pretty,
            lenient_opposites,
        } => run_import(&sources, output.as_deref(), pretty, lenient_opposites),

        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run_export(model: &Path, output: Option<&Path>, pretty: bool, no_dialect: bool) -> Result<(), u8> {
    let package = load_package(model).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let dialect = (!no_dialect).then_some(SCHEMA_DIALECT);
    let options = ExportOptions::new().dialect(dialect);
    let documents = export_package(&package, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match output {
        Some(dir) => {
            let written = write_documents(dir, &documents, pretty).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            info!("wrote {} documents to {}", written.len(), dir.display());
        }
        None => print_json(&documents, pretty)?,
    }

    Ok(())
}

fn run_import(
    sources: &[String],
    output: Option<&Path>,
    pretty: bool,
    lenient_opposites: bool,
) -> Result<(), u8> {
    let documents = load_sources(sources).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    info!("loaded {} documents", documents.len());

    let options = ImportOptions::new().strict_opposites(!lenient_opposites);
    let packages = import_documents(&documents, &options).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    match output {
        Some(path) => {
            save_packages(path, &packages, pretty).map_err(|e| {
                eprintln!("Error: {}", e);
                e.exit_code() as u8
            })?;
            info!("wrote {} packages to {}", packages.len(), path.display());
        }
        None => print_json(&packages, pretty)?,
    }

    Ok(())
}

/// URLs are fetched one by one; paths may be files or directories.
fn load_sources(sources: &[String]) -> Result<Vec<SchemaNode>, metamodel_schema::LoadError> {
    let mut documents = Vec::new();
    for source in sources {
        if is_url(source) {
            documents.push(load_document_auto(source)?);
        } else {
            documents.extend(load_documents(&[PathBuf::from(source)])?);
        }
    }
    Ok(documents)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", json_output);
    Ok(())
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(3);
    }

    let result = lint(path, strict);

    if format == "json" {
        print_json(&result, true)?;
    } else {
        // Text output
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
