//! `validate` command
//!
//! Loads each file through the full pipeline and reports every issue.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadResult};
use crate::error::{ConfigError, EquipSwapError, Severity, ValidationIssue};

#[derive(Debug, Serialize)]
struct FileReport {
    path: String,
    valid: bool,
    triggers: usize,
    warnings: Vec<String>,
    errors: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    total: usize,
    valid: usize,
    invalid: usize,
}

#[derive(Debug, Serialize)]
struct Report {
    files: Vec<FileReport>,
    summary: Summary,
}

/// Validate configuration files.
///
/// # Errors
///
/// Returns the first file's failure after reporting on every file. With
/// `--strict`, warnings count as failures.
pub fn run(args: &ValidateArgs) -> Result<(), EquipSwapError> {
    let loader = ConfigLoader::with_defaults();
    let mut files = Vec::with_capacity(args.files.len());
    let mut first_failure: Option<ConfigError> = None;

    for path in &args.files {
        tracing::debug!(file = %path.display(), "validating configuration");
        let outcome = loader.load(path).and_then(|result| strict_check(result, path, args.strict));

        let report = match outcome {
            Ok(result) => FileReport {
                path: path.display().to_string(),
                valid: true,
                triggers: result.config.triggers.len(),
                warnings: result.warnings.iter().map(ToString::to_string).collect(),
                errors: Vec::new(),
            },
            Err(e) => {
                let errors = match &e {
                    ConfigError::ValidationError { errors, .. } => {
                        errors.iter().map(ToString::to_string).collect()
                    }
                    other => vec![other.to_string()],
                };
                first_failure.get_or_insert(e);
                FileReport {
                    path: path.display().to_string(),
                    valid: false,
                    triggers: 0,
                    warnings: Vec::new(),
                    errors,
                }
            }
        };
        files.push(report);
    }

    let valid = files.iter().filter(|f| f.valid).count();
    let report = Report {
        summary: Summary {
            total: files.len(),
            valid,
            invalid: files.len() - valid,
        },
        files,
    };

    match args.format {
        OutputFormat::Human => print_human(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    first_failure.map_or(Ok(()), |e| Err(e.into()))
}

/// Under `--strict`, turns loader warnings into a validation failure.
fn strict_check(result: LoadResult, path: &Path, strict: bool) -> Result<LoadResult, ConfigError> {
    if !strict || result.warnings.is_empty() {
        return Ok(result);
    }
    let errors = result
        .warnings
        .into_iter()
        .map(|w| ValidationIssue {
            path: w.location.unwrap_or_else(|| path.display().to_string()),
            message: w.message,
            severity: Severity::Error,
        })
        .collect();
    Err(ConfigError::ValidationError {
        path: path.display().to_string(),
        errors,
    })
}

fn print_human(report: &Report) {
    for file in &report.files {
        if file.valid {
            println!("✓ {} ({} triggers)", file.path, file.triggers);
            for warning in &file.warnings {
                println!("    warning: {warning}");
            }
        } else {
            println!("✗ {}", file.path);
            for error in &file.errors {
                println!("    {error}");
            }
        }
    }
    println!(
        "\n{} file(s) checked, {} valid, {} invalid",
        report.summary.total, report.summary.valid, report.summary.invalid
    );
}
