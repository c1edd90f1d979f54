//! `config validate` command
//!
//! Loads each file through the regular loader and reports errors and
//! warnings per file.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{ConfigValidateArgs, OutputFormat};
use crate::config::ConfigLoader;
use crate::error::{ConfigError, PunchlineError, Severity, ValidationIssue};

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    errors: Vec<IssueReport>,
    warnings: Vec<IssueReport>,
}

#[derive(Debug, Serialize)]
struct IssueReport {
    path: String,
    message: String,
}

impl From<&ValidationIssue> for IssueReport {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            path: issue.path.clone(),
            message: issue.message.clone(),
        }
    }
}

/// Validate configuration files.
///
/// # Errors
///
/// Returns an I/O error if any file does not exist, or a config error if
/// any file fails validation. With `--strict`, warnings count as failures.
pub fn validate(args: &ConfigValidateArgs) -> Result<(), PunchlineError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::with_capacity(args.files.len());

    for path in &args.files {
        if !path.exists() {
            return Err(PunchlineError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )));
        }
        tracing::info!(file = %path.display(), "validating configuration");
        reports.push(check_file(&loader, path, args.strict));
    }

    match args.format {
        OutputFormat::Human => {
            for report in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }

    let failed: Vec<&FileReport> = reports.iter().filter(|r| !r.valid).collect();
    if failed.is_empty() {
        return Ok(());
    }

    let files: Vec<&str> = failed.iter().map(|r| r.file.as_str()).collect();
    let errors = failed
        .iter()
        .flat_map(|r| r.errors.iter().chain(r.warnings.iter().filter(|_| args.strict)))
        .map(|issue| ValidationIssue {
            path: issue.path.clone(),
            message: issue.message.clone(),
            severity: Severity::Error,
        })
        .collect();

    Err(ConfigError::ValidationError {
        path: files.join(", "),
        errors,
    }
    .into())
}

fn check_file(loader: &ConfigLoader, path: &Path, strict: bool) -> FileReport {
    let file = path.display().to_string();
    let (errors, warnings): (Vec<IssueReport>, Vec<IssueReport>) = match loader.load(path) {
        Ok(result) => (Vec::new(), result.warnings.iter().map(Into::into).collect()),
        Err(ConfigError::ValidationError { errors, .. }) => {
            (errors.iter().map(Into::into).collect(), Vec::new())
        }
        Err(ConfigError::ParseError { line, message, .. }) => {
            let path = line.map_or_else(String::new, |l| format!("line {l}"));
            (vec![IssueReport { path, message }], Vec::new())
        }
        Err(e) => (
            vec![IssueReport {
                path: String::new(),
                message: e.to_string(),
            }],
            Vec::new(),
        ),
    };

    let valid = errors.is_empty() && !(strict && !warnings.is_empty());
    if valid {
        tracing::info!(file = %file, "configuration valid");
    }

    FileReport {
        file,
        valid,
        errors,
        warnings,
    }
}

fn print_human(report: &FileReport) {
    let status = if report.valid { "ok" } else { "invalid" };
    println!("{}: {status}", report.file);
    for issue in &report.errors {
        println!("  error: {}{}", issue.message, location(&issue.path));
    }
    for issue in &report.warnings {
        println!("  warning: {}{}", issue.message, location(&issue.path));
    }
}

fn location(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" ({path})")
    }
}
