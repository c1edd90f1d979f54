//! Configuration loader
//!
//! Pipeline:
//! 1. Size check and read
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing (an empty document yields the defaults)
//! 4. Validation

use std::path::Path;

use crate::config::schema::RevealConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, Severity, ValidationIssue};

/// Largest configuration file accepted by default.
pub const DEFAULT_MAX_CONFIG_SIZE: u64 = 64 * 1024;

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: DEFAULT_MAX_CONFIG_SIZE,
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: RevealConfig,

    /// Warnings from env expansion and validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Loads `punchline` YAML configuration files.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, if the YAML
    /// does not parse into [`RevealConfig`], or if validation reports
    /// errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        if metadata.len() > self.options.max_config_size {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: self.options.max_config_size,
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        self.load_str(&raw, path)
    }

    /// Loads configuration from already-read text. `origin` is only used
    /// for error messages.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], minus the file checks.
    pub fn load_str(&self, raw: &str, origin: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new();
        let substituted = env_sub.substitute(raw, origin)?;
        let mut warnings = env_sub.warnings;

        let value: serde_yaml::Value =
            serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        let config: RevealConfig = if value.is_null() {
            RevealConfig::default()
        } else {
            serde_yaml::from_value(value).map_err(|e| ConfigError::ParseError {
                path: origin.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?
        };

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: origin.display().to_string(),
                errors: result.errors,
            });
        }
        warnings.extend(result.warnings);

        Ok(LoadResult { config, warnings })
    }
}

// ============================================================================
// Environment substitution
// ============================================================================

struct EnvSubstitution {
    warnings: Vec<ValidationIssue>,
}

impl EnvSubstitution {
    const fn new() -> Self {
        Self {
            warnings: Vec::new(),
        }
    }

    /// Substitutes environment variables in raw YAML text.
    ///
    /// Supports:
    /// - `${VAR}` - expand to value (empty string if unset, with warning)
    /// - `${VAR:-default}` - expand to default if unset
    /// - `$$` - literal `$`
    fn substitute(&mut self, raw: &str, origin: &Path) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            match chars.peek() {
                Some('$') => {
                    chars.next();
                    result.push('$');
                }
                Some('{') => {
                    chars.next();
                    let (name, default) = Self::parse_var_spec(&mut chars, origin)?;
                    match std::env::var(&name) {
                        Ok(value) => result.push_str(&value),
                        Err(_) => {
                            if let Some(default) = default {
                                result.push_str(&default);
                            } else {
                                self.warnings.push(ValidationIssue {
                                    path: format!("${{{name}}}"),
                                    message: format!(
                                        "Environment variable '{name}' is not set, using empty string"
                                    ),
                                    severity: Severity::Warning,
                                });
                            }
                        }
                    }
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    /// Parses the inside of `${...}` into `(name, default)`.
    fn parse_var_spec(
        chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
        origin: &Path,
    ) -> Result<(String, Option<String>), ConfigError> {
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => return Ok((name, None)),
                ':' if chars.peek() == Some(&'-') => {
                    chars.next();
                    let mut default = String::new();
                    for d in chars.by_ref() {
                        if d == '}' {
                            return Ok((name, Some(default)));
                        }
                        default.push(d);
                    }
                    break;
                }
                _ => name.push(c),
            }
        }

        Err(ConfigError::ParseError {
            path: origin.to_path_buf(),
            line: None,
            message: format!("Unclosed environment variable reference: ${{{name}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    fn substitute(raw: &str) -> (String, usize) {
        let mut sub = EnvSubstitution::new();
        let out = sub.substitute(raw, Path::new("test.yaml")).unwrap();
        (out, sub.warnings.len())
    }

    #[test]
    fn test_env_substitution_default() {
        let (out, warnings) = substitute("endpoint: ${PUNCHLINE_TEST_UNSET_A:-http://localhost/j}");
        assert_eq!(out, "endpoint: http://localhost/j");
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_env_substitution_missing_warns() {
        let (out, warnings) = substitute("endpoint: \"${PUNCHLINE_TEST_UNSET_B}\"");
        assert_eq!(out, "endpoint: \"\"");
        assert_eq!(warnings, 1);
    }

    #[test]
    fn test_env_substitution_escaped_dollar() {
        let (out, _) = substitute("price: $$5 and $x");
        assert_eq!(out, "price: $5 and $x");
    }

    #[test]
    fn test_env_substitution_path_is_set() {
        // PATH is present in any test environment.
        let (out, warnings) = substitute("${PATH}");
        assert!(!out.is_empty());
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_env_substitution_unclosed() {
        let mut sub = EnvSubstitution::new();
        let err = sub.substitute("a: ${OOPS", Path::new("x.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let loader = ConfigLoader::with_defaults();
        let result = loader.load_str("", Path::new("empty.yaml")).unwrap();
        assert_eq!(result.config, RevealConfig::default());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_bom_is_stripped() {
        let loader = ConfigLoader::with_defaults();
        let result = loader
            .load_str("\u{feff}request_timeout: 3s\n", Path::new("bom.yaml"))
            .unwrap();
        assert_eq!(result.config.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_parse_error_has_line() {
        let loader = ConfigLoader::with_defaults();
        let err = loader
            .load_str("timings:\n  setup_hold: [\n", Path::new("bad.yaml"))
            .unwrap_err();
        match err {
            ConfigError::ParseError { line, .. } => assert!(line.is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_errors_surface() {
        let loader = ConfigLoader::with_defaults();
        let err = loader
            .load_str("endpoint: ftp://nope/\n", Path::new("ftp.yaml"))
            .unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                assert_eq!(errors[0].path, "endpoint");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_huge_delays_are_rejected_not_summed() {
        let loader = ConfigLoader::with_defaults();
        let err = loader
            .load_str(
                "timings:\n  setup_hold: 10000000000000000000s\n  suspense_hold: 10000000000000000000s\n",
                Path::new("huge.yaml"),
            )
            .unwrap_err();
        match err {
            ConfigError::ValidationError { errors, .. } => {
                let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();
                assert_eq!(paths, vec!["timings.setup_hold", "timings.suspense_hold"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_warnings_are_returned() {
        let loader = ConfigLoader::with_defaults();
        let result = loader
            .load_str("timings:\n  setup_hold: 0s\n", Path::new("w.yaml"))
            .unwrap();
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "timings.setup_hold");
    }

    #[test]
    fn test_missing_file() {
        let loader = ConfigLoader::with_defaults();
        let err = loader.load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile { .. }));
    }

    #[test]
    fn test_too_large() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&vec![b'#'; 128]).unwrap();
        let loader = ConfigLoader::new(LoaderOptions {
            max_config_size: 64,
        });
        let err = loader.load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge { size: 128, limit: 64, .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timings:\n  summon_delay: 10ms").unwrap();
        let result = ConfigLoader::with_defaults().load(file.path()).unwrap();
        assert_eq!(result.config.timings.summon_delay, Duration::from_millis(10));
    }
}
