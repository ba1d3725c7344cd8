//! Configuration loader
//!
//! Loading pipeline:
//! 1. Size check and read (UTF-8 BOM stripped)
//! 2. Environment variable expansion on the raw text
//! 3. YAML parsing (JSON is accepted as a subset)
//! 4. Deserialization to [`RawSwapConfig`]
//! 5. Validation into a [`SwapConfig`]

use std::path::Path;

use crate::config::schema::{RawSwapConfig, SwapConfig};
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Options for the configuration loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    pub config_limits: ConfigLimits,
}

/// Limits guarding against oversized configuration files.
#[derive(Debug, Clone)]
pub struct ConfigLimits {
    /// Maximum configuration file size in bytes
    pub max_config_size: usize,
    /// Maximum number of entries in one trigger list
    pub max_triggers: usize,
}

impl Default for ConfigLimits {
    fn default() -> Self {
        Self {
            max_config_size: env_or("EQUIPSWAP_MAX_CONFIG_SIZE", 1024 * 1024),
            max_triggers: env_or("EQUIPSWAP_MAX_TRIGGERS", 1000),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    pub config: SwapConfig,
    pub warnings: Vec<LoadWarning>,
}

/// Warning during configuration loading.
#[derive(Debug, Clone)]
pub struct LoadWarning {
    pub message: String,
    pub location: Option<String>,
}

impl std::fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{} at {location}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    #[must_use]
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or too large, an environment
    /// reference cannot be resolved, parsing fails, or validation reports
    /// any error.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let limit = self.options.config_limits.max_config_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > limit {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {limit} bytes"),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: format!("cannot read file: {e}"),
        })?;

        self.load_str(&content, path)
    }

    /// Runs the pipeline on already-read text. `path` is used for messages.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load), minus the file checks.
    pub fn load_str(&self, content: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut warnings = Vec::new();
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut env = EnvExpander::default();
        let expanded = env.expand(content).map_err(|e| e.at(path))?;
        warnings.extend(env.unset.into_iter().map(|var| LoadWarning {
            message: format!("environment variable '{var}' is not set, using empty string"),
            location: Some(path.display().to_string()),
        }));

        let root: serde_yaml::Value =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "configuration file is empty".to_string(),
            });
        }
        if !root.is_mapping() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "top level must be a mapping of settings and trigger lists".to_string(),
            });
        }

        let raw: RawSwapConfig =
            serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("invalid configuration: {e}"),
            })?;

        let (config, result) = Validator::new().validate(&raw, &self.options.config_limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult { config, warnings })
    }
}

// ============================================================================
// Environment Variable Expansion
// ============================================================================

/// Expands `${VAR}`, `${VAR:-default}` and `${VAR:?message}` in raw text.
///
/// `$$` produces a literal `$`. Unset plain references expand to the empty
/// string and are recorded in `unset`.
#[derive(Debug, Default)]
struct EnvExpander {
    unset: Vec<String>,
}

/// Expansion failure, before the file path is known.
#[derive(Debug)]
enum ExpandError {
    Required { var: String, message: String },
    Unclosed { offset: usize },
}

impl ExpandError {
    fn at(self, path: &Path) -> ConfigError {
        match self {
            Self::Required { var, message } => ConfigError::EnvVarNotSet {
                var,
                location: format!("{}: {message}", path.display()),
            },
            Self::Unclosed { offset } => ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: format!("unclosed environment variable reference at byte {offset}"),
            },
        }
    }
}

impl EnvExpander {
    fn expand(&mut self, text: &str) -> Result<String, ExpandError> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        let mut offset = 0;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos + 1..];
            if let Some(after) = tail.strip_prefix('$') {
                out.push('$');
                offset += pos + 2;
                rest = after;
            } else if let Some(body) = tail.strip_prefix('{') {
                let close = closing_brace(body).ok_or(ExpandError::Unclosed {
                    offset: offset + pos,
                })?;
                out.push_str(&self.resolve(&body[..close])?);
                offset += pos + 2 + close + 1;
                rest = &body[close + 1..];
            } else {
                out.push('$');
                offset += pos + 1;
                rest = tail;
            }
        }
        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&mut self, reference: &str) -> Result<String, ExpandError> {
        let (var, fallback) = match reference.find(':') {
            Some(i) if reference[i + 1..].starts_with('-') => {
                (&reference[..i], Some(Fallback::Default(&reference[i + 2..])))
            }
            Some(i) if reference[i + 1..].starts_with('?') => {
                (&reference[..i], Some(Fallback::Required(&reference[i + 2..])))
            }
            _ => (reference, None),
        };

        if let Ok(value) = std::env::var(var) {
            return Ok(value);
        }
        match fallback {
            Some(Fallback::Default(default)) => Ok(default.to_string()),
            Some(Fallback::Required(message)) => Err(ExpandError::Required {
                var: var.to_string(),
                message: message.to_string(),
            }),
            None => {
                self.unset.push(var.to_string());
                Ok(String::new())
            }
        }
    }
}

enum Fallback<'a> {
    Default(&'a str),
    Required(&'a str),
}

/// Index of the `}` closing a reference body, honoring nested braces.
fn closing_brace(body: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in body.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads a numeric limit from the environment, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
