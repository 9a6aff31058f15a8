use crate::config::schema::{EngineConfig, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up by [`discover`].
pub const CONFIG_FILE_NAME: &str = "srctree.toml";

/// Where a configuration came from, for error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Text handed to [`load_from_str`]
    Inline,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Inline => write!(f, "inline srctree config"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read as UTF-8 text
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed TOML, a wrongly typed value or an unknown key
    Toml {
        origin: ConfigSource,
        source: toml_edit::de::Error,
    },
    /// Well-formed TOML whose settings the engine cannot use
    Validation {
        origin: ConfigSource,
        source: ValidationError,
    },
}

impl ConfigError {
    /// The config file involved, if the config came from a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Io { path, .. } => Some(path),
            ConfigError::Toml { origin, .. } | ConfigError::Validation { origin, .. } => match origin {
                ConfigSource::File(path) => Some(path),
                ConfigSource::Inline => None,
            },
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "cannot read {CONFIG_FILE_NAME} at {}: {source}", path.display())
            }
            ConfigError::Toml { origin, source } => {
                write!(f, "{origin} is not a valid {CONFIG_FILE_NAME}: {source}")
            }
            ConfigError::Validation { origin, source } => {
                let count = source.issues.len();
                let noun = if count == 1 { "setting" } else { "settings" };
                writeln!(f, "{origin} has {count} unusable {noun}:")?;
                for issue in &source.issues {
                    writeln!(f, "  - {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

fn parse(input: &str, origin: ConfigSource) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Toml { origin, source }),
    };
    match config.validate() {
        Ok(()) => Ok(config),
        Err(source) => Err(ConfigError::Validation { origin, source }),
    }
}

/// Parse and validate configuration text that did not come from a file.
pub fn load_from_str(input: &str) -> Result<EngineConfig, ConfigError> {
    parse(input, ConfigSource::Inline)
}

/// Read, parse and validate the config file at `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loading config");
    parse(&contents, ConfigSource::File(path.to_path_buf()))
}

/// Nearest `srctree.toml` in `start` or one of its ancestors.
///
/// `start` may be a file, in which case the search begins at its directory.
pub fn discover(start: impl AsRef<Path>) -> Option<PathBuf> {
    let start = start.as_ref();
    let dir = if start.is_file() { start.parent()? } else { start };
    let found = dir
        .ancestors()
        .map(|d| d.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.is_file());
    if let Some(path) = &found {
        debug!(path = %path.display(), "discovered config");
    }
    found
}

/// Load the config at `explicit`, else the discovered one, else defaults.
pub fn load_for(explicit: Option<&Path>, start: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    match explicit.map(Path::to_path_buf).or_else(|| discover(start)) {
        Some(path) => load_from_path(path),
        None => Ok(EngineConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ValidationIssue;
    use crate::edit::WriteMode;
    use crate::render::ColorScheme;
    use tempfile::TempDir;

    #[test]
    fn test_empty_input_gives_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.ignore, vec!["build", ".git", ".github"]);
        assert_eq!(config.write_mode(), WriteMode::Overwrite);
    }

    #[test]
    fn test_full_config() {
        let config = load_from_str(
            r#"
encoding = "latin1"
extensions = ["py", "pyi"]
ignore = ["build", "*_test.py"]
include = ["*.txt"]
property_markers = ["property", "lazy_property"]

[display]
color_scheme = "no-color"
line_numbers = false

[edit]
overwrite = false
"#,
        )
        .unwrap();

        assert_eq!(config.text_encoding().unwrap().name(), "windows-1252");
        assert_eq!(config.extensions, vec!["py", "pyi"]);
        assert_eq!(config.display.color_scheme, ColorScheme::NoColor);
        assert!(!config.display_params().line_numbers);
        assert_eq!(config.write_mode(), WriteMode::Copy);
        assert!(config.tree_builder().is_ok());
    }

    #[test]
    fn test_validation_collects_issues() {
        let err = load_from_str(
            r#"
encoding = "klingon"
extensions = [".py"]
ignore = ["a[b"]
property_markers = ["@property"]
"#,
        )
        .unwrap_err();

        let ConfigError::Validation { source, .. } = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(source.issues.len(), 4);
        assert_eq!(
            source.issues[0],
            ValidationIssue::UnknownEncoding("klingon".to_string())
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = load_from_str("colour = true\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Toml {
                origin: ConfigSource::Inline,
                ..
            }
        ));
        assert!(err.path().is_none());
        assert!(err.to_string().starts_with("inline srctree config is not a valid srctree.toml"));
    }

    #[test]
    fn test_path_attached_to_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "extensions = []\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
        assert_eq!(err.path(), Some(path.as_path()));
        assert_eq!(
            err.to_string(),
            format!(
                "{} has 1 unusable setting:\n  - 'extensions' must not be empty\n",
                path.display()
            )
        );
    }

    #[test]
    fn test_unreadable_config_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, b"encoding = \"\xff\"\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read srctree.toml at "));
    }

    #[test]
    fn test_discover_walks_ancestors() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("pkg").join("sub");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "encoding = \"utf-8\"\n").unwrap();
        fs::write(nested.join("mod.py"), "x = 1\n").unwrap();

        assert_eq!(
            discover(nested.join("mod.py")),
            Some(dir.path().join(CONFIG_FILE_NAME))
        );
        assert_eq!(discover(&nested), Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn test_load_for_prefers_explicit() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "extensions = [\"py\"]\n").unwrap();
        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "extensions = [\"pyx\"]\n").unwrap();

        let config = load_for(Some(&explicit), dir.path()).unwrap();
        assert_eq!(config.extensions, vec!["pyx"]);
        let config = load_for(None, dir.path()).unwrap();
        assert_eq!(config.extensions, vec!["py"]);
    }
}
