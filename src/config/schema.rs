use crate::edit::WriteMode;
use crate::encoding::{EncodingError, TextEncoding};
use crate::render::{ColorScheme, DisplayParams};
use crate::tree::{StructuralParser, TreeBuilder, DEFAULT_IGNORE_PATHS, DEFAULT_PROPERTY_MARKERS};
use serde::Deserialize;
use std::fmt;

/// Contents of a `srctree.toml` file. Every key is optional.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// WHATWG label of the encoding used to read and write source files
    pub encoding: String,
    /// Extensions (without the dot) of files parsed structurally
    pub extensions: Vec<String>,
    pub ignore: Vec<String>,
    /// Globs of extra files added to directory trees without parsing
    pub include: Vec<String>,
    /// Decorator names that turn a function into a property
    pub property_markers: Vec<String>,
    pub display: DisplayConfig,
    pub edit: EditConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            extensions: vec!["py".to_string()],
            ignore: DEFAULT_IGNORE_PATHS.iter().map(|s| s.to_string()).collect(),
            include: Vec::new(),
            property_markers: DEFAULT_PROPERTY_MARKERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            display: DisplayConfig::default(),
            edit: EditConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    pub color_scheme: ColorScheme,
    pub line_numbers: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let params = DisplayParams::default();
        Self {
            color_scheme: params.color_scheme,
            line_numbers: params.line_numbers,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct EditConfig {
    /// Write confirmed edits over the original files instead of `_copy` siblings
    pub overwrite: bool,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self { overwrite: true }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if let Err(EncodingError::UnknownLabel(label)) = TextEncoding::for_label(&self.encoding) {
            issues.push(ValidationIssue::UnknownEncoding(label));
        }

        if self.extensions.is_empty() {
            issues.push(ValidationIssue::EmptyList { field: "extensions" });
        }
        for ext in &self.extensions {
            if ext.trim().is_empty() || ext.starts_with('.') {
                issues.push(ValidationIssue::InvalidValue {
                    field: "extensions",
                    value: ext.clone(),
                    message: "expected an extension without the leading dot".to_string(),
                });
            }
        }

        for (field, patterns) in [("ignore", &self.ignore), ("include", &self.include)] {
            for pattern in patterns {
                if let Err(err) = globset::Glob::new(pattern) {
                    issues.push(ValidationIssue::InvalidValue {
                        field,
                        value: pattern.clone(),
                        message: err.kind().to_string(),
                    });
                }
            }
        }

        for marker in &self.property_markers {
            if marker.trim().is_empty() || marker.starts_with('@') {
                issues.push(ValidationIssue::InvalidValue {
                    field: "property_markers",
                    value: marker.clone(),
                    message: "expected a decorator name without '@'".to_string(),
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn text_encoding(&self) -> Result<TextEncoding, EncodingError> {
        TextEncoding::for_label(&self.encoding)
    }

    /// A tree builder carrying this configuration.
    pub fn tree_builder(&self) -> Result<TreeBuilder, EncodingError> {
        Ok(TreeBuilder::new()
            .encoding(self.text_encoding()?)
            .parser(StructuralParser::with_property_markers(
                self.property_markers.iter().cloned(),
            ))
            .extensions(self.extensions.iter().cloned())
            .ignore(self.ignore.iter().cloned())
            .include(self.include.iter().cloned()))
    }

    pub fn display_params(&self) -> DisplayParams {
        DisplayParams {
            color_scheme: self.display.color_scheme,
            line_numbers: self.display.line_numbers,
        }
    }

    pub fn write_mode(&self) -> WriteMode {
        if self.edit.overwrite {
            WriteMode::Overwrite
        } else {
            WriteMode::Copy
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    UnknownEncoding(String),
    EmptyList {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        value: String,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::UnknownEncoding(label) => write!(f, "unknown encoding '{label}'"),
            ValidationIssue::EmptyList { field } => write!(f, "'{field}' must not be empty"),
            ValidationIssue::InvalidValue {
                field,
                value,
                message,
            } => write!(f, "invalid entry '{value}' in '{field}': {message}"),
        }
    }
}
