use std::path::{
    Path,
    PathBuf,
};

use serde::{
    Deserialize,
    Serialize,
};
use thiserror::Error;

use crate::types::LocaleId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Configuration error in '{field_path}': {message}")]
pub struct ValidationError {
    /// JSON path to the field (e.g., "supportedLocales[0]")
    pub field_path: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field_path: field_path.into(), message: message.into() }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    ValidationErrors(Vec<ValidationError>),

    #[error("Failed to load configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),
}

pub(crate) fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("  {}. {} - {}", i + 1, err.field_path, err.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocalizationSettings {
    /// Directory that holds the custom bundle. Defaults to the workspace root.
    pub storage_dir: Option<PathBuf>,

    /// Name of the custom bundle directory inside `storage_dir`.
    pub bundle_name: String,

    /// Resources shipped with the host (`{locale}.lproj/{table}.strings`).
    pub resources_dir: Option<PathBuf>,

    /// Localizations the host supports.
    ///
    /// - `None`: discovered from the `*.lproj` directories of `resources_dir`
    /// - `Some([...])`: used as-is
    pub supported_locales: Option<Vec<String>>,

    /// OS language preference order, most preferred first.
    pub preferred_locales: Option<Vec<String>>,

    /// Table used by lookups until `set_table_name` changes it.
    pub table_name: String,

    /// Used when a payload declares an empty `fallback`.
    pub default_fallback_locale: Option<String>,
}

impl LocalizationSettings {
    /// Storage root of the custom tables, relative paths resolved against `workspace_root`.
    #[must_use]
    pub fn storage_root(&self, workspace_root: &Path) -> PathBuf {
        let dir = self
            .storage_dir
            .as_ref()
            .map_or_else(|| workspace_root.to_path_buf(), |dir| workspace_root.join(dir));
        dir.join(&self.bundle_name)
    }

    /// Resources directory, relative paths resolved against `workspace_root`.
    #[must_use]
    pub fn resources_root(&self, workspace_root: &Path) -> Option<PathBuf> {
        self.resources_dir.as_ref().map(|dir| workspace_root.join(dir))
    }

    /// # Errors
    /// - Bundle or table name is empty or contains a path separator
    /// - Locale identifiers cannot be parsed
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(message) = file_name_problem(&self.bundle_name) {
            errors.push(ValidationError::new(
                "bundleName",
                format!("{message}. Example: \"DynamicLocalization.bundle\""),
            ));
        }

        if let Some(message) = file_name_problem(&self.table_name) {
            errors.push(ValidationError::new(
                "tableName",
                format!("{message}. Example: \"myStrings\""),
            ));
        }

        for (field, locales) in [
            ("supportedLocales", &self.supported_locales),
            ("preferredLocales", &self.preferred_locales),
        ] {
            let Some(locales) = locales else {
                continue;
            };
            if locales.is_empty() {
                errors.push(ValidationError::new(
                    field,
                    "At least one locale is required, or remove this field",
                ));
            }
            for (index, code) in locales.iter().enumerate() {
                if let Err(e) = LocaleId::parse(code) {
                    errors.push(ValidationError::new(format!("{field}[{index}]"), e.to_string()));
                }
            }
        }

        if let Some(code) = &self.default_fallback_locale {
            if let Err(e) = LocaleId::parse(code) {
                errors.push(ValidationError::new("defaultFallbackLocale", e.to_string()));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Checks a table name given at runtime, outside of the settings file.
///
/// # Errors
/// The name is empty or is not a single path component.
pub fn validate_table_name(table_name: &str) -> Result<(), ValidationError> {
    file_name_problem(table_name).map_or(Ok(()), |message| {
        Err(ValidationError::new("tableName", format!("{message}: '{table_name}'")))
    })
}

/// Describes why `name` cannot be used as a single path component.
fn file_name_problem(name: &str) -> Option<&'static str> {
    if name.is_empty() {
        Some("The name cannot be empty")
    } else if name.contains(['/', '\\']) || name == "." || name == ".." {
        Some("The name must be a single path component")
    } else {
        None
    }
}

impl Default for LocalizationSettings {
    fn default() -> Self {
        Self {
            storage_dir: None,
            bundle_name: "DynamicLocalization.bundle".to_string(),
            resources_dir: None,
            supported_locales: None,
            preferred_locales: None,
            table_name: "myStrings".to_string(),
            default_fallback_locale: None,
        }
    }
}
