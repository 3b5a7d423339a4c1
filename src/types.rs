//! Core types used throughout the project.

use std::borrow::Borrow;
use std::fmt;

use thiserror::Error;

/// Placeholder "neutral" localization that never receives translated text.
pub const BASE_LOCALE: &str = "Base";

/// Directory suffix of a locale partition (`de.lproj`).
pub const TABLE_DIR_EXTENSION: &str = "lproj";

/// File suffix of a string table (`myStrings.strings`).
pub const TABLE_FILE_EXTENSION: &str = "strings";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid locale identifier '{0}'")]
pub struct InvalidLocale(pub String);

/// A language/region identifier such as `de-DE`, `en` or `zh-Hant-TW`.
///
/// The identifier is kept verbatim because it doubles as a directory name;
/// only the primary subtag is compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocaleId(String);

impl LocaleId {
    /// Parses a locale identifier.
    ///
    /// Subtags are separated by `-` or `_` and must be ASCII alphanumeric.
    ///
    /// # Errors
    /// Returns [`InvalidLocale`] for empty identifiers, empty subtags or
    /// characters that would not survive as a directory name.
    pub fn parse(code: &str) -> Result<Self, InvalidLocale> {
        let valid = !code.is_empty()
            && code.split(['-', '_']).all(|part| {
                !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
            });
        if valid { Ok(Self(code.to_string())) } else { Err(InvalidLocale(code.to_string())) }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary language subtag (`de` for `de-DE`).
    #[must_use]
    pub fn primary(&self) -> &str {
        primary_subtag(&self.0)
    }

    /// `true` for identifiers without region or script (`en`).
    #[must_use]
    pub fn is_short_form(&self) -> bool {
        !self.0.contains(['-', '_'])
    }

    /// `true` when both identifiers share a primary subtag.
    #[must_use]
    pub fn same_language(&self, other: &Self) -> bool {
        self.primary().eq_ignore_ascii_case(other.primary())
    }

    /// `true` for the [`BASE_LOCALE`] placeholder.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.0 == BASE_LOCALE
    }

    /// Directory name of this locale's partition (`de.lproj`).
    #[must_use]
    pub fn directory_name(&self) -> String {
        format!("{}.{TABLE_DIR_EXTENSION}", self.0)
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Hash, Eq and Ord all delegate to the inner string, so `str` keys agree.
impl Borrow<str> for LocaleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for LocaleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Primary subtag of a raw identifier; the whole string when it has none.
#[must_use]
pub fn primary_subtag(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// File name of a table (`myStrings.strings`).
#[must_use]
pub fn table_file_name(table_name: &str) -> String {
    format!("{table_name}.{TABLE_FILE_EXTENSION}")
}
