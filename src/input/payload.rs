//! Translation payload input definitions

use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};

use crate::config::ValidationError;
use crate::error::PayloadError;
use crate::types::LocaleId;

/// Server-provided translation payload.
///
/// ```json
/// {
///   "jsonVersion": "1.0",
///   "fallback": "de-DE",
///   "entries": [{ "key": "Greeting", "values": { "de-DE": "Hallo" } }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationPayload {
    #[serde(rename = "jsonVersion")]
    pub version: String,

    /// Locale whose text fills gaps. May be empty; see [`TranslationPayload::fallback`].
    #[serde(rename = "fallback")]
    pub fallback_locale: String,

    pub entries: Vec<Entry>,
}

/// One string id with its translations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Entry {
    /// String id, e.g. `Tour1Name`. Duplicates across entries are allowed (last one wins).
    #[serde(rename = "key")]
    pub id: String,

    /// Locale code (e.g. `de-DE`) to translated text.
    #[serde(rename = "values")]
    pub values_by_locale: HashMap<String, String>,
}

impl Entry {
    #[must_use]
    pub fn new(id: impl Into<String>, values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self { id: id.into(), values_by_locale: values.into_iter().collect() }
    }
}

impl TranslationPayload {
    /// Decodes and validates a payload.
    ///
    /// # Errors
    /// - [`PayloadError::Json`] for syntax errors or a schema mismatch
    /// - [`PayloadError::Invalid`] for empty ids, empty locale codes or a malformed fallback
    pub fn from_json(json: &str) -> Result<Self, PayloadError> {
        let payload: Self = serde_json::from_str(json)?;
        payload.validate().map_err(PayloadError::Invalid)?;

        tracing::debug!(
            version = %payload.version,
            fallback = %payload.fallback_locale,
            entries = payload.entries.len(),
            "Decoded translation payload"
        );
        if !payload.fallback_locale.is_empty() && !payload.mentions_locale(&payload.fallback_locale)
        {
            tracing::warn!(
                fallback = %payload.fallback_locale,
                "Fallback locale has no text in any entry; gaps will stay unfilled"
            );
        }

        Ok(payload)
    }

    /// # Errors
    /// Every empty id, empty locale code and malformed fallback locale.
    ///
    /// Other locale codes that do not parse are logged and left in place; they can
    /// never match a supported locale, so the resolver ignores them.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if !self.fallback_locale.is_empty() {
            if let Err(e) = LocaleId::parse(&self.fallback_locale) {
                errors.push(ValidationError::new("fallback", e.to_string()));
            }
        }

        for (index, entry) in self.entries.iter().enumerate() {
            if entry.id.is_empty() {
                errors.push(ValidationError::new(
                    format!("entries[{index}].key"),
                    "The key cannot be empty",
                ));
            }

            let mut codes: Vec<&String> = entry.values_by_locale.keys().collect();
            codes.sort();
            for code in codes {
                if code.is_empty() {
                    errors.push(ValidationError::new(
                        format!("entries[{index}].values"),
                        "The locale code cannot be empty",
                    ));
                } else if let Err(err) = LocaleId::parse(code) {
                    tracing::warn!(id = %entry.id, %err, "Ignoring value with unusable locale code");
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    /// Effective fallback locale.
    ///
    /// An empty `fallback` field falls back to `default`. With neither, there is no
    /// fallback and ids without a matching locale stay absent.
    ///
    /// # Errors
    /// [`PayloadError::Invalid`] when the chosen code is malformed.
    pub fn fallback(&self, default: Option<&str>) -> Result<Option<LocaleId>, PayloadError> {
        let code = if self.fallback_locale.is_empty() {
            match default {
                Some(code) => code,
                None => {
                    tracing::warn!("Payload declares no fallback locale; gaps will stay unfilled");
                    return Ok(None);
                }
            }
        } else {
            self.fallback_locale.as_str()
        };

        LocaleId::parse(code).map(Some).map_err(|e| {
            PayloadError::Invalid(vec![ValidationError::new("fallback", e.to_string())])
        })
    }

    fn mentions_locale(&self, code: &str) -> bool {
        self.entries.iter().any(|entry| entry.values_by_locale.contains_key(code))
    }
}
