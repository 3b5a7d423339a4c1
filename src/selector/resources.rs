//! Resources shipped with the host application.

use std::fmt;
use std::path::{
    Path,
    PathBuf,
};

use crate::types::{
    LocaleId,
    TABLE_DIR_EXTENSION,
    primary_subtag,
};

/// The host's own, read-only localized resources.
pub trait ResourceBundle: fmt::Debug {
    /// Localized resource location for `locale` (`{locale}.lproj`), if shipped.
    fn localized(&self, locale: &str) -> Option<PathBuf>;

    /// Default resource location used when nothing localized matches.
    fn primary(&self) -> PathBuf;

    /// Localizations the host ships, sorted.
    fn localizations(&self) -> Vec<String>;

    /// Best shipped localization for the OS language preferences.
    fn preferred_locale(&self) -> Option<String>;
}

/// [`ResourceBundle`] backed by a directory of `{locale}.lproj` folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBundle {
    root: PathBuf,
    /// OS language preference order, most preferred first
    preferred: Vec<String>,
}

impl DirectoryBundle {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, preferred: Vec<String>) -> Self {
        Self { root: root.into(), preferred }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceBundle for DirectoryBundle {
    fn localized(&self, locale: &str) -> Option<PathBuf> {
        let dir = self.root.join(format!("{locale}.{TABLE_DIR_EXTENSION}"));
        dir.is_dir().then_some(dir)
    }

    fn primary(&self) -> PathBuf {
        self.root.clone()
    }

    fn localizations(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            tracing::debug!(root = %self.root.display(), "Resources directory unreadable");
            return Vec::new();
        };

        let mut locales: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
            .filter_map(|entry| {
                let path = entry.path();
                let is_table_dir = path.extension().is_some_and(|ext| ext == TABLE_DIR_EXTENSION);
                let stem = path.file_stem()?.to_str()?.to_string();
                is_table_dir.then_some(stem)
            })
            .filter(|stem| LocaleId::parse(stem).is_ok())
            .collect();
        locales.sort();
        locales
    }

    fn preferred_locale(&self) -> Option<String> {
        let available = self.localizations();

        // exact match first, then same primary subtag
        self.preferred
            .iter()
            .find(|wanted| available.contains(wanted))
            .cloned()
            .or_else(|| {
                self.preferred.iter().find_map(|wanted| {
                    available
                        .iter()
                        .find(|code| {
                            primary_subtag(code).eq_ignore_ascii_case(primary_subtag(wanted))
                        })
                        .cloned()
                })
            })
    }
}
