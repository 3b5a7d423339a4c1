//! Picks the table location a locale should read from.
//!
//! Fallback chain, re-walked on every call without caching:
//! 1. custom storage root: `{root}/{locale}.lproj/{table}.strings`
//! 2. the host's localized resource for the locale
//! 3. the host's primary resource

mod resources;

use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;
pub use resources::{
    DirectoryBundle,
    ResourceBundle,
};

use crate::error::{
    LocalizationError,
    StorageError,
    StorageOperation,
};
use crate::store::{
    StringTable,
    TableStore,
};
use crate::types::{
    TABLE_DIR_EXTENSION,
    table_file_name,
};

/// Location of the tables a lookup reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableHandle {
    /// Locale directory inside the custom storage root
    Custom { locale: String, dir: PathBuf },
    /// Host-shipped localized resource
    Localized { locale: String, dir: PathBuf },
    /// Host-shipped default resource
    Primary { dir: PathBuf },
}

impl TableHandle {
    #[must_use]
    pub fn dir(&self) -> &Path {
        match self {
            Self::Custom { dir, .. } | Self::Localized { dir, .. } | Self::Primary { dir } => dir,
        }
    }

    #[must_use]
    pub fn locale(&self) -> Option<&str> {
        match self {
            Self::Custom { locale, .. } | Self::Localized { locale, .. } => Some(locale),
            Self::Primary { .. } => None,
        }
    }

    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }

    /// Path of `table_name` under this handle.
    #[must_use]
    pub fn table_path(&self, table_name: &str) -> PathBuf {
        self.dir().join(table_file_name(table_name))
    }
}

/// Stateless view over the custom store and the host resources.
#[derive(Debug, Clone, Copy)]
pub struct TableSelector<'a> {
    store: &'a TableStore,
    resources: &'a dyn ResourceBundle,
}

impl<'a> TableSelector<'a> {
    #[must_use]
    pub const fn new(store: &'a TableStore, resources: &'a dyn ResourceBundle) -> Self {
        Self { store, resources }
    }

    /// Best table location for `locale`; never fails.
    #[must_use]
    pub fn select_table(&self, locale: &str, table_name: &str) -> TableHandle {
        if !self.store.exists() {
            tracing::debug!(locale, "No custom storage root, using host resources");
            return self.host_resource(locale);
        }

        match self.find_custom(locale, table_name) {
            Ok(dir) => {
                tracing::debug!(locale, table = table_name, dir = %dir.display(), "Using custom table");
                TableHandle::Custom { locale: locale.to_string(), dir }
            }
            Err(err) => {
                tracing::debug!(locale, table = table_name, %err, "Custom table unavailable, using host resources");
                self.host_resource(locale)
            }
        }
    }

    /// Searches the custom root for `{locale}.lproj` holding `{table_name}.strings`.
    ///
    /// Hidden entries are skipped.
    ///
    /// # Errors
    /// - [`LocalizationError::NotFound`] when no matching directory/file exists
    /// - [`LocalizationError::Storage`] when walking the root fails
    pub fn find_custom(&self, locale: &str, table_name: &str) -> Result<PathBuf, LocalizationError> {
        let dir_name = format!("{locale}.{TABLE_DIR_EXTENSION}");
        let file_name = table_file_name(table_name);

        for dir in walk(self.store.root(), |path, is_dir| {
            is_dir && path.file_name().is_some_and(|name| name == dir_name.as_str())
        })? {
            let found = walk(&dir, |path, is_dir| {
                !is_dir && path.file_name().is_some_and(|name| name == file_name.as_str())
            })?;
            if !found.is_empty() {
                return Ok(dir);
            }
        }

        Err(LocalizationError::NotFound { locale: locale.to_string(), table: table_name.to_string() })
    }

    /// Host-shipped resource for `locale`, else the primary resource.
    #[must_use]
    pub fn host_resource(&self, locale: &str) -> TableHandle {
        self.resources.localized(locale).map_or_else(
            || TableHandle::Primary { dir: self.resources.primary() },
            |dir| TableHandle::Localized { locale: locale.to_string(), dir },
        )
    }

    /// Handle used when selection itself cannot run: the OS-preferred localization.
    #[must_use]
    pub fn preferred_resource(&self) -> TableHandle {
        self.resources
            .preferred_locale()
            .map_or_else(|| TableHandle::Primary { dir: self.resources.primary() }, |locale| {
                self.host_resource(&locale)
            })
    }

    /// Display text for `key`.
    ///
    /// Reads `handle`, then the host resources for the handle's locale, then the
    /// primary resource. Falls back to `key` itself.
    #[must_use]
    pub fn lookup(&self, key: &str, table_name: &str, handle: &TableHandle) -> String {
        let mut candidates = vec![handle.table_path(table_name)];
        if let Some(locale) = handle.locale() {
            candidates.push(self.host_resource(locale).table_path(table_name));
        }
        candidates.push(TableHandle::Primary { dir: self.resources.primary() }.table_path(table_name));
        candidates.dedup();

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match StringTable::load(&path) {
                Ok(table) => {
                    if let Some(text) = table.get(key) {
                        return text.to_string();
                    }
                }
                Err(err) => {
                    tracing::debug!(path = %path.display(), %err, "Skipping unreadable table");
                }
            }
        }

        tracing::debug!(key, table = table_name, "No translation found, using key");
        key.to_string()
    }
}

/// Direct children of `dir` accepted by `accept(path, is_dir)`.
fn walk(dir: &Path, accept: impl Fn(&Path, bool) -> bool) -> Result<Vec<PathBuf>, StorageError> {
    let mut matches = Vec::new();
    for result in WalkBuilder::new(dir)
        .standard_filters(false)
        .hidden(true)
        .max_depth(Some(1))
        .follow_links(false)
        .build()
    {
        let entry = result.map_err(|err| {
            StorageError::new(StorageOperation::ReadTable, dir, std::io::Error::other(err))
        })?;
        if entry.depth() == 0 {
            continue;
        }
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        if accept(entry.path(), is_dir) {
            matches.push(entry.path().to_path_buf());
        }
    }
    Ok(matches)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::fs;

    use googletest::prelude::*;
    use rstest::*;
    use tempfile::TempDir;

    use super::*;
    use crate::store::strings;

    struct Fixture {
        _temp_dir: TempDir,
        store: TableStore,
        resources: DirectoryBundle,
    }

    fn write_table(dir: &Path, table_name: &str, pairs: &[(&str, &str)]) {
        fs::create_dir_all(dir).unwrap();
        let map = pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        fs::write(dir.join(table_file_name(table_name)), strings::encode_utf16(&strings::serialize(&map)))
            .unwrap();
    }

    /// custom: de のみ。host: de, en とデフォルト
    #[fixture]
    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("Custom.bundle");
        let resources = temp_dir.path().join("Resources");

        write_table(&root.join("de.lproj"), "myStrings", &[("Greeting", "Hallo (custom)")]);
        write_table(
            &resources.join("de.lproj"),
            "myStrings",
            &[("Greeting", "Hallo (host)"), ("Bye", "Tschüss")],
        );
        write_table(&resources.join("en.lproj"), "myStrings", &[("Greeting", "Hello")]);
        write_table(&resources, "myStrings", &[("Only", "Default")]);

        Fixture {
            store: TableStore::new(root),
            resources: DirectoryBundle::new(resources, vec!["en".to_string()]),
            _temp_dir: temp_dir,
        }
    }

    #[googletest::test]
    #[rstest]
    fn selects_custom_table(fixture: Fixture) {
        let selector = TableSelector::new(&fixture.store, &fixture.resources);

        let handle = selector.select_table("de", "myStrings");

        expect_that!(handle.is_custom(), eq(true));
        expect_that!(handle.locale(), some(eq("de")));
        assert_eq!(handle.dir(), fixture.store.root().join("de.lproj"));
    }

    #[googletest::test]
    #[rstest]
    #[case::other_locale("en", "myStrings", Some("en"))]
    #[case::other_table("de", "otherStrings", Some("de"))]
    #[case::unknown_locale("ja", "myStrings", None)]
    fn falls_back_to_host_resources(
        fixture: Fixture,
        #[case] locale: &str,
        #[case] table_name: &str,
        #[case] expected_locale: Option<&str>,
    ) {
        let selector = TableSelector::new(&fixture.store, &fixture.resources);

        let handle = selector.select_table(locale, table_name);

        expect_that!(handle.is_custom(), eq(false));
        assert_eq!(handle.locale(), expected_locale);
    }

    #[rstest]
    fn missing_root_uses_host_resources(fixture: Fixture) {
        fixture.store.clean().unwrap();
        let selector = TableSelector::new(&fixture.store, &fixture.resources);

        let handle = selector.select_table("de", "myStrings");

        assert!(matches!(handle, TableHandle::Localized { ref locale, .. } if locale == "de"));
        assert!(!handle.dir().starts_with(fixture.store.root()));
    }

    #[rstest]
    fn hidden_directories_are_ignored(fixture: Fixture) {
        write_table(&fixture.store.root().join(".fr.lproj"), "myStrings", &[("a", "b")]);
        let selector = TableSelector::new(&fixture.store, &fixture.resources);

        let result = selector.find_custom(".fr", "myStrings");

        assert!(matches!(result, Err(LocalizationError::NotFound { .. })));
    }

    #[googletest::test]
    #[rstest]
    fn preferred_resource_uses_os_preference(fixture: Fixture) {
        let selector = TableSelector::new(&fixture.store, &fixture.resources);

        let handle = selector.preferred_resource();

        expect_that!(handle.locale(), some(eq("en")));
    }

    #[rstest]
    #[case::custom_hit("de", "Greeting", "Hallo (custom)")]
    #[case::falls_to_host_localized("de", "Bye", "Tschüss")]
    #[case::falls_to_primary("de", "Only", "Default")]
    #[case::key_as_last_resort("de", "Missing", "Missing")]
    #[case::host_only_locale("en", "Greeting", "Hello")]
    fn lookup_walks_the_chain(
        fixture: Fixture,
        #[case] locale: &str,
        #[case] key: &str,
        #[case] expected: &str,
    ) {
        let selector = TableSelector::new(&fixture.store, &fixture.resources);
        let handle = selector.select_table(locale, "myStrings");

        assert_that!(selector.lookup(key, "myStrings", &handle), eq(expected));
    }

    #[rstest]
    fn lookup_skips_malformed_table(fixture: Fixture) {
        fs::write(fixture.store.root().join("de.lproj").join("myStrings.strings"), "garbage").unwrap();
        let selector = TableSelector::new(&fixture.store, &fixture.resources);
        let handle = selector.select_table("de", "myStrings");

        assert_that!(selector.lookup("Greeting", "myStrings", &handle), eq("Hallo (host)"));
    }
}
