//! ローカライズ処理の窓口
//!
//! ペイロードの取り込み（解決 + 書き出し）、ストアの削除、現在のロケール選択、
//! 文字列の参照をひとつのコンテキストオブジェクトにまとめる。

use std::path::{
    Path,
    PathBuf,
};

use crate::config::{
    self,
    ConfigError,
    LocalizationSettings,
};
use crate::error::{
    LocalizationError,
    PayloadError,
};
use crate::input::TranslationPayload;
use crate::resolver::{
    self,
    ResolvedTable,
};
use crate::selector::{
    DirectoryBundle,
    ResourceBundle,
    TableHandle,
    TableSelector,
};
use crate::state::ActiveLocaleState;
use crate::store::TableStore;
use crate::types::LocaleId;

/// ローカライズのコンテキスト
///
/// 管理系の操作（取り込み・削除）と参照を同時に走らせないこと。
#[derive(Debug)]
pub struct LocalizationManager<R: ResourceBundle = DirectoryBundle> {
    /// カスタムテーブルのストア
    store: TableStore,
    /// ホストに同梱されたリソース
    resources: R,
    /// ホストが対応しているロケール
    supported_locales: Vec<LocaleId>,
    /// ペイロードがフォールバックを宣言しない場合に使うロケール
    default_fallback: Option<LocaleId>,
    /// 現在のロケール状態
    state: ActiveLocaleState,
}

impl<R: ResourceBundle> LocalizationManager<R> {
    /// 新しいマネージャーを作成
    ///
    /// OS の優先ロケールがあれば、その時点でテーブル位置を選択する。
    #[must_use]
    pub fn new(
        store: TableStore,
        resources: R,
        supported_locales: Vec<LocaleId>,
        table_name: impl Into<String>,
    ) -> Self {
        let table_name = table_name.into();
        let preferred = resources.preferred_locale();
        let selector = TableSelector::new(&store, &resources);
        let location = preferred.as_deref().map_or_else(
            || selector.preferred_resource(),
            |locale| selector.select_table(locale, &table_name),
        );

        let mut state = ActiveLocaleState::new(location, table_name);
        if let Some(locale) = preferred {
            let location = state.current_table_location().clone();
            state.set_location(location, Some(locale));
        }

        Self { store, resources, supported_locales, default_fallback: None, state }
    }

    /// ペイロードに `fallback` がない場合のロケールを設定
    #[must_use]
    pub fn with_default_fallback(mut self, locale: Option<LocaleId>) -> Self {
        self.default_fallback = locale;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &TableStore {
        &self.store
    }

    #[must_use]
    pub const fn resources(&self) -> &R {
        &self.resources
    }

    #[must_use]
    pub fn supported_locales(&self) -> &[LocaleId] {
        &self.supported_locales
    }

    #[must_use]
    pub const fn state(&self) -> &ActiveLocaleState {
        &self.state
    }

    /// 現在のテーブル位置
    #[must_use]
    pub const fn current_bundle(&self) -> &TableHandle {
        self.state.current_table_location()
    }

    /// 現在のテーブル名
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.state.current_table_name()
    }

    /// セレクターを取得
    #[must_use]
    pub fn selector(&self) -> TableSelector<'_> {
        TableSelector::new(&self.store, &self.resources)
    }

    /// ロケールのテーブル位置を選択する（状態は変更しない）
    #[must_use]
    pub fn select_table(&self, locale: &str, table_name: &str) -> TableHandle {
        self.selector().select_table(locale, table_name)
    }

    /// 現在のロケールを切り替える
    ///
    /// ロケールが不正な場合は OS の優先ロケールのリソースを使う。
    pub fn set_current_bundle(&mut self, locale: &str) {
        let (location, requested) = match LocaleId::parse(locale) {
            Ok(locale) => {
                let location = self.select_table(locale.as_str(), self.state.current_table_name());
                (location, Some(locale.to_string()))
            }
            Err(err) => {
                tracing::warn!(%err, "Cannot select bundle, using preferred localization");
                (self.selector().preferred_resource(), None)
            }
        };
        self.state.set_location(location, requested);
    }

    /// 参照に使うテーブル名を変更する
    ///
    /// テーブル位置は再選択しない。ロケール解決に反映させたい場合は
    /// 続けて [`Self::set_current_bundle`] を呼ぶこと。
    pub fn set_table_name(&mut self, table_name: impl Into<String>) {
        self.state.set_table_name(table_name);
    }

    /// ペイロードを対応ロケールで解決する
    ///
    /// フォールバックロケールがなければ、該当ロケールのない ID は欠けたままになる。
    ///
    /// # Errors
    /// フォールバックロケールが不正な場合
    pub fn resolve(&self, payload: &TranslationPayload) -> Result<ResolvedTable, PayloadError> {
        let fallback = payload.fallback(self.default_fallback.as_ref().map(LocaleId::as_str))?;
        Ok(resolver::resolve_with_fallback(payload, fallback.as_ref(), &self.supported_locales))
    }

    /// JSON ペイロードを解決してテーブルとして書き出す
    ///
    /// 成功した場合のみ現在のテーブル名を `table_name` に変更する。
    ///
    /// # Errors
    /// - [`LocalizationError::Payload`]: JSON が不正
    /// - [`LocalizationError::Config`]: テーブル名が不正
    /// - [`LocalizationError::Storage`]: 書き出しに失敗
    pub fn create_localized_files(
        &mut self,
        json: &str,
        table_name: &str,
    ) -> Result<Vec<PathBuf>, LocalizationError> {
        config::validate_table_name(table_name)
            .map_err(|e| ConfigError::ValidationErrors(vec![e]))?;
        let payload = TranslationPayload::from_json(json)?;
        self.materialize(&payload, table_name)
    }

    /// デコード済みのペイロードを解決してテーブルとして書き出す
    ///
    /// # Errors
    /// [`Self::create_localized_files`] と同じ
    pub fn create_localized_files_from_payload(
        &mut self,
        payload: &TranslationPayload,
        table_name: &str,
    ) -> Result<Vec<PathBuf>, LocalizationError> {
        config::validate_table_name(table_name)
            .map_err(|e| ConfigError::ValidationErrors(vec![e]))?;
        payload.validate().map_err(PayloadError::Invalid)?;
        self.materialize(payload, table_name)
    }

    /// 検証済みのペイロードを解決して書き出す
    fn materialize(
        &mut self,
        payload: &TranslationPayload,
        table_name: &str,
    ) -> Result<Vec<PathBuf>, LocalizationError> {
        let table = self.resolve(payload)?;
        let written = self.store.write(&table, table_name)?;

        self.state.set_table_name(table_name);
        Ok(written)
    }

    /// ストアを丸ごと削除する
    ///
    /// 現在のテーブル位置が削除されたストアを指していれば選択し直す。
    ///
    /// # Errors
    /// 削除が拒否された場合
    pub fn clean(&mut self) -> Result<(), LocalizationError> {
        self.store.clean()?;
        self.reselect_if_custom();
        Ok(())
    }

    /// 指定したテーブルだけを削除する
    ///
    /// # Errors
    /// 削除が拒否された場合
    pub fn remove_table(&mut self, table_name: &str) -> Result<usize, LocalizationError> {
        let removed = self.store.remove_table(table_name)?;
        self.reselect_if_custom();
        Ok(removed)
    }

    /// 現在のテーブル位置・テーブル名で `key` の表示文字列を取得する
    ///
    /// どこにも見つからなければ `key` をそのまま返す。
    #[must_use]
    pub fn localized_string(&self, key: &str) -> String {
        self.selector().lookup(key, self.state.current_table_name(), self.state.current_table_location())
    }

    /// 削除後、カスタムテーブルを指していた場合のみ選択し直す
    fn reselect_if_custom(&mut self) {
        if !self.state.current_table_location().is_custom() {
            return;
        }
        let location = {
            let selector = self.selector();
            self.state.requested_locale().map_or_else(
                || selector.preferred_resource(),
                |locale| selector.select_table(locale, self.state.current_table_name()),
            )
        };
        self.state.set_location(location, None);
    }
}

impl LocalizationManager<DirectoryBundle> {
    /// 設定からマネージャーを作成
    ///
    /// 相対パスは `workspace_root` を基準に解決する。`supportedLocales` が
    /// ない場合はリソースディレクトリの `*.lproj` から検出する。
    ///
    /// # Errors
    /// 設定のバリデーションエラー
    pub fn from_settings(
        settings: &LocalizationSettings,
        workspace_root: &Path,
    ) -> Result<Self, LocalizationError> {
        settings.validate().map_err(ConfigError::ValidationErrors)?;

        let store = TableStore::new(settings.storage_root(workspace_root));
        let resources = DirectoryBundle::new(
            settings.resources_root(workspace_root).unwrap_or_else(|| workspace_root.to_path_buf()),
            settings.preferred_locales.clone().unwrap_or_default(),
        );

        let codes = settings.supported_locales.clone().unwrap_or_else(|| resources.localizations());
        let supported_locales: Vec<LocaleId> = codes
            .iter()
            .filter_map(|code| match LocaleId::parse(code) {
                Ok(locale) => Some(locale),
                Err(err) => {
                    tracing::warn!(%err, "Ignoring unsupported localization");
                    None
                }
            })
            .collect();
        if supported_locales.is_empty() {
            tracing::warn!("No supported locales; ingested payloads will produce no tables");
        }

        let default_fallback =
            settings.default_fallback_locale.as_deref().map(LocaleId::parse).transpose()?;

        tracing::debug!(
            root = %store.root().display(),
            locales = ?supported_locales,
            "Localization manager ready"
        );
        Ok(Self::new(store, resources, supported_locales, settings.table_name.clone())
            .with_default_fallback(default_fallback))
    }

    /// ワークスペースの設定ファイルを読み込んでマネージャーを作成
    ///
    /// # Errors
    /// 設定の読み込み・バリデーションエラー
    pub fn from_workspace(workspace_root: &Path) -> Result<Self, LocalizationError> {
        let settings = config::load_settings(workspace_root)?;
        Self::from_settings(&settings, workspace_root)
    }
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
    use crate::types::table_file_name;

    const PAYLOAD: &str = r#"{
  "jsonVersion": "1",
  "fallback": "de-DE",
  "entries": [
    { "key": "Greeting", "values": { "de-DE": "Hallo" } },
    { "key": "Title", "values": { "de-DE": "Rundgang", "en-US": "Tour" } }
  ]
}"#;

    /// ホスト側: Base, de, en と既定の myStrings
    #[fixture]
    fn workspace() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let resources = temp_dir.path().join("Resources");
        for locale in ["Base", "de", "en"] {
            fs::create_dir_all(resources.join(format!("{locale}.lproj"))).unwrap();
        }
        let host_en = [("Greeting".to_string(), "Hello (host)".to_string())].into_iter().collect();
        fs::write(
            resources.join("en.lproj").join(table_file_name("myStrings")),
            strings::encode_utf16(&strings::serialize(&host_en)),
        )
        .unwrap();
        fs::write(
            config::config_path(temp_dir.path()),
            r#"{"storageDir": "Documents", "resourcesDir": "Resources", "preferredLocales": ["en"]}"#,
        )
        .unwrap();
        temp_dir
    }

    #[googletest::test]
    #[rstest]
    fn from_workspace_discovers_locales(workspace: TempDir) {
        let manager = LocalizationManager::from_workspace(workspace.path()).unwrap();

        expect_that!(
            manager.supported_locales().iter().map(LocaleId::as_str).collect::<Vec<_>>(),
            elements_are![eq(&"Base"), eq(&"de"), eq(&"en")]
        );
        expect_that!(manager.table_name(), eq("myStrings"));
        expect_that!(manager.current_bundle().locale(), some(eq("en")));
        expect_that!(manager.current_bundle().is_custom(), eq(false));
    }

    #[googletest::test]
    #[rstest]
    fn create_then_select_reads_custom_table(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();

        let written = manager.create_localized_files(PAYLOAD, "tours").unwrap();
        manager.set_current_bundle("de");

        expect_that!(written.len(), eq(4));
        expect_that!(manager.table_name(), eq("tours"));
        expect_that!(manager.current_bundle().is_custom(), eq(true));
        expect_that!(manager.localized_string("Greeting"), eq("Hallo"));
        expect_that!(manager.localized_string("Title"), eq("Rundgang"));
        expect_that!(manager.localized_string("Unknown"), eq("Unknown"));
    }

    #[googletest::test]
    #[rstest]
    fn fallback_text_reaches_other_locale(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        manager.create_localized_files(PAYLOAD, "myStrings").unwrap();

        manager.set_current_bundle("en");

        expect_that!(manager.localized_string("Greeting"), eq("Hallo"));
        expect_that!(manager.localized_string("Title"), eq("Tour"));
    }

    #[googletest::test]
    #[rstest]
    fn set_table_name_does_not_reselect(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        manager.create_localized_files(PAYLOAD, "tours").unwrap();
        manager.set_current_bundle("en");
        let before = manager.current_bundle().clone();

        manager.set_table_name("myStrings");

        expect_that!(manager.current_bundle(), eq(&before));
        // カスタム en に myStrings はないので同梱リソースへ落ちる
        expect_that!(manager.localized_string("Greeting"), eq("Hello (host)"));

        manager.set_current_bundle("en");
        expect_that!(manager.current_bundle().is_custom(), eq(false));
    }

    #[googletest::test]
    #[rstest]
    fn invalid_locale_uses_preferred_resource(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();

        manager.set_current_bundle("../etc");

        expect_that!(manager.current_bundle().locale(), some(eq("en")));
        expect_that!(manager.current_bundle().is_custom(), eq(false));
    }

    #[googletest::test]
    #[rstest]
    fn clean_resets_custom_selection(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        manager.create_localized_files(PAYLOAD, "myStrings").unwrap();
        manager.set_current_bundle("de");

        manager.clean().unwrap();

        expect_that!(manager.store().exists(), eq(false));
        expect_that!(manager.current_bundle().is_custom(), eq(false));
        expect_that!(manager.current_bundle().locale(), some(eq("de")));
        expect_that!(manager.localized_string("Greeting"), eq("Greeting"));
    }

    #[googletest::test]
    #[rstest]
    fn failed_ingest_keeps_state(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();

        let result = manager.create_localized_files("{ broken", "tours");

        assert!(matches!(result, Err(LocalizationError::Payload(PayloadError::Json(_)))));
        expect_that!(manager.table_name(), eq("myStrings"));
        expect_that!(manager.store().exists(), eq(false));
    }

    #[rstest]
    #[case::empty("")]
    #[case::path("../escape")]
    fn invalid_table_name_is_rejected(workspace: TempDir, #[case] table_name: &str) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();

        let result = manager.create_localized_files(PAYLOAD, table_name);

        assert!(matches!(result, Err(LocalizationError::Config(_))));
    }

    #[googletest::test]
    #[rstest]
    fn empty_fallback_uses_configured_default(workspace: TempDir) {
        let settings = LocalizationSettings {
            supported_locales: Some(vec!["de".to_string(), "fr".to_string()]),
            default_fallback_locale: Some("it".to_string()),
            ..LocalizationSettings::default()
        };
        let mut manager = LocalizationManager::from_settings(&settings, workspace.path()).unwrap();
        let json = r#"{"jsonVersion": "1", "fallback": "", "entries": [{"key": "k", "values": {"it": "Testo"}}]}"#;

        manager.create_localized_files(json, "myStrings").unwrap();
        manager.set_current_bundle("fr");

        expect_that!(manager.current_bundle().is_custom(), eq(true));
        expect_that!(manager.localized_string("k"), eq("Testo"));
    }

    #[googletest::test]
    #[rstest]
    fn empty_fallback_without_default_leaves_gaps(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        let json = r#"{
  "jsonVersion": "1",
  "fallback": "",
  "entries": [
    { "key": "Greeting", "values": { "de": "Hallo", "en": "Hello" } },
    { "key": "Foreign", "values": { "ja": "Konnichiwa" } }
  ]
}"#;

        manager.create_localized_files(json, "myStrings").unwrap();

        for (code, greeting) in [("de", "Hallo"), ("en", "Hello")] {
            let table = manager.store().read_table(&LocaleId::parse(code).unwrap(), "myStrings").unwrap();
            expect_that!(table.get("Greeting"), some(eq(greeting)));
            expect_that!(table.get("Foreign"), none());
        }
    }

    #[googletest::test]
    #[rstest]
    fn foreign_locale_code_does_not_block_ingest(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        let json = r#"{
  "jsonVersion": "1",
  "fallback": "de",
  "entries": [
    { "key": "First", "values": { "de": "Eins" } },
    { "key": "Second", "values": { "de": "Andere", "sr-Latn@latin": "Drugi" } }
  ]
}"#;

        manager.create_localized_files(json, "myStrings").unwrap();
        manager.set_current_bundle("de");

        expect_that!(manager.localized_string("First"), eq("Eins"));
        expect_that!(manager.localized_string("Second"), eq("Andere"));
        expect_that!(manager.store().table_files().len(), eq(2));
    }

    #[googletest::test]
    #[rstest]
    fn remove_table_keeps_other_tables(workspace: TempDir) {
        let mut manager = LocalizationManager::from_workspace(workspace.path()).unwrap();
        manager.create_localized_files(PAYLOAD, "myStrings").unwrap();
        manager.create_localized_files(PAYLOAD, "tours").unwrap();
        manager.set_current_bundle("de");

        let removed = manager.remove_table("tours").unwrap();

        expect_that!(removed, eq(4));
        expect_that!(manager.current_bundle().is_custom(), eq(false));
        manager.set_table_name("myStrings");
        manager.set_current_bundle("de");
        expect_that!(manager.localized_string("Greeting"), eq("Hallo"));
    }
}
