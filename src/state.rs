//! 現在のロケール状態

use crate::selector::TableHandle;

/// 現在のテーブル位置とテーブル名
///
/// グローバルなシングルトンではなく、[`LocalizationManager`] が所有する。
/// ロックは持たないので、並行アクセスが必要な場合は呼び出し側で
/// `Mutex` などに包むこと。
///
/// [`LocalizationManager`]: crate::manager::LocalizationManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLocaleState {
    /// 現在のテーブル位置
    current_table_location: TableHandle,
    /// 現在のテーブル名
    current_table_name: String,
    /// 最後に要求されたロケール
    requested_locale: Option<String>,
}

impl ActiveLocaleState {
    /// 新しい状態を作成
    #[must_use]
    pub fn new(location: TableHandle, table_name: impl Into<String>) -> Self {
        Self { current_table_location: location, current_table_name: table_name.into(), requested_locale: None }
    }

    /// 現在のテーブル位置を取得
    #[must_use]
    pub const fn current_table_location(&self) -> &TableHandle {
        &self.current_table_location
    }

    /// 現在のテーブル名を取得
    #[must_use]
    pub fn current_table_name(&self) -> &str {
        &self.current_table_name
    }

    /// 最後に要求されたロケールを取得
    #[must_use]
    pub fn requested_locale(&self) -> Option<&str> {
        self.requested_locale.as_deref()
    }

    /// テーブル位置を更新
    pub(crate) fn set_location(&mut self, location: TableHandle, requested_locale: Option<String>) {
        tracing::debug!(?location, ?requested_locale, "Current bundle changed");
        self.current_table_location = location;
        if requested_locale.is_some() {
            self.requested_locale = requested_locale;
        }
    }

    /// テーブル名を更新（テーブル位置は再解決しない）
    pub(crate) fn set_table_name(&mut self, table_name: impl Into<String>) {
        self.current_table_name = table_name.into();
        tracing::debug!(table = %self.current_table_name, "Current table name changed");
    }
}
