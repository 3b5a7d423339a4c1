//! `.dynamic-l10n.json` の読み込み

use std::io;
use std::path::{
    Path,
    PathBuf,
};

use super::{
    ConfigError,
    LocalizationSettings,
};

/// 設定ファイル名
pub const CONFIG_FILE_NAME: &str = ".dynamic-l10n.json";

/// ワークスペース内の設定ファイルのパス
#[must_use]
pub fn config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(CONFIG_FILE_NAME)
}

/// ワークスペースの設定ファイルを読み込む（バリデーションはしない）
///
/// 書かれていない項目はデフォルト値になる。ファイルがなければ `Ok(None)`。
///
/// # Errors
/// - ファイルはあるが読めない
/// - JSON として不正、または型が合わない
pub fn load_from_workspace(
    workspace_root: &Path,
) -> Result<Option<LocalizationSettings>, ConfigError> {
    let path = config_path(workspace_root);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    let settings: LocalizationSettings = serde_json::from_str(&content)?;
    tracing::debug!(path = %path.display(), "Loaded configuration");
    Ok(Some(settings))
}

/// 設定を読み込んでバリデーションする
///
/// # Errors
/// 読み込みエラーに加えて、[`LocalizationSettings::validate`] の全違反
pub fn load_settings(workspace_root: &Path) -> Result<LocalizationSettings, ConfigError> {
    let settings = load_from_workspace(workspace_root)?.unwrap_or_default();
    settings.validate().map_err(ConfigError::ValidationErrors)?;

    tracing::debug!(
        storage_root = %settings.storage_root(workspace_root).display(),
        table = %settings.table_name,
        "Settings ready"
    );
    Ok(settings)
}
