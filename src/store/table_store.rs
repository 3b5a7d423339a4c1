//! ロケールごとの文字列テーブルをストレージルート配下に書き出す
//!
//! レイアウト: `{root}/{locale}.lproj/{tableName}.strings`

use std::fs;
use std::io;
use std::path::{
    Path,
    PathBuf,
};

use ignore::WalkBuilder;

use super::strings::{
    self,
    StringTable,
};
use crate::error::{
    LocalizationError,
    StorageError,
    StorageOperation,
};
use crate::resolver::ResolvedTable;
use crate::types::{
    LocaleId,
    TABLE_FILE_EXTENSION,
    table_file_name,
};

/// 文字列テーブルの唯一の書き込み手
///
/// `write` と `clean` は同じルートを触るため、呼び出し側で直列化すること。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStore {
    /// ストレージルート
    root: PathBuf,
}

impl TableStore {
    /// 新しいストアを作成（ディレクトリは作成しない）
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// ストレージルートを取得
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// ストレージルートが存在するか
    #[must_use]
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// ロケールのディレクトリパス
    #[must_use]
    pub fn locale_dir(&self, locale: &LocaleId) -> PathBuf {
        self.root.join(locale.directory_name())
    }

    /// テーブルファイルのパス
    #[must_use]
    pub fn table_path(&self, locale: &LocaleId, table_name: &str) -> PathBuf {
        self.locale_dir(locale).join(table_file_name(table_name))
    }

    /// 解決済みテーブルを書き出す
    ///
    /// ロケールディレクトリは存在しなければ作成し、既存のテーブルファイルは
    /// マージせずに上書きする。途中で失敗した場合は、既存のテーブルを
    /// 書き込み前の内容に戻す。
    ///
    /// # Returns
    /// 書き出したテーブルファイルのパス（ロケール順）
    ///
    /// # Errors
    /// - ルートまたはロケールディレクトリが作成できない
    /// - テーブルファイルが書き込めない
    pub fn write(&self, table: &ResolvedTable, table_name: &str) -> Result<Vec<PathBuf>, StorageError> {
        if !self.exists() {
            fs::create_dir_all(&self.root)
                .map_err(|e| StorageError::new(StorageOperation::CreateRoot, &self.root, e))?;
            tracing::info!(root = %self.root.display(), "Created storage root");
        }

        // 先にすべてのロケールディレクトリを用意する
        for locale in table.locales() {
            let dir = self.locale_dir(locale);
            if !dir.is_dir() {
                fs::create_dir_all(&dir)
                    .map_err(|e| StorageError::new(StorageOperation::CreateLocaleDir, &dir, e))?;
                tracing::debug!(dir = %dir.display(), "Created locale directory");
            }
        }

        // 全テーブルを一時ファイルに書いてから差し替える
        let mut staged = Vec::new();
        for (locale, entries) in table.partitions() {
            let path = self.table_path(locale, table_name);
            let bytes = strings::encode_utf16(&strings::serialize(entries));
            match Staged::write(path, &bytes) {
                Ok(pending) => staged.push(pending),
                Err(err) => {
                    staged.iter().for_each(Staged::discard);
                    return Err(err);
                }
            }
        }

        let mut written: Vec<PathBuf> = Vec::new();
        for (index, pending) in staged.iter().enumerate() {
            if let Err(err) = pending.commit() {
                tracing::warn!(path = %pending.path.display(), %err, "Rolling back table write");
                for done in staged.iter().take(index) {
                    done.restore();
                }
                staged.iter().skip(index).for_each(Staged::discard);
                return Err(err);
            }
            tracing::debug!(path = %pending.path.display(), "Wrote table");
            written.push(pending.path.clone());
        }

        tracing::info!(table = table_name, tables = written.len(), "Materialized string tables");
        Ok(written)
    }

    /// テーブルを読み込む
    ///
    /// # Errors
    /// - ファイルが存在しない・読めない
    /// - 内容がパースできない
    pub fn read_table(
        &self,
        locale: &LocaleId,
        table_name: &str,
    ) -> Result<StringTable, LocalizationError> {
        StringTable::load(&self.table_path(locale, table_name))
    }

    /// ストレージルートを丸ごと削除する
    ///
    /// テーブル名に関係なく、ルート配下のすべてのテーブルが消える。
    /// テーブル単位で消したい場合は [`TableStore::remove_table`] を使う。
    ///
    /// # Errors
    /// 削除が拒否された場合
    pub fn clean(&self) -> Result<(), StorageError> {
        if !self.root.exists() {
            tracing::debug!(root = %self.root.display(), "Storage root absent, nothing to clean");
            return Ok(());
        }

        fs::remove_dir_all(&self.root)
            .map_err(|e| StorageError::new(StorageOperation::Remove, &self.root, e))?;
        tracing::info!(root = %self.root.display(), "Removed storage root");
        Ok(())
    }

    /// 指定したテーブルだけを全ロケールから削除する
    ///
    /// テーブルが一つも残らなければルートも削除する。
    ///
    /// # Returns
    /// 削除したファイル数
    ///
    /// # Errors
    /// 削除が拒否された場合
    pub fn remove_table(&self, table_name: &str) -> Result<usize, StorageError> {
        let target = table_file_name(table_name);
        let mut removed = 0;

        for path in self.table_files() {
            if path.file_name().is_some_and(|name| name == target.as_str()) {
                fs::remove_file(&path)
                    .map_err(|e| StorageError::new(StorageOperation::Remove, &path, e))?;
                removed += 1;
            }
        }

        if self.exists() && self.table_files().is_empty() {
            self.clean()?;
        }

        tracing::info!(table = table_name, removed, "Removed table");
        Ok(removed)
    }

    /// ルート配下のテーブルファイル一覧（隠しファイルは除く）
    #[must_use]
    pub fn table_files(&self) -> Vec<PathBuf> {
        if !self.exists() {
            return Vec::new();
        }

        let mut files = Vec::new();
        for result in WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(true)
            .max_depth(Some(2))
            .follow_links(false)
            .build()
        {
            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(?err, "Failed to read directory entry");
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == TABLE_FILE_EXTENSION) {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        files
    }
}

/// 差し替え待ちのテーブル
///
/// 一時ファイルは隠しファイル名なので、書き込み中もテーブル一覧や選択には現れない。
#[derive(Debug)]
struct Staged {
    /// 差し替え先
    path: PathBuf,
    /// 書き込み済みの一時ファイル
    temp_path: PathBuf,
    /// 差し替え前の内容（ロールバック用）
    previous: Option<Vec<u8>>,
}

impl Staged {
    /// 一時ファイルに書き込む
    fn write(path: PathBuf, bytes: &[u8]) -> Result<Self, StorageError> {
        if path.is_dir() {
            return Err(StorageError::new(
                StorageOperation::WriteTable,
                &path,
                io::Error::from(io::ErrorKind::IsADirectory),
            ));
        }
        let previous = if path.is_file() {
            let bytes = fs::read(&path)
                .map_err(|e| StorageError::new(StorageOperation::ReadTable, &path, e))?;
            Some(bytes)
        } else {
            None
        };

        let file_name = path.file_name().map(|name| name.to_string_lossy()).unwrap_or_default();
        let temp_path = path.with_file_name(format!(".{file_name}.tmp"));
        fs::write(&temp_path, bytes).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            StorageError::new(StorageOperation::WriteTable, &temp_path, e)
        })?;

        Ok(Self { path, temp_path, previous })
    }

    /// 一時ファイルをテーブルに差し替える
    fn commit(&self) -> Result<(), StorageError> {
        fs::rename(&self.temp_path, &self.path)
            .map_err(|e| StorageError::new(StorageOperation::WriteTable, &self.path, e))
    }

    /// 差し替え済みのテーブルを元に戻す
    fn restore(&self) {
        let result = match &self.previous {
            Some(bytes) => fs::write(&self.temp_path, bytes)
                .and_then(|()| fs::rename(&self.temp_path, &self.path)),
            None => fs::remove_file(&self.path),
        };
        if let Err(err) = result {
            tracing::warn!(path = %self.path.display(), %err, "Failed to restore table");
        }
    }

    /// 一時ファイルを削除する
    fn discard(&self) {
        let _ = fs::remove_file(&self.temp_path);
    }
}
