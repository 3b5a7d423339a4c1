//! dynamic-localization
//!
//! サーバーから配信される翻訳ペイロードをロケールごとの文字列テーブルとして
//! 書き出し、実行時にロケールを切り替えて参照する

pub mod config;
pub mod error;
pub mod input;
pub mod manager;
pub mod resolver;
pub mod selector;
pub mod state;
pub mod store;
pub mod types;

pub use error::{
    LocalizationError,
    PayloadError,
    StorageError,
};
pub use manager::LocalizationManager;
pub use types::LocaleId;
