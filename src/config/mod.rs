//! ワークスペース設定
/// Config file loader
mod loader;
/// Configuration types and settings
mod types;

pub use loader::{
    CONFIG_FILE_NAME,
    config_path,
    load_from_workspace,
    load_settings,
};
pub(crate) use types::format_validation_errors;
pub use types::{
    ConfigError,
    LocalizationSettings,
    ValidationError,
    validate_table_name,
};
