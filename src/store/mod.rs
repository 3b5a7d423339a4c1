//! On-disk string tables
pub mod strings;
mod table_store;

pub use strings::{
    StringTable,
    StringsParseError,
};
pub use table_store::TableStore;
