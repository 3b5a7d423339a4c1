//! Ingested data
pub mod payload;

pub use payload::{
    Entry,
    TranslationPayload,
};
