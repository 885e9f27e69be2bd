//! Sentiscope Core
//!
//! Types shared across the Sentiscope crates:
//! - Error type and result alias
//! - The fixed table of supported languages and their model sources

pub mod error;
pub mod language;

pub use error::{Error, Result};
pub use language::{normalize_code, LanguageTable, ModelSource, SupportedLanguage};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::language::{LanguageTable, ModelSource, SupportedLanguage};
}
