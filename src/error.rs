//! Error types for ryt-cipher

use thiserror::Error;

/// Main error type for script extraction and deciphering
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Unterminated literal starting at offset {0}")]
    UnterminatedLiteral(usize),

    #[error("No pattern matched for {0}")]
    NoPatternMatched(&'static str),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Operand {index} is not callable: {value}")]
    NotCallable { index: usize, value: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Invalid operand: {0}")]
    InvalidOperand(String),

    #[error("Script too large: {size} bytes (limit {limit})")]
    ScriptTooLarge { size: usize, limit: usize },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
}

impl CipherError {
    /// Check if a freshly fetched player script might succeed where this one failed
    pub fn is_stale_script(&self) -> bool {
        matches!(
            self,
            CipherError::NoPatternMatched(_) | CipherError::ExtractionFailed(_)
        )
    }
}
