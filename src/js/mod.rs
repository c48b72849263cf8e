//! Lexical and pattern-level analysis of minified player scripts

pub mod classify;
pub mod patterns;
pub mod scanner;
pub mod tokenizer;

pub use classify::{CanonicalOperation, OperationClassifier};
pub use patterns::{extract_first_match, PatternSet, ScriptPatterns};
pub use scanner::{find_closing_bracket, Match, Span};
pub use tokenizer::split_top_level;
