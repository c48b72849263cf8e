//! # ryt-cipher - player script deciphering
//!
//! Recovers the signature cipher and the throttling (`n` parameter)
//! transform from a minified player script and runs them natively, without
//! a JavaScript engine.
//!
//! ## Features
//!
//! - Prioritised pattern catalogues for locating cipher functions
//! - Bracket-aware scanning of function bodies and array literals
//! - Classification of obfuscated helpers into canonical operations
//! - Serializable plans, cached per player version
//!
//! ## Example
//!
//! ```rust,no_run
//! use ryt_cipher::Cipher;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let script = std::fs::read_to_string("base.js")?;
//!     let cipher = Cipher::from_script(&script)?;
//!
//!     println!("sig: {}", cipher.decipher_signature("AOq0QJ8wRAIgXb...")?);
//!     println!("n:   {}", cipher.decipher_throttling("T9sNkmTK8Hn2cw")?);
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod js;
pub mod platform;
pub mod utils;

// Re-export main types
pub use config::CipherConfig;
pub use error::CipherError;
pub use platform::{Cipher, SignaturePlan, ThrottlingProgram};
pub use utils::{extract_player_id, resolve_signature_cipher, rewrite_throttling_param, PlayerCache};

/// Result type alias for ryt-cipher operations
pub type Result<T> = std::result::Result<T, CipherError>;
