//! Plan recovery and execution for the player's cipher functions

pub mod cipher;
pub mod interpreter;
pub mod plan;

#[cfg(test)]
pub(crate) mod fixtures;

pub use cipher::*;
pub use interpreter::*;
pub use plan::*;
