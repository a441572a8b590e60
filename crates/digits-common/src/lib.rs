//! # Digits Common
//!
//! Shared types, errors, and constants used across the Mystery Digits crates.
//!
//! ## Modules
//! - `types` - Core data structures (DigitString, DifficultyTier, CorruptionRecipe, ArtifactName)
//! - `error` - Common error type
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::DigitsError;
pub use types::*;
