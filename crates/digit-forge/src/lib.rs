//! # Digit Forge
//!
//! Renders a digit string onto a canvas, corrupts it according to a
//! difficulty recipe, and persists the result as a PNG artifact.
//!
//! ## Pipeline
//! ```text
//! DigitString → GlyphRenderer → distort (rotate → wave → swirl)
//!             → compose (jitter → noise → pixelate → invert → lines → blur)
//!             → PNG → ArtifactStore
//! ```
//!
//! The HTTP surface in [`routes`] is a thin boundary for the game layer;
//! everything under [`obfuscate`] and [`store`] is usable without it.

pub mod config;
pub mod obfuscate;
pub mod routes;
pub mod state;
pub mod store;

pub use obfuscate::{Canvas, Forge, RecipeBook};
pub use store::ArtifactStore;
