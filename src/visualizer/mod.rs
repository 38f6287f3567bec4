// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors and skeleton styling for pose annotation.

/// Color definitions and palettes.
pub mod color;
pub mod skeleton;

pub use color::Color;
