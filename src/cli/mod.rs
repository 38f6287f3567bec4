// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line interface: argument parsing, console logging and the `predict` command.

/// CLI arguments.
pub mod args;

/// Console logging macros.
pub mod logging;

/// Prediction logic.
pub mod predict;
