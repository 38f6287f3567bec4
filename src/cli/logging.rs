// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Console logging shared by the library and the CLI.
//!
//! Every macro funnels into [`log`], which picks the stream and prefix for its [`Level`].
//! `Verbose` and `Section` output is dropped unless verbosity is enabled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use colored::{ColoredString, Colorize};

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(true);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Kind of console message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warn,
    Error,
    Verbose,
    Section,
}

impl Level {
    /// Whether messages of this level are printed under the current verbosity.
    pub fn is_enabled(self) -> bool {
        match self {
            Self::Verbose | Self::Section => is_verbose(),
            _ => true,
        }
    }

    /// Warnings and errors go to stderr.
    pub const fn is_stderr(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }

    fn prefix(self) -> Option<ColoredString> {
        match self {
            Self::Warn => Some("WARNING ⚠️".yellow().bold()),
            Self::Error => Some("Error:".red().bold()),
            Self::Success => Some("✅".green()),
            Self::Info | Self::Verbose | Self::Section => None,
        }
    }

    /// Renders a message the way it appears on the console.
    pub fn render(self, args: fmt::Arguments<'_>) -> String {
        match (self, self.prefix()) {
            (Self::Section, _) => format!("\n{}", args.to_string().cyan().bold()),
            (_, Some(prefix)) => format!("{prefix} {args}"),
            (_, None) => args.to_string(),
        }
    }
}

/// Print a message at `level`. Use the macros instead of calling this directly.
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    if !level.is_enabled() {
        return;
    }
    let line = level.render(args);
    if level.is_stderr() {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// Macro for standard info messages.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Info, format_args!($($arg)*))
    };
}

/// Macro for warning messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Warn, format_args!($($arg)*))
    };
}

/// Macro for error messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Error, format_args!($($arg)*))
    };
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Success, format_args!($($arg)*))
    };
}

/// Macro for verbose messages.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Verbose, format_args!($($arg)*))
    };
}

/// Macro for section headers.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {
        $crate::cli::logging::log($crate::cli::logging::Level::Section, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_gates_levels() {
        set_verbose(false);
        assert!(!is_verbose());
        assert!(!Level::Verbose.is_enabled());
        assert!(!Level::Section.is_enabled());
        assert!(Level::Warn.is_enabled());
        assert!(Level::Info.is_enabled());

        set_verbose(true);
        assert!(Level::Verbose.is_enabled());
        assert!(Level::Section.is_enabled());
    }

    #[test]
    fn test_render() {
        colored::control::set_override(false);
        assert_eq!(Level::Info.render(format_args!("{} poses", 3)), "3 poses");
        assert_eq!(Level::Error.render(format_args!("boom")), "Error: boom");
        assert_eq!(Level::Warn.render(format_args!("low")), "WARNING ⚠️ low");
        assert_eq!(Level::Section.render(format_args!("Profiling")), "\nProfiling");
        assert!(Level::Error.is_stderr());
        assert!(!Level::Success.is_stderr());
    }
}
