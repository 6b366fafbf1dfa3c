// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::sync::atomic::{AtomicU8, Ordering};

/// How much the trainer prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    /// Only warnings, errors and the completion banner.
    Quiet = 0,
    /// Session progress.
    Normal = 1,
    /// Per-frame and per-pose diagnostics.
    Verbose = 2,
}

/// Global verbosity level.
static VERBOSITY: AtomicU8 = AtomicU8::new(Verbosity::Normal as u8);

/// Set the global verbosity level.
pub fn set_verbosity(level: Verbosity) {
    VERBOSITY.store(level as u8, Ordering::Relaxed);
}

/// Current verbosity level.
pub fn verbosity() -> Verbosity {
    match VERBOSITY.load(Ordering::Relaxed) {
        0 => Verbosity::Quiet,
        1 => Verbosity::Normal,
        _ => Verbosity::Verbose,
    }
}

/// Set verbose (`true`) or normal (`false`) output.
pub fn set_verbose(verbose: bool) {
    set_verbosity(if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    });
}

/// Verbosity selected by the `--verbose` and `--quiet` flags. Quiet wins.
pub const fn verbosity_from_flags(verbose: bool, quiet: bool) -> Verbosity {
    if quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    verbosity() >= Verbosity::Verbose
}

/// Check if normal progress output is enabled.
pub fn is_normal() -> bool {
    verbosity() >= Verbosity::Normal
}

/// Macro for standard info messages.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {{
        if $crate::cli::logging::is_normal() {
            println!("{}", format!($($arg)*));
        }
    }};
}

/// Macro for warning messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "WARNING ⚠️".yellow().bold(), format!($($arg)*));
    }};
}

/// Macro for error messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        eprintln!("{} {}", "Error:".red().bold(), format!($($arg)*));
    }};
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        println!("{} {}", "🎉".green(), format!($($arg)*).green().bold());
    }};
}

/// Macro for verbose messages.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {{
        if $crate::cli::logging::is_verbose() {
            println!("{}", format!($($arg)*));
        }
    }};
}

/// Macro for section headers.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        use colored::Colorize;
        if $crate::cli::logging::is_normal() {
            println!();
            println!("{}", format!($($arg)*).cyan().bold());
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        set_verbosity(Verbosity::Quiet);
        assert!(!is_normal());
        assert!(!is_verbose());

        set_verbose(true);
        assert!(is_normal());
        assert!(is_verbose());

        set_verbose(false);
        assert_eq!(verbosity(), Verbosity::Normal);
        assert!(!is_verbose());
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(verbosity_from_flags(false, false), Verbosity::Normal);
        assert_eq!(verbosity_from_flags(true, false), Verbosity::Verbose);
        assert_eq!(verbosity_from_flags(false, true), Verbosity::Quiet);
        assert_eq!(verbosity_from_flags(true, true), Verbosity::Quiet);
    }
}
