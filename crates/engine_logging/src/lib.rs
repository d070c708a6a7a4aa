#![deny(missing_docs)]
//! Shared logging utilities for the tender workspace.
//!
//! This crate provides the `engine_*` logging macros used across the codebase,
//! a thread-local "current page" that every message is prefixed with, and a
//! minimal test initializer for the global logger.

use std::cell::Cell;

thread_local! {
    /// Thread-local storage for the result page currently being processed (0 = none).
    static CURRENT_PAGE: Cell<u32> = const { Cell::new(0) };
}

/// Sets the result page being processed on this thread.
/// The run loop calls this once per page, before navigating.
pub fn set_page(page: u32) {
    CURRENT_PAGE.with(|v| v.set(page));
}

/// Clears the page context, e.g. when a run ends.
pub fn clear_page() {
    CURRENT_PAGE.with(|v| v.set(0));
}

/// Retrieves the page set for the current thread, if any.
pub fn current_page() -> Option<u32> {
    CURRENT_PAGE.with(|v| match v.get() {
        0 => None,
        page => Some(page),
    })
}

/// Returns the `[pN] ` prefix for the current page, or an empty string.
#[doc(hidden)]
pub fn page_prefix() -> String {
    match current_page() {
        Some(page) => format!("[p{page}] "),
        None => String::new(),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!("{}{}", $crate::page_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!("{}{}", $crate::page_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!("{}{}", $crate::page_prefix(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!("{}{}", $crate::page_prefix(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!("{}{}", $crate::page_prefix(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
