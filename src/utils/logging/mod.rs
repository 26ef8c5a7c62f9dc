//! Logging utilities for output and progress tracking
//!
//! This module provides logger setup, operation logging helpers, console
//! output for inspecting sequence files, and progress tracking.

pub mod console;
pub mod log;
pub mod progress;

// Re-export commonly used functions for convenience
pub use self::log::{LOG_FILE_NAME, init_logger, log_operation_complete, log_operation_start, log_warning};
pub use self::progress::{create_main_progress_bar, finish_progress_bar};
