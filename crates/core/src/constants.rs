//! Constants used throughout the consult core crate.
//!
//! Timing defaults match the pacing of the browser demo; directory names are shared by the
//! config resolver and the case catalogue.

use std::time::Duration;

/// Directory searched for case fixtures when no explicit directory is configured.
pub const CASES_DIR_NAME: &str = "cases";

/// File extension of case fixtures.
pub const CASE_FILE_EXTENSION: &str = "json";

/// Characters of rendered HTML revealed per typing tick.
pub const DEFAULT_REVEAL_CHUNK: usize = 5;

/// Interval between typing ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(3);

/// Pause between one stage completing and the next one starting to type.
pub const DEFAULT_STAGE_DELAY: Duration = Duration::from_millis(800);
