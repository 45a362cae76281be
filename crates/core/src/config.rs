//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the controller and
//! case source. Nothing in the core reads environment variables; the binaries do that and hand
//! the parsed values over here.

use crate::constants::{
    CASES_DIR_NAME, DEFAULT_REVEAL_CHUNK, DEFAULT_STAGE_DELAY, DEFAULT_TICK_INTERVAL,
};
use crate::{ConsultError, ConsultResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pacing of the typing animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackTiming {
    /// Characters of rendered HTML revealed per tick. Always non-zero.
    pub reveal_chunk: usize,
    /// Delay between reveal ticks.
    pub tick_interval: Duration,
    /// Delay between a stage completing and the next stage starting.
    pub stage_delay: Duration,
}

impl Default for PlaybackTiming {
    fn default() -> Self {
        Self {
            reveal_chunk: DEFAULT_REVEAL_CHUNK,
            tick_interval: DEFAULT_TICK_INTERVAL,
            stage_delay: DEFAULT_STAGE_DELAY,
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    cases_dir: PathBuf,
    timing: PlaybackTiming,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `ConsultError::InvalidInput` if `cases_dir` is not a directory or the reveal
    /// chunk is zero.
    pub fn new(cases_dir: PathBuf, timing: PlaybackTiming) -> ConsultResult<Self> {
        if !cases_dir.is_dir() {
            return Err(ConsultError::InvalidInput(format!(
                "cases directory does not exist: {}",
                cases_dir.display()
            )));
        }
        if timing.reveal_chunk == 0 {
            return Err(ConsultError::InvalidInput(
                "reveal_chunk must be greater than zero".into(),
            ));
        }

        Ok(Self { cases_dir, timing })
    }

    pub fn cases_dir(&self) -> &Path {
        &self.cases_dir
    }

    pub fn timing(&self) -> PlaybackTiming {
        self.timing
    }
}

/// Resolve the case fixture directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory. Otherwise this searches for `cases/`
/// relative to the current working directory and then walks up from `CARGO_MANIFEST_DIR`.
pub fn resolve_cases_dir(override_dir: Option<PathBuf>) -> ConsultResult<PathBuf> {
    if let Some(dir) = override_dir {
        if dir.is_dir() {
            return Ok(dir);
        }
        return Err(ConsultError::InvalidInput(format!(
            "CONSULT_CASES_DIR override is not a directory: {}",
            dir.display()
        )));
    }

    let cwd_relative = PathBuf::from(CASES_DIR_NAME);
    if cwd_relative.is_dir() {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(CASES_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }
    }

    Err(ConsultError::InvalidInput(
        "could not locate cases/ directory".into(),
    ))
}

/// Parse a millisecond duration from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn duration_from_env_value(
    value: Option<String>,
    default: Duration,
) -> ConsultResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConsultError::InvalidInput(format!("invalid duration {v:?}: {e}"))),
    }
}

/// Parse the reveal chunk size from an optional string value.
pub fn reveal_chunk_from_env_value(value: Option<String>) -> ConsultResult<usize> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(DEFAULT_REVEAL_CHUNK),
        Some(v) => match v.parse::<usize>() {
            Ok(0) | Err(_) => Err(ConsultError::InvalidInput(format!(
                "reveal chunk must be a positive integer, got {v:?}"
            ))),
            Ok(n) => Ok(n),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_rejects_missing_dir() {
        let result = CoreConfig::new(
            PathBuf::from("/definitely/not/here"),
            PlaybackTiming::default(),
        );
        assert!(matches!(result, Err(ConsultError::InvalidInput(_))));
    }

    #[test]
    fn test_config_rejects_zero_chunk() {
        let dir = TempDir::new().unwrap();
        let timing = PlaybackTiming {
            reveal_chunk: 0,
            ..PlaybackTiming::default()
        };
        assert!(CoreConfig::new(dir.path().to_path_buf(), timing).is_err());
    }

    #[test]
    fn test_resolve_cases_dir_override() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_cases_dir(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(resolved, dir.path());

        let missing = dir.path().join("nope");
        assert!(resolve_cases_dir(Some(missing)).is_err());
    }

    #[test]
    fn test_duration_from_env_value() {
        let default = Duration::from_millis(800);
        assert_eq!(duration_from_env_value(None, default).unwrap(), default);
        assert_eq!(
            duration_from_env_value(Some("  ".into()), default).unwrap(),
            default
        );
        assert_eq!(
            duration_from_env_value(Some("25".into()), default).unwrap(),
            Duration::from_millis(25)
        );
        assert!(duration_from_env_value(Some("fast".into()), default).is_err());
    }

    #[test]
    fn test_reveal_chunk_from_env_value() {
        assert_eq!(reveal_chunk_from_env_value(None).unwrap(), 5);
        assert_eq!(reveal_chunk_from_env_value(Some("12".into())).unwrap(), 12);
        assert!(reveal_chunk_from_env_value(Some("0".into())).is_err());
    }
}
