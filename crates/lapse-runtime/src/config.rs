use std::path::PathBuf;

use tracing::warn;

/// Path the capture is written to by `stop_capture` when no sink is set.
pub const CAPTURE_PATH_ENV: &str = "LAPSE_CAPTURE";
/// `1`/`true` makes failed invariant checks panic.
pub const FATAL_ASSERTIONS_ENV: &str = "LAPSE_FATAL_ASSERTIONS";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilerConfig {
    /// Installs a `FileSink` writing to this path.
    pub capture_path: Option<PathBuf>,
    /// Replaces the assertion handler with `panic_on_assert` when the
    /// profiler is built. The handler is process-wide.
    pub fatal_assertions: bool,
}

impl ProfilerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let capture_path = lookup(CAPTURE_PATH_ENV)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let fatal_assertions = match lookup(FATAL_ASSERTIONS_ENV) {
            Some(value) => parse_flag(&value).unwrap_or_else(|| {
                warn!(
                    var = FATAL_ASSERTIONS_ENV,
                    value = %value,
                    "unrecognized flag value, assertions stay non-fatal"
                );
                false
            }),
            None => false,
        };

        Self {
            capture_path,
            fatal_assertions,
        }
    }

    #[must_use]
    pub fn with_capture_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.capture_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_fatal_assertions(mut self, fatal: bool) -> Self {
        self.fatal_assertions = fatal;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
