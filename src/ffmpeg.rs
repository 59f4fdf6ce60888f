//! FFmpeg initialisation and log-level configuration.
//!
//! FFmpeg has its own internal logging system, separate from the Rust
//! [`log`](https://crates.io/crates/log) crate. By default it prints
//! warnings and errors to stderr, which can be noisy in library usage.
//! [`set_ffmpeg_log_level`] tunes that output without requiring callers to
//! depend on `ffmpeg-next` directly.

use std::sync::Once;

use ffmpeg_next::util::log::Level;

static INIT: Once = Once::new();

/// Initialise the FFmpeg libraries once per process.
///
/// Safe to call from every construction path; subsequent calls are no-ops.
pub(crate) fn init_ffmpeg() {
    INIT.call_once(|| {
        if let Err(error) = ffmpeg_next::init() {
            // Registration failures surface later when the container is
            // opened; nothing useful can be done here.
            log::warn!("FFmpeg initialisation failed: {error}");
        }
    });
}

/// FFmpeg internal log verbosity, from most quiet to most verbose.
///
/// Maps directly to FFmpeg's `AV_LOG_*` constants. This controls FFmpeg's
/// own console output, not messages emitted through the `log` crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing at all.
    Quiet,
    /// Unrecoverable conditions followed by process abort.
    Panic,
    /// Unrecoverable errors; the context becomes unusable.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default level).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging output.
    Debug,
    /// Extremely verbose tracing output.
    Trace,
}

impl From<FfmpegLogLevel> for Level {
    fn from(level: FfmpegLogLevel) -> Level {
        match level {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Panic => Level::Panic,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
            FfmpegLogLevel::Trace => Level::Trace,
        }
    }
}

/// Set the verbosity of FFmpeg's internal console output.
///
/// # Example
///
/// ```no_run
/// use frameseek::FfmpegLogLevel;
///
/// // Only show fatal errors.
/// frameseek::set_ffmpeg_log_level(FfmpegLogLevel::Fatal);
/// ```
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.into());
}

/// Format an FFmpeg error code as a human-readable string.
pub(crate) fn error_string(code: std::os::raw::c_int) -> String {
    ffmpeg_next::Error::from(code).to_string()
}
