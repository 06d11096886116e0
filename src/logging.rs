//! Process-wide logging.
//!
//! `critical` and `fatal` both map to `tracing`'s `ERROR` level; they are
//! distinguished by a `severity` field on the event so a formatter or
//! downstream collector can tell "logged and continuing" apart from
//! "about to abort". `fatal` additionally terminates the process after the
//! event is emitted.

use once_cell::sync::OnceCell;
use std::process::ExitCode;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global `tracing` subscriber. Safe to call more than once
/// (e.g. from multiple `Controller::new` calls in a test binary) — only the
/// first call takes effect.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init()
            .ok();
    });
}

/// Log at critical severity: user-visible, non-fatal.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => {
        tracing::error!(severity = "critical", $($arg)*)
    };
}

/// Log at fatal severity and exit the process with the given code.
pub fn fatal(message: &str, exit_code: i32) -> ! {
    tracing::error!(severity = "fatal", message);
    let _ = message;
    std::process::exit(exit_code);
}

/// Convert a framework exit code into the process `ExitCode` the `dfa`
/// binary returns from `main`.
pub fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(code.clamp(0, 255) as u8)
}
