//! Diagnostic trace output
//!
//! Decision points of the engine go through [`diag!`], which logs at info
//! level when the diagnostics toggle is on and at debug level otherwise.

use tracing_subscriber::EnvFilter;

/// Log target used for every engine decision point
pub const TARGET: &str = "speedcopy";

/// Emit a decision-point event, honouring `CopyOptions::diagnostics`
macro_rules! diag {
    ($options:expr, $($arg:tt)+) => {
        if $options.diagnostics {
            tracing::info!(target: "speedcopy", $($arg)+);
        } else {
            tracing::debug!(target: "speedcopy", $($arg)+);
        }
    };
}

pub(crate) use diag;

/// Install a formatting subscriber showing diagnostic lines on stderr
///
/// Honours `RUST_LOG` when set, otherwise shows `speedcopy=info`.
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", TARGET)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
