//! Logging setup
//!
//! Log lines go to stdout next to the progress line of the sequential scan,
//! with colours only when stdout is a terminal.

use std::io::IsTerminal;
use tracing::Level;

/// Install the global `tracing` subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(std::io::stdout().is_terminal())
        .with_writer(std::io::stdout)
        .try_init();
}
