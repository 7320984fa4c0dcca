//! Log output for the CLI.
//!
//! The core logs through `tracing`; this installs a compact formatter on
//! stderr so stdout stays clean for command output.

use tracing::Level;

/// Installs the global subscriber.
///
/// `-v` and `-vv` win over `SWTC_LOG`; without either only warnings and
/// errors are shown.
pub fn init(verbose: u8, configured: Option<Level>) {
    let level = match verbose {
        0 => configured.unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
