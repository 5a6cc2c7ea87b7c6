//! Diagnostic logging to stderr.
//!
//! Stdout is reserved for command output, so the subscriber always writes
//! to stderr. `RUST_LOG` wins over the `-v` count when it is set.

use tracing_subscriber::EnvFilter;

/// Filter directive for a `-v` count.
pub fn level_for(verbose: u8) -> &'static str
{
    match verbose
    {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(
    verbose: u8,
    quiet: bool,
    no_color: bool,
)
{
    let default = if quiet { "error" } else { level_for(verbose) };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!no_color)
        .try_init();
}
