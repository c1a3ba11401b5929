//! Logging setup for the tspack CLI.
//!
//! The bundler reports its milestones (start, rewrites, write, errors) as
//! `tracing` events; this module installs the subscriber that prints them.
//!
//! Verbosity, in order of precedence:
//! 1. `--verbose`: DEBUG for tspack crates
//! 2. `--quiet`: ERROR only
//! 3. `RUST_LOG`: custom filter
//! 4. default: INFO for tspack crates

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "tspack=debug,tspack_bundler=debug,tspack_cli=debug";
const QUIET_FILTER: &str = "tspack=error,tspack_bundler=error,tspack_cli=error";
const DEFAULT_FILTER: &str = "tspack=info,tspack_bundler=info,tspack_cli=info";

/// Build the filter for the given flags.
pub fn env_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber. Call once, before any logging.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && should_use_colors())
        .with_writer(std::io::stderr)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter(verbose, quiet))
        .with(fmt_layer)
        .init();
}

/// Whether log lines should carry ANSI colors.
///
/// `NO_COLOR` disables, `FORCE_COLOR` forces, otherwise the terminal decides.
pub fn should_use_colors() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::Term::stderr().features().colors_supported()
}
