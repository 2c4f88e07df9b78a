//! Logging initialization utilities.

use env_logger::Env;

/// Initialize logging with a default filter level.
///
/// `RUST_LOG` overrides the default. `verbose` lowers the default to `debug`.
pub fn init(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env = Env::default().default_filter_or(default);
    // A second init (tests, embedding) is harmless; keep the first logger.
    let _ = env_logger::Builder::from_env(env).try_init();
}
