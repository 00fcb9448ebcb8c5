//! Logging utilities

pub use log::{debug, info, warn, error, trace};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "soundscape=info";

/// Initialize the logging system
///
/// Safe to call more than once; later calls are ignored.
pub fn init() {
    let env = env_logger::Env::default().default_filter_or(DEFAULT_FILTER);
    let _ = env_logger::Builder::from_env(env).try_init();
}
