#![forbid(unsafe_code)]

//! Subscriber bootstrap for the demo binary.

use std::error::Error;
use std::io;

use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr; `json` switches to
/// one JSON object per event.
pub fn init(filter: &str, json: bool) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_new(filter)?;
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false)
            .try_init()
    }
}
