#![forbid(unsafe_code)]

//! rxmap demo binary.
//!
//! Run with: `cargo run -p rxmap-demo -- --buttons=select`

use std::process;

use rxmap_demo::cli::Opts;
use rxmap_demo::{MapScreen, Script, logging};
use tracing::{info, warn};

fn main() {
    let opts = Opts::parse();

    if let Err(err) = logging::init(&opts.log_filter, opts.log_json) {
        eprintln!("Failed to initialize logging: {err}");
        process::exit(1);
    }

    let script = match &opts.script {
        Some(path) => match Script::load(path) {
            Ok(script) => script,
            Err(err) => {
                eprintln!("{err}");
                process::exit(1);
            }
        },
        None => Script::demo(),
    };

    let screen = MapScreen::new(opts.buttons, opts.location);
    if let Err(err) = screen.setup().and_then(|()| screen.appear()) {
        eprintln!("Failed to set up map screen: {err}");
        process::exit(1);
    }

    let summary = script.run(&screen);
    for err in screen.take_errors() {
        warn!(error = %err, "binding error");
    }
    screen.teardown();
    info!(
        applied = summary.applied,
        rejected = summary.rejected,
        "script finished"
    );

    for line in screen.transcript().lines() {
        println!("{line}");
    }
}
