#![forbid(unsafe_code)]

//! Demo map screen for rxmap.
//!
//! [`screen::MapScreen`] wires a headless map's event sources, delegate
//! hooks and buttons to reactive streams inside one disposal scope. The
//! binary replays a [`script::Script`] of gestures against it and prints the
//! resulting transcript.

pub mod cli;
pub mod logging;
pub mod screen;
pub mod script;
pub mod transcript;

pub use screen::{ButtonActions, MapScreen};
pub use script::{Gesture, RunSummary, Script, ScriptError};
pub use transcript::Transcript;
