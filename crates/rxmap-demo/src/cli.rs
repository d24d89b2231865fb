#![forbid(unsafe_code)]

//! Command-line argument parsing for the map demo.
//!
//! Parses args manually. Environment variables with the `RXMAP_DEMO_*`
//! prefix (and `RXMAP_LOG`) set defaults; flags override them.

use std::env;
use std::path::PathBuf;
use std::process;

use rxmap_widget::AuthorizationPolicy;

use crate::screen::ButtonActions;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP_TEXT: &str = "\
rxmap demo: a map screen wired to reactive event streams

USAGE:
    rxmap-demo [OPTIONS]

OPTIONS:
    --script=PATH        Replay gestures from a JSON script (default: built-in demo)
    --buttons=MODE       What the two buttons do: 'select', 'rotate', 'fill',
                         'traffic', 'camera', or 'zoom-gestures' (default: select)
    --location=ANSWER    Answer to the location permission prompt: 'grant' or 'deny'
                         (default: grant)
    --log=FILTER         Log filter directive (default: info)
    --log-json           Emit logs as JSON lines
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    RXMAP_DEMO_SCRIPT      Same as --script
    RXMAP_DEMO_BUTTONS     Same as --buttons
    RXMAP_DEMO_LOCATION    Same as --location
    RXMAP_DEMO_LOG_JSON    Set to 1 or true for --log-json
    RXMAP_LOG              Same as --log

Logs go to stderr. The transcript of the session is printed to stdout.";

/// Parsed command-line options.
#[derive(Debug, Clone, PartialEq)]
pub struct Opts {
    pub script: Option<PathBuf>,
    pub buttons: ButtonActions,
    pub location: AuthorizationPolicy,
    pub log_filter: String,
    pub log_json: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            script: None,
            buttons: ButtonActions::Select,
            location: AuthorizationPolicy::Grant,
            log_filter: "info".into(),
            log_json: false,
        }
    }
}

#[derive(Debug, PartialEq)]
enum ParseError {
    Help,
    Version,
    InvalidValue { flag: &'static str, value: String },
    UnknownArg(String),
}

impl Opts {
    /// Parse from the process environment and arguments, exiting on
    /// `--help`, `--version`, or bad input.
    pub fn parse() -> Self {
        match Self::parse_from_env_and_args(env::args().skip(1), |key| env::var(key).ok()) {
            Ok(opts) => opts,
            Err(ParseError::Help) => {
                println!("{HELP_TEXT}");
                process::exit(0);
            }
            Err(ParseError::Version) => {
                println!("rxmap-demo {VERSION}");
                process::exit(0);
            }
            Err(ParseError::InvalidValue { flag, value }) => {
                eprintln!("Invalid {flag} value: {value}");
                process::exit(1);
            }
            Err(ParseError::UnknownArg(arg)) => {
                eprintln!("Unknown argument: {arg}");
                eprintln!("Run with --help for usage information.");
                process::exit(1);
            }
        }
    }

    fn parse_from_env_and_args<I, S, F>(args: I, get_env: F) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();

        if let Some(val) = get_env("RXMAP_DEMO_SCRIPT")
            && !val.trim().is_empty()
        {
            opts.script = Some(PathBuf::from(val));
        }
        if let Some(val) = get_env("RXMAP_DEMO_BUTTONS")
            && let Some(mode) = ButtonActions::parse(&val)
        {
            opts.buttons = mode;
        }
        if let Some(val) = get_env("RXMAP_DEMO_LOCATION")
            && let Some(policy) = AuthorizationPolicy::parse(&val)
        {
            opts.location = policy;
        }
        if let Some(val) = get_env("RXMAP_DEMO_LOG_JSON") {
            opts.log_json = val == "1" || val.eq_ignore_ascii_case("true");
        }
        if let Some(val) = get_env("RXMAP_LOG")
            && !val.trim().is_empty()
        {
            opts.log_filter = val;
        }

        for arg in args {
            match arg.as_ref() {
                "--help" | "-h" => return Err(ParseError::Help),
                "--version" | "-V" => return Err(ParseError::Version),
                "--log-json" => opts.log_json = true,
                other => {
                    if let Some(val) = other.strip_prefix("--script=") {
                        if val.is_empty() {
                            return Err(ParseError::InvalidValue {
                                flag: "--script",
                                value: val.to_string(),
                            });
                        }
                        opts.script = Some(PathBuf::from(val));
                    } else if let Some(val) = other.strip_prefix("--buttons=") {
                        match ButtonActions::parse(val) {
                            Some(mode) => opts.buttons = mode,
                            None => {
                                return Err(ParseError::InvalidValue {
                                    flag: "--buttons",
                                    value: val.to_string(),
                                });
                            }
                        }
                    } else if let Some(val) = other.strip_prefix("--location=") {
                        match AuthorizationPolicy::parse(&val) {
                            Some(policy) => opts.location = policy,
                            None => {
                                return Err(ParseError::InvalidValue {
                                    flag: "--location",
                                    value: val.to_string(),
                                });
                            }
                        }
                    } else if let Some(val) = other.strip_prefix("--log=") {
                        opts.log_filter = val.to_string();
                    } else {
                        return Err(ParseError::UnknownArg(other.to_string()));
                    }
                }
            }
        }

        Ok(opts)
    }
}
