use std::fmt;

use const_format::concatcp;

pub mod configuration;
pub mod gpx_util;
pub mod location;
pub mod renderer;
pub mod run_session;
pub mod summary;

pub use run_session::*;

pub const CONFIG_DIR: &str = "config/";
pub const DEFAULT_CONFIG_PATH: &str = concatcp!(CONFIG_DIR, "run_tracker.conf");

#[derive(Debug)]
pub enum TrackerError {
    Config(String),
    Gpx(String),
    Io(String),
    Location(String),
    LocationDisabled,
    LocationUnauthorized,
    Session(String),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Config(message) => write!(f, "Configuration error: {message}"),
            TrackerError::Gpx(message) => write!(f, "GPX error: {message}"),
            TrackerError::Io(message) => write!(f, "I/O error: {message}"),
            TrackerError::Location(message) => write!(f, "Location error: {message}"),
            TrackerError::LocationDisabled => write!(f, "Location services are disabled"),
            TrackerError::LocationUnauthorized => write!(f, "Not authorized to use location services"),
            TrackerError::Session(message) => write!(f, "Run session error: {message}"),
        }
    }
}

impl std::error::Error for TrackerError {}
