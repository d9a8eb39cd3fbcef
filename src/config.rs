use crate::error::Error;
use crate::{muted_error, weak_error};
use log::error;
use serde::Deserialize;
use std::fs::read_to_string;
use std::path::Path;

/// Behaviour of a DAP connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Operation kind used for telemetry records of inbound requests.
    pub telemetry_kind: String,
    /// Answer requests without a registered handler with a failed response
    /// (otherwise the request is only logged).
    pub reply_to_unknown_commands: bool,
    /// Reject requests still waiting for a response when the connection stops.
    pub fail_pending_on_close: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            telemetry_kind: "dapOperation".to_string(),
            reply_to_unknown_commands: false,
            fail_pending_on_close: true,
        }
    }
}

impl SessionConfig {
    const DEFAULT_PATH: &'static str = ".config/bs/yadap.toml";

    pub fn parse(data: &str) -> Result<Self, Error> {
        Ok(toml::from_str(data)?)
    }

    /// Load config from file, use `~/.config/bs/yadap.toml` if path is not set.
    /// Return default configuration on errors.
    pub fn load(path: Option<&Path>) -> Self {
        let data = match path {
            None => {
                let Some(home) = home::home_dir() else {
                    return Self::default();
                };
                match muted_error!(read_to_string(home.join(Self::DEFAULT_PATH))) {
                    Some(data) => data,
                    None => return Self::default(),
                }
            }
            Some(path) => match read_to_string(path) {
                Ok(data) => data,
                Err(err) => {
                    error!("Error while load config file: {err}");
                    return Self::default();
                }
            },
        };

        weak_error!(Self::parse(&data), "invalid config:").unwrap_or_default()
    }
}
