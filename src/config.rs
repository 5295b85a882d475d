use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: &str) -> Result<T> {
    let data = fs::read_to_string(file_path).map_err(|e| Error::IoError(e))?;

    let parsed_data: T = serde_json::from_str(&data).map_err(|e| Error::DeserializationError(e))?;

    Ok(parsed_data)
}

fn default_api_port() -> u16 {
    29444
}

fn default_agent_port() -> u16 {
    29055
}

fn default_ckpt_dir() -> String {
    "/var/lib/tegu/resmgr".to_string()
}

fn default_log_dir() -> String {
    "/var/log/tegu".to_string()
}

fn default_ckpt_keep() -> usize {
    10
}

fn default_user_cap_pct() -> u8 {
    100
}

/// Process-wide configuration. Everything here is injected into the actors
/// at construction; there are no ambient globals.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the (external) HTTP front-end binds; kept here so one file
    /// configures the whole deployment.
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Port agents connect to.
    #[serde(default = "default_agent_port")]
    pub agent_port: u16,

    #[serde(default = "default_ckpt_dir")]
    pub ckpt_dir: String,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Administrative bearer secret; grants access to every pledge.
    #[serde(default)]
    pub super_cookie: Option<String>,

    /// Per-tenant share of a link a reservation may consume, percent.
    #[serde(default = "default_user_cap_pct")]
    pub default_user_cap: u8,

    /// Amount (bytes/sec) subtracted from every requested rate before
    /// admission checks.
    #[serde(default)]
    pub discount: i64,

    #[serde(default = "default_ckpt_keep")]
    pub ckpt_keep: usize,

    /// Physical network description loaded at boot.
    #[serde(default)]
    pub topology_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_port: default_api_port(),
            agent_port: default_agent_port(),
            ckpt_dir: default_ckpt_dir(),
            log_dir: default_log_dir(),
            super_cookie: None,
            default_user_cap: default_user_cap_pct(),
            discount: 0,
            ckpt_keep: default_ckpt_keep(),
            topology_file: None,
        }
    }
}

impl Config {
    pub fn load(file_path: Option<&str>) -> Result<Config> {
        match file_path {
            Some(path) => parse_json_file::<Config>(path),
            None => Ok(Config::default()),
        }
    }
}
