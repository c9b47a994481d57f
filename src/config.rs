//! Configuration module for the parlor server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the session server
#[derive(Parser, Debug)]
#[command(name = "parlor")]
#[command(author = "parlor authors")]
#[command(version = "0.1.0")]
#[command(about = "A session engine for line-oriented control protocols", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address for the FTP control-channel listener (e.g., 127.0.0.1:2121)
    #[arg(long)]
    pub ftp_addr: Option<String>,

    /// Address for the SMTP listener (e.g., 127.0.0.1:2525)
    #[arg(long)]
    pub smtp_addr: Option<String>,

    /// Maximum concurrent connections per listener
    #[arg(long)]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    pub ftp_addr: Option<String>,
    pub smtp_addr: Option<String>,
    pub log_level: Option<String>,
    pub max_connections: Option<usize>,
    pub max_buffer_bytes: Option<usize>,
    pub idle_timeout_secs: Option<u64>,
    pub ftp_banner: Option<String>,
    pub smtp_banner: Option<String>,
    pub allow_anonymous: Option<bool>,
    #[serde(default)]
    pub users: Vec<User>,
}

/// One entry in the credential table
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub name: String,
    pub password: String,
}

fn default_ftp_addr() -> String {
    "127.0.0.1:2121".to_string()
}

fn default_smtp_addr() -> String {
    "127.0.0.1:2525".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_max_buffer_bytes() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_ftp_banner() -> String {
    "Welcome to the parlor FTP server".to_string()
}

fn default_smtp_banner() -> String {
    "Welcome to the parlor SMTP server".to_string()
}

fn default_users() -> Vec<User> {
    vec![User {
        name: "admin".to_string(),
        password: "password".to_string(),
    }]
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ftp_listen: String,
    pub smtp_listen: String,
    pub log_level: String,
    pub max_connections: usize,
    pub max_buffer_bytes: usize,
    pub idle_timeout_secs: u64,
    pub ftp_banner: String,
    pub smtp_banner: String,
    pub allow_anonymous: bool,
    pub users: Vec<User>,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::resolve(CliArgs::parse())
    }

    fn resolve(cli: CliArgs) -> Result<Self, ConfigError> {
        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            ftp_listen: cli
                .ftp_addr
                .or(toml_config.ftp_addr)
                .unwrap_or_else(default_ftp_addr),
            smtp_listen: cli
                .smtp_addr
                .or(toml_config.smtp_addr)
                .unwrap_or_else(default_smtp_addr),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.log_level.unwrap_or_else(default_log_level)
            },
            max_connections: cli
                .max_connections
                .or(toml_config.max_connections)
                .unwrap_or_else(default_max_connections),
            max_buffer_bytes: toml_config
                .max_buffer_bytes
                .unwrap_or_else(default_max_buffer_bytes),
            idle_timeout_secs: toml_config
                .idle_timeout_secs
                .unwrap_or_else(default_idle_timeout_secs),
            ftp_banner: toml_config.ftp_banner.unwrap_or_else(default_ftp_banner),
            smtp_banner: toml_config.smtp_banner.unwrap_or_else(default_smtp_banner),
            allow_anonymous: toml_config.allow_anonymous.unwrap_or(true),
            users: if toml_config.users.is_empty() {
                default_users()
            } else {
                toml_config.users
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
