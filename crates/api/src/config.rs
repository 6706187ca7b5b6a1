//! Configuration management for the KeyReg gateway.
//!
//! This module handles loading configuration from:
//! - TOML files
//! - Environment variables referenced as `${VAR_NAME}`
//! - Default values (fallbacks)

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

/// Main configuration for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    pub network: NetworkConfig,

    /// Contract addresses
    pub contracts: ContractsConfig,

    /// Transaction signer
    pub signer: SignerConfig,

    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Ethereum RPC URL
    pub rpc_url: String,

    /// Chain ID the RPC endpoint must report (e.g. 31337 for a local node)
    pub chain_id: u64,
}

/// Contract addresses configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// PublicKeyRegistry contract address
    pub key_registry: Address,
}

/// Signer configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Private key for the sending account (hex, optional 0x prefix)
    pub private_key: String,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables can be referenced using `${VAR_NAME}` syntax.
    /// For example: `private_key = "${KEYREG_PRIVATE_KEY}"`
    ///
    /// # Example
    /// ```no_run
    /// # use keyreg_api::config::Config;
    /// let config = Config::from_file("keyreg.toml")?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let expanded = Self::expand_env_vars(&contents)?;

        let config: Config = toml::from_str(&expanded)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml).context("Failed to parse TOML configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url.is_empty() {
            anyhow::bail!("Network RPC URL cannot be empty");
        }

        if self.network.chain_id == 0 {
            anyhow::bail!("Chain ID must be non-zero");
        }

        if self.contracts.key_registry.is_zero() {
            anyhow::bail!("Contracts key_registry must be a non-zero address");
        }

        let key = self.signer.private_key.trim_start_matches("0x");
        if key.len() != 64 {
            anyhow::bail!(
                "Signer private_key must be 64 hex characters (got {})",
                key.len()
            );
        }
        if !key.chars().all(|c| c.is_ascii_hexdigit()) {
            anyhow::bail!("Signer private_key must be a valid hex string");
        }

        self.server
            .host
            .parse::<IpAddr>()
            .with_context(|| format!("Server host must be an IP address (got '{}')", self.server.host))?;

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Logging level must be one of: {} (got '{}')",
                valid_levels.join(", "),
                self.logging.level
            );
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "Logging format must be one of: {} (got '{}')",
                valid_formats.join(", "),
                self.logging.format
            );
        }

        Ok(())
    }

    /// Build the transaction signer from the configured private key.
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        self.signer
            .private_key
            .trim_start_matches("0x")
            .parse::<PrivateKeySigner>()
            .context("Invalid signer private_key")
    }

    /// Socket address the HTTP server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .host
            .parse()
            .with_context(|| format!("Invalid server host: {}", self.server.host))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Expand `${VAR_NAME}` placeholders.
    ///
    /// Placeholders inside comments (a `#` outside any quoted string) are left
    /// untouched. Multiline `"""` and `'''` strings carry over line breaks, so
    /// a `#` on a continuation line is string content. A referenced variable
    /// that is not set is an error.
    fn expand_env_vars(input: &str) -> Result<String> {
        let mut result = String::with_capacity(input.len());
        let mut state = MultilineState::default();

        for (idx, line) in input.lines().enumerate() {
            let (code, comment) = split_comment(line, &mut state);
            result.push_str(&expand_line(code, idx + 1)?);
            result.push_str(comment);
            result.push('\n');
        }

        Ok(result)
    }
}

/// Multiline string open at the end of the previous line, if any.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct MultilineState {
    basic: bool,
    literal: bool,
}

/// Split a TOML line into its code and trailing comment.
fn split_comment<'a>(line: &'a str, state: &mut MultilineState) -> (&'a str, &'a str) {
    const TRIPLE_BASIC: &[u8] = b"\"\"\"";
    const TRIPLE_LITERAL: &[u8] = b"'''";

    let bytes = line.as_bytes();
    let mut in_basic = false;
    let mut in_literal = false;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];

        if state.basic {
            if rest[0] == b'\\' {
                i += 2;
                continue;
            }
            if rest.starts_with(TRIPLE_BASIC) {
                state.basic = false;
                i += 3;
                continue;
            }
        } else if state.literal {
            if rest.starts_with(TRIPLE_LITERAL) {
                state.literal = false;
                i += 3;
                continue;
            }
        } else if in_basic {
            match rest[0] {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'"' => in_basic = false,
                _ => {}
            }
        } else if in_literal {
            if rest[0] == b'\'' {
                in_literal = false;
            }
        } else if rest.starts_with(TRIPLE_BASIC) {
            state.basic = true;
            i += 3;
            continue;
        } else if rest.starts_with(TRIPLE_LITERAL) {
            state.literal = true;
            i += 3;
            continue;
        } else {
            match rest[0] {
                b'"' => in_basic = true,
                b'\'' => in_literal = true,
                // '#' is ASCII, so `i` is a char boundary here
                b'#' => return line.split_at(i),
                _ => {}
            }
        }

        i += 1;
    }

    (line, "")
}

fn expand_line(line: &str, line_no: usize) -> Result<String> {
    let mut result = String::with_capacity(line.len());
    let mut rest = line;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let end = after.find('}').ok_or_else(|| {
            anyhow::anyhow!(
                "Unclosed environment variable placeholder on line {}",
                line_no
            )
        })?;

        let var_name = &after[..end];
        if var_name.is_empty() {
            anyhow::bail!("Empty environment variable name on line {}", line_no);
        }

        match std::env::var(var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => anyhow::bail!(
                "Environment variable '{}' is not set (referenced on line {})",
                var_name,
                line_no
            ),
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}
