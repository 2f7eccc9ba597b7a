//! CLI utilities for binaries
//!
//! Handles configuration path resolution, logging setup and argument
//! parsing for all binary executables.

use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Socket configuration (config/socket.yaml)
    Socket,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Socket => "config/socket.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        match self {
            ConfigType::Socket => "SOCKET_CONFIG_PATH",
            ConfigType::Custom(_) => "CONFIG_PATH",
        }
    }
}

/// Load configuration path from environment or use default
///
/// Custom paths always win over the environment.
///
/// # Examples
/// ```
/// use livesocket_tools::bin_common::{load_config_from_env, ConfigType};
///
/// let path = load_config_from_env(ConfigType::Socket);
/// ```
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    if let ConfigType::Custom(path) = config_type {
        return path.into();
    }
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Initialize tracing with `RUST_LOG` support
///
/// `default_directive` applies when `RUST_LOG` does not mention a target,
/// e.g. `"livesocket=info"`.
pub fn init_tracing(default_directive: &str) {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    match default_directive.parse() {
        Ok(directive) => filter = filter.add_directive(directive),
        Err(e) => eprintln!("Ignoring invalid log directive '{}': {}", default_directive, e),
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}
