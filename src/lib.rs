//! livesocket tools - main library
//!
//! Command line tooling around the `livesocket` client.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config paths, logging)
//! - **livesocket**: Resilient websocket client (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use livesocket_tools::bin_common::{load_config_from_env, ConfigType};
//! use livesocket_tools::livesocket::SocketConfig;
//! ```

// Re-export workspace libraries for convenience
pub use livesocket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{init_tracing, load_config_from_env, parse_args, ConfigType};
}
