//! imgate CLI library
//!
//! Configuration loading, the stdin/stdout JSON-lines transport and the
//! application wrapper that runs the gateway against the loopback network.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod transport;

pub use app::GatewayApp;
pub use cli::{Cli, Commands, ServeArgs};
pub use config::AppConfig;
pub use error::{CliError, Result};
