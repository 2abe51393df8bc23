//! Command line interface definitions

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "imgate account-session gateway", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve JSON-lines requests on stdin, replies and pushes on stdout
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Seconds a login may stay pending
    #[arg(long)]
    pub login_timeout: Option<u64>,

    /// Reject logins that do not name a local interface
    #[arg(long)]
    pub require_local_address: bool,

    /// Loopback login latency in milliseconds
    #[arg(long)]
    pub latency_ms: Option<u64>,

    /// Do not echo sent messages back as incoming ones
    #[arg(long)]
    pub no_echo: bool,
}

impl ServeArgs {
    /// Apply flag overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(secs) = self.login_timeout {
            config.gateway.timeouts.login_timeout_secs = secs;
        }
        if self.require_local_address {
            config.gateway.require_local_address = true;
        }
        if let Some(latency) = self.latency_ms {
            config.loopback.connect_latency_ms = latency;
        }
        if self.no_echo {
            config.loopback.echo_messages = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_flags() {
        let cli = Cli::try_parse_from([
            "imgate",
            "-v",
            "--config",
            "imgate.toml",
            "serve",
            "--login-timeout",
            "5",
            "--no-echo",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.config.as_deref(), Some("imgate.toml"));
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };

        let mut config = AppConfig::default();
        args.apply(&mut config);
        assert_eq!(config.gateway.timeouts.login_timeout_secs, 5);
        assert!(!config.loopback.echo_messages);
        assert!(!config.gateway.require_local_address);
        assert_eq!(config.loopback.connect_latency_ms, 200);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["imgate"]).is_err());
        assert!(matches!(
            Cli::try_parse_from(["imgate", "config"]).unwrap().command,
            Commands::Config
        ));
    }
}
