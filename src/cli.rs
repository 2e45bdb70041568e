//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the sessionlink client.

use clap::{Parser, Subcommand};

/// sessionlink - resilient session channel client
///
/// Connects to a server over a session-keyed WebSocket channel, recovers
/// from unexpected disconnects, and streams typed messages both ways.
#[derive(Parser, Debug)]
#[command(name = "sessionlink")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the client
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the client (connects to the server and streams messages)
    Run {
        /// Path to configuration file
        #[arg(short, long, env = "SESSIONLINK_CONFIG")]
        config: Option<String>,

        /// Session identifier (generated if not set here or in config)
        #[arg(short, long, env = "SESSIONLINK_SESSION_ID")]
        session: Option<String>,
    },

    /// Display version and build information
    Version,

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verifies that the CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::parse_from(["sessionlink", "run"]);
        match cli.command {
            Commands::Run { config, session } => {
                assert!(config.is_none());
                assert!(session.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_config() {
        let cli = Cli::parse_from(["sessionlink", "run", "--config", "/path/to/config.toml"]);
        match cli.command {
            Commands::Run { config, .. } => {
                assert_eq!(config, Some("/path/to/config.toml".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_run_with_session() {
        let cli = Cli::parse_from(["sessionlink", "run", "--session", "abc123"]);
        match cli.command {
            Commands::Run { session, .. } => {
                assert_eq!(session, Some("abc123".to_string()));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["sessionlink", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["sessionlink", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_show() {
        let cli = Cli::parse_from(["sessionlink", "config", "show"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Show { config } } => {
                assert!(config.is_none());
            }
            _ => panic!("Expected Config Show command"),
        }
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["sessionlink", "config", "init", "--force"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Init { path, force } } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_config_validate_with_path() {
        let cli = Cli::parse_from(["sessionlink", "config", "validate", "--config", "x.toml"]);
        match cli.command {
            Commands::Config { subcommand: ConfigSubcommand::Validate { config } } => {
                assert_eq!(config, Some("x.toml".to_string()));
            }
            _ => panic!("Expected Config Validate command"),
        }
    }
}
