//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::Parser;
use std::path::PathBuf;

/// Serial-to-UDP telemetry bridge for a spherical robot
#[derive(Parser, Debug, Default)]
#[command(name = "orb-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,

    /// Serial port to use (overrides config; may repeat for fallbacks)
    #[arg(long, value_name = "PORT")]
    pub port: Vec<String>,

    /// UDP port for telemetry publishing (overrides config)
    #[arg(long, value_name = "PORT")]
    pub udp_port: Option<u16>,

    /// Path to config file (default: ./config.toml)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["orb-bridge"]);
        assert!(!cli.verbose);
        assert!(cli.port.is_empty());
        assert!(cli.udp_port.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_verbose() {
        let cli = Cli::parse_from(["orb-bridge", "-v"]);
        assert!(cli.verbose);

        let cli = Cli::parse_from(["orb-bridge", "--verbose"]);
        assert!(cli.verbose);
    }

    #[test]
    fn test_cli_parse_ports() {
        let cli = Cli::parse_from(["orb-bridge", "--port", "/dev/rfcomm0", "--port", "/dev/rfcomm1"]);
        assert_eq!(cli.port, vec!["/dev/rfcomm0", "/dev/rfcomm1"]);
    }

    #[test]
    fn test_cli_parse_udp_port() {
        let cli = Cli::parse_from(["orb-bridge", "--udp-port", "9100"]);
        assert_eq!(cli.udp_port, Some(9100));
    }

    #[test]
    fn test_cli_parse_config_path() {
        let cli = Cli::parse_from(["orb-bridge", "--config", "/etc/orb.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/orb.toml")));
    }
}
