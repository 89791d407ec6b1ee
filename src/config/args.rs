//! Command-line argument parsing
//!
//! `framelinker` with no subcommand runs the HTTP server.

use clap::{Parser, Subcommand};

use super::DEFAULT_CONFIG_PATH;
use crate::storage::Region;

#[derive(Debug, Parser)]
#[command(name = "framelinker", version, about = "Frame analytics proxy")]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Register a frame URL and print its alias link
    Register {
        #[arg(long)]
        frame_url: String,
        #[arg(long)]
        api_key: String,
        #[arg(long, default_value = "us")]
        region: Region,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write a sample configuration file (prints to stdout without a path)
    Generate { path: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_means_server() {
        let args = Args::parse_from(["framelinker"]);
        assert!(args.command.is_none());
        assert_eq!(args.config, DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_config_flag_is_global() {
        let args = Args::parse_from(["framelinker", "serve", "-c", "custom.toml"]);
        assert_eq!(args.config, "custom.toml");
        assert!(matches!(args.command, Some(Command::Serve)));
    }

    #[test]
    fn test_register_parses_region() {
        let args = Args::parse_from([
            "framelinker",
            "register",
            "--frame-url",
            "https://ex.com/f",
            "--api-key",
            "k1",
            "--region",
            "eu",
        ]);
        match args.command {
            Some(Command::Register {
                frame_url,
                api_key,
                region,
            }) => {
                assert_eq!(frame_url, "https://ex.com/f");
                assert_eq!(api_key, "k1");
                assert_eq!(region, Region::Eu);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_register_rejects_unknown_region() {
        let result = Args::try_parse_from([
            "framelinker",
            "register",
            "--frame-url",
            "https://ex.com/f",
            "--api-key",
            "k1",
            "--region",
            "apac",
        ]);
        assert!(result.is_err());
    }
}
