//! CLI command definitions for tasknest
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod tree;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tree::TreeArgs;

/// TaskNest nested task list server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: ./tasknest.yaml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    /// Address to bind the web server to (overrides config)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Port for the web server (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web server (default if no subcommand given)
    Serve,

    /// Print the task tree to stdout
    Tree(TreeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["tasknest"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log, "2");
    }

    #[test]
    fn global_overrides_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["tasknest", "serve", "--port", "8080", "-d", "x.db"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Serve)));
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.database, Some(PathBuf::from("x.db")));
    }

    #[test]
    fn tree_arguments() {
        let cli = Cli::try_parse_from(["tasknest", "tree", "--format", "json", "--all"]).unwrap();
        match cli.command {
            Some(Command::Tree(args)) => {
                assert_eq!(args.format, crate::format::OutputFormat::Json);
                assert!(args.all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
