//! CLI for rover.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rover_core::config::{self, MountLocation};
use std::process::ExitCode;

use commands::run_fetch;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "rover")]
#[command(about = "Fetch hash-verified repository files into a local cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Fetch a group of files.
    Fetch {
        /// The name of the repository being fetched.
        #[arg(long, short = 'r')]
        repo: String,

        /// The URL of the repository.
        #[arg(long, short = 'u')]
        url: String,

        /// A file and its checksum hash, separated by '='.
        #[arg(
            long = "file",
            short = 'f',
            value_name = "FILENAME=HASH",
            num_args = 1..,
            required = true
        )]
        files: Vec<String>,

        /// If used, delete and redownload all files.
        #[arg(long)]
        no_cache: bool,
    },
}

impl Cli {
    pub fn run_from_args() -> Result<ExitCode> {
        Cli::parse().run()
    }

    pub fn run(self) -> Result<ExitCode> {
        let Some(command) = self.command else {
            print!("{}", insufficient_subcommands_message("The rover program", "rover"));
            return Ok(ExitCode::FAILURE);
        };

        match command {
            CliCommand::Fetch {
                repo,
                url,
                files,
                no_cache,
            } => {
                let mount = MountLocation::from_env()?;
                let cfg = config::load()?;
                tracing::debug!("loaded config: {:?}", cfg);
                run_fetch(&cfg, &mount, repo, url, files, no_cache)?;
            }
        }

        Ok(ExitCode::SUCCESS)
    }
}

/// Printed when a command needs a subcommand that was not given.
fn insufficient_subcommands_message(subcommand: &str, command_str: &str) -> String {
    format!("\n  {subcommand} requires further subcommands!\n  For more info: \"{command_str} -h\"\n\n")
}

#[cfg(test)]
mod tests;
