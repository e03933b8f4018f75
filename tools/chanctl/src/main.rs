// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: Host CLI for driving chardev-chan channels
//! OWNERS: @runtime
//! STATUS: Experimental
//! API_STABILITY: Unstable
//! TEST_COVERAGE: Unit tests (script parsing/execution, stress run)
//!
//! PUBLIC API:
//!   - CLI: chanctl config [--config FILE]
//!   - CLI: chanctl exec [--config FILE] OP...
//!   - CLI: chanctl stress [--config FILE] --writers K --readers K --records N
//!
//! DEPENDENCIES:
//!   - clap: argument parsing
//!   - env_logger: RUST_LOG driven logging of channel internals
//!   - anyhow: error context for the binary

mod script;
mod stress;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chardev_chan::{Channel, ChannelConfig};
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "chanctl", version, about = "Exercise a bounded chardev channel on the host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the effective configuration as TOML.
    Config {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Open one session and run a script of operations.
    Exec {
        #[arg(long)]
        config: Option<PathBuf>,
        /// Operations such as `write:hello`, `read:5`, `get:length`.
        #[arg(required = true, allow_hyphen_values = true)]
        ops: Vec<String>,
    },
    /// Run concurrent writers and readers against one channel.
    Stress {
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 2)]
        writers: usize,
        #[arg(long, default_value_t = 2)]
        readers: usize,
        #[arg(long, default_value_t = 10_000)]
        records: u32,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ChannelConfig> {
    match path {
        Some(path) => ChannelConfig::load(path)
            .with_context(|| format!("loading channel config {}", path.display())),
        None => Ok(ChannelConfig::default()),
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Config { config } => {
            let config = load_config(config.as_deref())?;
            print!("{}", config.to_toml_string()?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Exec { config, ops } => {
            let config = load_config(config.as_deref())?;
            let ops = script::parse_script(&ops)?;
            let channel = Channel::new(config)?;
            let failures = script::execute(&channel, &ops, &mut io::stdout().lock())?;
            Ok(if failures == 0 { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Command::Stress { config, writers, readers, records } => {
            let config = load_config(config.as_deref())?;
            let channel = Channel::new(config)?;
            let report = stress::run(&channel, writers, readers, records)?;
            println!("records written: {}", report.records_written);
            println!("bytes written:   {}", report.bytes_written);
            println!("bytes read:      {}", report.bytes_read);
            println!("valid records:   {}", report.valid_records);
            println!("invalid records: {}", report.invalid_records);
            println!("torn records:    {}", report.torn_records);
            println!("{:?}", report.stats);
            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            })
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("chanctl: {err:#}");
            ExitCode::FAILURE
        }
    }
}
