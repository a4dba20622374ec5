use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use satchel::{peek_version, shape_of_folder, version_scenario, VersionTag};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "Inspect satchel versions and storage")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// How data stored at <remote> is treated by a reader supporting <oldest>..<current>
    Scenario {
        remote: VersionTag,
        oldest: VersionTag,
        current: VersionTag,
    },
    /// Count folders, files and bytes below a folder
    Shape { path: PathBuf },
    /// Print the version recorded in a stored file
    Inspect { file: PathBuf },
}

fn main() -> Result<()> {
    let stdout_printer = tracing_subscriber::fmt::Layer::new();
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(stdout_printer)
        .init();

    match Cli::parse().command {
        Command::Scenario {
            remote,
            oldest,
            current,
        } => {
            let (tag, scenario) = version_scenario(Some(remote), Some((oldest, current)));
            match tag {
                Some(tag) => println!("{scenario} {tag}"),
                None => println!("{scenario}"),
            }
        }
        Command::Shape { path } => {
            let (folders, files, bytes) = shape_of_folder(&path)?;
            println!("{folders} folders, {files} files, {bytes} bytes");
        }
        Command::Inspect { file } => {
            let text = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
            match peek_version(&text)? {
                Some(tag) => println!("{tag}"),
                None => println!("unversioned"),
            }
        }
    }
    Ok(())
}
