mod commands;
mod editor;
mod error;
mod graph;
mod logging;
mod parser;
mod tui;
mod workspace;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "mindtree", about = "A mind-map editor for the terminal")]
struct Cli {
    /// Append log output to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new mind map containing only its root node
    Init {
        file: PathBuf,
        /// Text of the root node
        #[arg(long, default_value = "")]
        title: String,
    },
    /// Open the interactive editor
    View {
        /// Document to edit; created on first save if it does not exist
        file: Option<PathBuf>,
        /// Launch with a built-in sample map that is never saved
        #[arg(long, conflicts_with = "file")]
        demo: bool,
    },
    /// Print the nodes and edges of a mind map
    List { file: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = matches!(cli.command, Command::View { .. });
    logging::init(cli.log_file.as_deref(), interactive)?;

    match cli.command {
        Command::Init { file, title } => commands::init::run(&file, &title),
        Command::View { file, demo } => commands::view::run(file, demo),
        Command::List { file } => commands::list::run(&file),
    }
}
