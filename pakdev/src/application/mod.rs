pub mod handlers;

use crate::presentation::cli::{Cli, Commands, EditCommands};
use clap::Parser;
use pak_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::List {
            paks_dir,
            mount_root,
            long,
        } => handlers::handle_list(paks_dir, mount_root, long),
        Commands::Extract {
            paks_dir,
            dest,
            missing,
            files,
            mount_root,
        } => handlers::handle_extract(paks_dir, dest, missing, files, mount_root),
        Commands::Clean { dest } => handlers::handle_clean(dest),
        Commands::Edit(cmd) => match cmd {
            EditCommands::Append {
                pak,
                input,
                target,
                mount_root,
            } => handlers::handle_append(pak, input, target, mount_root),
            EditCommands::Replace {
                pak,
                target,
                input,
                mount_root,
            } => handlers::handle_replace(pak, target, input, mount_root),
            EditCommands::Delete {
                pak,
                paths,
                mount_root,
            } => handlers::handle_delete(pak, paths, mount_root),
            EditCommands::Rename {
                pak,
                paths,
                suffix,
                mount_root,
            } => handlers::handle_rename(pak, paths, suffix, mount_root),
        },
    }
}
