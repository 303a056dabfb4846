use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "pakdev CLI (alpha)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum EditCommands {
    /// Append a file to a container as a new uncompressed entry
    Append {
        pak: PathBuf,
        /// source file on disk
        input: PathBuf,
        /// resolved path inside the container (must fall under the mount point)
        target: PathBuf,
        /// prefix the embedded mount point resolves against
        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,
    },
    /// Overwrite an entry's bytes in place (same size or smaller)
    Replace {
        pak: PathBuf,
        /// resolved path of the entry to overwrite
        target: PathBuf,
        /// source file on disk
        input: PathBuf,
        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,
    },
    /// Remove entries from the index without moving data
    Delete {
        pak: PathBuf,
        /// resolved paths of the entries to drop
        paths: Vec<PathBuf>,
        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,
    },
    /// Append a suffix to matching entries' stored paths
    Rename {
        pak: PathBuf,
        /// resolved paths of the entries to rename
        paths: Vec<PathBuf>,
        #[arg(long)]
        suffix: String,
        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum Commands {
    /// List containers in a directory and their entries
    List {
        paks_dir: PathBuf,

        /// prefix the embedded mount points resolve against
        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,

        /// show per-entry offset/size/hash
        #[arg(long)]
        long: bool,
    },

    /// Extract packaged files to a destination
    Extract {
        paks_dir: PathBuf,
        dest: PathBuf,

        /// only files that are absent or fail hash verification
        #[arg(long)]
        missing: bool,

        /// explicit resolved paths; everything when omitted
        files: Vec<PathBuf>,

        #[arg(long = "mount-root", default_value = "")]
        mount_root: PathBuf,
    },

    /// Delete previously extracted files under a destination
    Clean {
        dest: PathBuf,
    },

    #[command(subcommand)]
    /// In-place container edits (append/replace/rename/delete)
    Edit(EditCommands),
}
