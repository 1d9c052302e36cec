use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "devsplit")]
#[command(about = "Partition hierarchical point lists into devices", long_about = None)]
pub struct Cli {
    /// Source CSV file
    #[arg(short, long, global = true)]
    pub input: Option<PathBuf>,

    /// Column holding the point path (overrides configuration)
    #[arg(long, global = true)]
    pub path_column: Option<String>,

    /// Column holding the point type (overrides configuration)
    #[arg(long, global = true)]
    pub type_column: Option<String>,

    /// State file (overrides configuration)
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

    /// More log output (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the folder tree with device and hidden markers
    Tree,
    /// List devices and merged devices
    Devices,
    /// Mark folders as devices, resolving overlaps with existing ones
    AddDevice {
        #[arg(required = true)]
        paths: Vec<String>,
        /// Apply without asking when the change removes devices
        #[arg(short, long)]
        yes: bool,
    },
    /// Stop treating folders as devices
    RemoveDevice {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Set a device's display name; omit the name to clear it
    RenameDevice { path: String, name: Option<String> },
    /// Combine device folders under one name
    Merge {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
        #[arg(short, long)]
        name: String,
    },
    /// Dissolve a merged device by id
    Unmerge { id: String },
    /// Rename a merged device by id
    RenameMerge { id: String, name: String },
    /// Hide folders from the tree and the export
    Hide {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Unhide folders
    Unhide {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Write the source rows with a device_name column
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Print configuration values
    PrintConfig,
}
