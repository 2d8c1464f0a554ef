//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical outlines of titled entries, one JSON file per tree
#[derive(Parser, Debug)]
#[command(name = "outliner")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Storage directory (default: from config)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub storage_dir: Option<PathBuf>,

    /// Config file layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Skip malformed entry files instead of aborting the load
    #[arg(long, global = true)]
    pub skip_malformed: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every stored tree
    List,

    /// Print one stored tree
    Show {
        /// Title of the root entry
        title: String,
        /// Draw branch guides instead of plain indentation
        #[arg(long)]
        fancy: bool,
    },

    /// Create a new empty tree
    Add {
        /// Title of the new root entry
        title: String,
    },

    /// Add a child entry to a stored tree
    Attach {
        /// Title of the root entry
        root: String,
        /// Title of the new child
        child: String,
        /// Attach below the first entry with this title (default: the root)
        #[arg(short, long)]
        under: Option<String>,
    },

    /// Copy a tree from any JSON file into storage
    Import {
        /// Entry file to import
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Show resolved settings
    Info,

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
