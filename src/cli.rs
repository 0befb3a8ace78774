use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the draftkeeper binary
#[derive(Parser, Debug)]
#[command(name = "draftkeeper")]
#[command(about = "Edit files with crash-safe drafts and external change detection", long_about = None)]
pub struct Args {
    /// Path to the redb draft database
    #[arg(short, long, value_name = "FILE", default_value = "draftkeeper.redb", env = "DRAFTKEEPER_DATABASE")]
    pub database: PathBuf,

    /// Path to the JSON settings file
    #[arg(short, long, value_name = "FILE", default_value = "draftkeeper.json", env = "DRAFTKEEPER_SETTINGS")]
    pub settings: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect or discard stored drafts
    Drafts {
        #[command(subcommand)]
        action: DraftsCommand,
    },
    /// Inspect settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Edit a file interactively from stdin
    ///
    /// Each input line is appended to the buffer. Commands: `:w` save,
    /// `:q` close, `:q!` close discarding the draft, `:reload` / `:keep`
    /// answer an external change, `:draft` / `:file` answer a recovery prompt.
    Edit {
        /// File to open; `untitled://NAME` opens a scratch document
        file: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum DraftsCommand {
    /// List every stored draft
    List,
    /// Print the draft stored for a path
    Show { path: String },
    /// Delete the draft stored for a path
    Discard { path: String },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// Print the effective settings as JSON
    Show,
    /// Delete the settings file, restoring defaults
    Reset,
}
