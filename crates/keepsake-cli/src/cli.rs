use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use keepsake_core::config::BackendKind;

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(about = "Share photos, leave notes and open a letter from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// CLI profile name selecting the backend configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, check or end the session for a profile
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
    /// Browse and manage the photo gallery
    Gallery {
        #[command(subcommand)]
        command: GalleryCommands,
    },
    /// Browse and manage the notes board
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Open the special letter
    Proposal {
        /// Skip typing animations and timed pauses
        #[arg(long)]
        instant: bool,
    },
    /// Show which page a path resolves to for the current session
    Route {
        /// Path or hash fragment, e.g. `/gallery` or `#/notes`
        path: String,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BackendArg {
    Local,
    Remote,
}

impl From<BackendArg> for BackendKind {
    fn from(value: BackendArg) -> Self {
        match value {
            BackendArg::Local => Self::Local,
            BackendArg::Remote => Self::Remote,
        }
    }
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in and keep the session in the system keychain
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Show who is signed in
    Status,
    /// Sign out and clear the stored session
    Logout,
}

#[derive(Subcommand)]
pub enum GalleryCommands {
    /// List photos, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upload an image
    Add {
        /// Image file to upload
        file: PathBuf,
        /// Caption shown under the photo
        #[arg(long)]
        caption: Option<String>,
    },
    /// Delete a photo and its comments
    Delete {
        /// Photo ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Manage comments on a photo
    Comment {
        #[command(subcommand)]
        command: CommentCommands,
    },
}

#[derive(Subcommand)]
pub enum CommentCommands {
    /// Comment on a photo
    Add {
        /// Photo ID or unique ID prefix
        photo: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        text: String,
    },
    /// Change a comment's text
    Edit {
        /// Photo ID or unique ID prefix
        photo: String,
        /// Comment ID or unique ID prefix
        comment: String,
        #[arg(long)]
        text: String,
    },
    /// Remove a comment
    Delete {
        /// Photo ID or unique ID prefix
        photo: String,
        /// Comment ID or unique ID prefix
        comment: String,
    },
}

#[derive(Subcommand)]
pub enum NotesCommands {
    /// List notes, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Leave a note
    Add {
        #[arg(long)]
        author: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// Rewrite a note; omitted fields keep their current value
    Edit {
        /// Note ID or unique ID prefix
        id: String,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        message: Option<String>,
        /// New title; pass an empty string to remove it
        #[arg(long)]
        title: Option<String>,
    },
    /// Delete a note
    Delete {
        /// Note ID or unique ID prefix
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Backend the profile talks to
        #[arg(long, value_enum)]
        backend: BackendArg,
        /// Directory for local data (snapshot, blobs, replica)
        #[arg(long, value_name = "PATH")]
        data_dir: Option<PathBuf>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved profile
    Show,
}
