use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "yata", about = concat!("yata v", env!("CARGO_PKG_VERSION"), " - a kanban board in a folder"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data directory (default: $YATA_DATA_DIR, then the platform data dir)
    #[arg(short = 'D', long = "data-dir", global = true)]
    pub data_dir: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory, config file and an empty board
    Init,
    /// Show the board, or one list
    Show(ShowArgs),
    /// List every tag used on the board
    Tags,
    /// Show the board, then again whenever another process changes it
    Watch(WatchArgs),
    /// List management
    List(ListCmd),
    /// Add a task to a list (bottom)
    Add(AddArgs),
    /// Move a task to a list, optionally before another task
    Mv(MvArgs),
    /// Move a task to the top of Completed
    Done(DoneArgs),
    /// Change task fields
    Edit(EditArgs),
    /// Delete a task
    Rm(RmArgs),
    /// Revert the last saved change (run again to redo it)
    Undo,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ShowArgs {
    /// List id, id prefix or name (default: whole board)
    pub list: Option<String>,
    /// Include task ids in full
    #[arg(long)]
    pub ids: bool,
}

// ---------------------------------------------------------------------------
// List management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ListCmd {
    #[command(subcommand)]
    pub action: ListAction,
}

#[derive(Subcommand)]
pub enum ListAction {
    /// Add a list (placed before Completed)
    Add {
        /// List name
        name: String,
    },
    /// Delete a list and its tasks
    Rm {
        /// List id, id prefix or name
        list: String,
    },
    /// Rename a list
    Rename {
        /// List id, id prefix or name
        list: String,
        /// New name
        name: String,
    },
    /// Move a list to where another list is
    Mv {
        /// List to move
        list: String,
        /// List whose place it takes
        onto: String,
    },
}

// ---------------------------------------------------------------------------
// Task args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Target list (id, id prefix or name)
    pub list: String,
    /// Task title
    pub title: String,
    /// Insert at the top of the list
    #[arg(long)]
    pub top: bool,
    /// Priority: low, medium, high
    #[arg(long)]
    pub priority: Option<String>,
    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Due date (YYYY-MM-DD)
    #[arg(long)]
    pub due: Option<String>,
    /// Time estimate in minutes
    #[arg(long = "estimate-min")]
    pub estimate_min: Option<u64>,
    /// Create as a draft
    #[arg(long)]
    pub draft: bool,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task id, id prefix or title
    pub task: String,
    /// Target list
    pub list: String,
    /// Insert before this task (default: end of list)
    #[arg(long)]
    pub before: Option<String>,
}

#[derive(Args)]
pub struct WatchArgs {
    /// Include task ids in full
    #[arg(long)]
    pub ids: bool,
}

#[derive(Args)]
pub struct DoneArgs {
    /// Task id, id prefix or title
    pub task: String,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task id, id prefix or title
    pub task: String,
    /// New title
    #[arg(long)]
    pub title: Option<String>,
    /// Priority: low, medium, high, or "none" to clear
    #[arg(long)]
    pub priority: Option<String>,
    /// Due date (YYYY-MM-DD), or "none" to clear
    #[arg(long)]
    pub due: Option<String>,
    /// Short description, or "" to clear
    #[arg(long)]
    pub description: Option<String>,
    /// Replace tags (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
    /// Remove all tags
    #[arg(long, conflicts_with = "tags")]
    pub clear_tags: bool,
    /// Time estimate in minutes
    #[arg(long = "estimate-min")]
    pub estimate_min: Option<u64>,
    /// Replace the rich-text body
    #[arg(long)]
    pub content: Option<String>,
}

#[derive(Args)]
pub struct RmArgs {
    /// Task id, id prefix or title
    pub task: String,
}
