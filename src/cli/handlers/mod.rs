mod init;
pub use init::cmd_init;

use std::env;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};

use crate::app::BoardApp;
use crate::dnd::Replacement;
use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::board_io::BoardFiles;
use crate::io::config_io;
use crate::model::board::Board;
use crate::model::task::{Priority, Tag, Task, TaskPatch};
use crate::store::InsertPosition;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

const WATCH_POLL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    tracing::debug!(data_dir = %data_dir.display(), "using data directory");

    match cli.command {
        Commands::Init => cmd_init(&data_dir, json),

        // Read commands
        Commands::Show(args) => cmd_show(&data_dir, args, json),
        Commands::Tags => cmd_tags(&data_dir, json),
        Commands::Watch(args) => cmd_watch(&data_dir, args, json),

        // Write commands
        Commands::List(cmd) => cmd_list(&data_dir, cmd, json),
        Commands::Add(args) => cmd_add(&data_dir, args, json),
        Commands::Mv(args) => cmd_mv(&data_dir, args),
        Commands::Done(args) => cmd_done(&data_dir, args),
        Commands::Edit(args) => cmd_edit(&data_dir, args),
        Commands::Rm(args) => cmd_rm(&data_dir, args),
        Commands::Undo => cmd_undo(&data_dir),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `--data-dir`, then `$YATA_DATA_DIR`, then the platform data dir, then `.`
pub fn resolve_data_dir(flag: Option<&str>) -> PathBuf {
    if let Some(dir) = flag {
        return PathBuf::from(dir);
    }
    if let Ok(dir) = env::var("YATA_DATA_DIR")
        && !dir.is_empty()
    {
        return PathBuf::from(dir);
    }
    match dirs::data_dir() {
        Some(dir) => dir.join("yata"),
        None => PathBuf::from("."),
    }
}

/// Open the board in `data_dir`, which must have been initialized
fn open_app(data_dir: &Path) -> Result<BoardApp<BoardFiles>, Box<dyn std::error::Error>> {
    let files = BoardFiles::new(data_dir);
    if !files.has_board() {
        return Err(format!(
            "no board in {}: run `yata init` first",
            data_dir.display()
        )
        .into());
    }
    let config = config_io::read_config(data_dir)?;
    Ok(BoardApp::open(files, config)?)
}

/// Save anything the command changed
fn finish(mut app: BoardApp<BoardFiles>) -> CmdResult {
    app.flush()?;
    Ok(())
}

/// Pick one `(id, name)` candidate by exact id, then case-insensitive name,
/// then unique id prefix.
fn resolve_key(kind: &str, key: &str, candidates: &[(&str, &str)]) -> Result<String, String> {
    if let Some((id, _)) = candidates.iter().find(|(id, _)| *id == key) {
        return Ok(id.to_string());
    }
    let by_name: Vec<&(&str, &str)> = candidates
        .iter()
        .filter(|(_, name)| name.eq_ignore_ascii_case(key))
        .collect();
    let matches = if by_name.is_empty() {
        candidates
            .iter()
            .filter(|(id, _)| !key.is_empty() && id.starts_with(key))
            .collect()
    } else {
        by_name
    };
    match matches.as_slice() {
        [(id, _)] => Ok(id.to_string()),
        [] => Err(format!("{} not found: {}", kind, key)),
        many => Err(format!(
            "ambiguous {} '{}': matches {}",
            kind,
            key,
            many.iter()
                .map(|(id, name)| format!("{} ({})", name, short_id(id)))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}

fn resolve_list(board: &Board, key: &str) -> Result<String, String> {
    let candidates: Vec<(&str, &str)> = board
        .lists
        .iter()
        .map(|l| (l.id.as_str(), l.header.as_str()))
        .collect();
    resolve_key("list", key, &candidates)
}

fn resolve_task(board: &Board, key: &str) -> Result<String, String> {
    let candidates: Vec<(&str, &str)> = board
        .lists
        .iter()
        .flat_map(|l| l.tasks.iter())
        .map(|t| (t.id.as_str(), t.header.as_str()))
        .collect();
    resolve_key("task", key, &candidates)
}

fn parse_due(s: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date '{}': use YYYY-MM-DD", s))
}

/// `"none"` clears, anything else must parse
fn parse_clearable<T>(
    s: &str,
    parse: impl Fn(&str) -> Result<T, String>,
) -> Result<Option<T>, String> {
    if s.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse(s).map(Some)
    }
}

fn tags_from(labels: &[String]) -> Vec<Tag> {
    labels
        .iter()
        .map(|l| l.trim().trim_start_matches('#'))
        .filter(|l| !l.is_empty())
        .map(Tag::new)
        .collect()
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_show(data_dir: &Path, args: ShowArgs, json: bool) -> CmdResult {
    let app = open_app(data_dir)?;
    let board = app.board();

    match args.list {
        Some(key) => {
            let id = resolve_list(board, &key)?;
            let list = board
                .list(&id)
                .ok_or_else(|| format!("list not found: {}", key))?;
            if json {
                println!("{}", serde_json::to_string_pretty(list)?);
            } else {
                for line in format_list(list, args.ids) {
                    println!("{}", line);
                }
            }
        }
        None => print_board(board, args.ids, json)?,
    }
    Ok(())
}

fn print_board(board: &Board, full_ids: bool, json: bool) -> CmdResult {
    if json {
        println!("{}", serde_json::to_string_pretty(board)?);
    } else {
        for line in format_board(board, full_ids) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Runs until interrupted
fn cmd_watch(data_dir: &Path, args: WatchArgs, json: bool) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let boards_dir = app.persistence().boards_dir();
    if !app.watch(&boards_dir) {
        return Err("cannot watch the board: disabled in yata.toml or unsupported here".into());
    }
    print_board(app.board(), args.ids, json)?;
    loop {
        if app.tick(Instant::now()) == Some(Replacement::Applied) {
            if !json {
                println!();
            }
            print_board(app.board(), args.ids, json)?;
        }
        thread::sleep(WATCH_POLL);
    }
}

fn cmd_tags(data_dir: &Path, json: bool) -> CmdResult {
    let app = open_app(data_dir)?;
    let tags = app.board().existing_tags();
    if json {
        let list: Vec<&Tag> = tags.values().collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        for line in format_tags(&tags) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn cmd_list(data_dir: &Path, cmd: ListCmd, json: bool) -> CmdResult {
    let mut app = open_app(data_dir)?;

    match cmd.action {
        ListAction::Add { name } => {
            let id = app.add_list(&name)?;
            if json {
                println!("{}", serde_json::json!({ "id": id }));
            } else {
                println!("{}", id);
            }
        }
        ListAction::Rm { list } => {
            let id = resolve_list(app.board(), &list)?;
            let removed = app.delete_list(&id)?;
            if !json {
                println!(
                    "deleted list {} ({} tasks)",
                    removed.header,
                    removed.tasks.len()
                );
            }
        }
        ListAction::Rename { list, name } => {
            let id = resolve_list(app.board(), &list)?;
            app.rename_list(&id, &name)?;
        }
        ListAction::Mv { list, onto } => {
            let id = resolve_list(app.board(), &list)?;
            let onto = resolve_list(app.board(), &onto)?;
            if !app.move_list(&id, &onto)? && !json {
                println!("nothing to move");
            }
        }
    }
    finish(app)
}

fn cmd_add(data_dir: &Path, args: AddArgs, json: bool) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let list_id = resolve_list(app.board(), &args.list)?;

    let title = args.title.trim();
    if title.is_empty() {
        return Err("task title cannot be empty".into());
    }
    let mut task = Task::new(title);
    task.is_draft = args.draft;
    task.priority = args
        .priority
        .as_deref()
        .map(str::parse::<Priority>)
        .transpose()?;
    task.tags = tags_from(&args.tags);
    task.due_date = args.due.as_deref().map(parse_due).transpose()?;
    task.estimated_seconds = args.estimate_min.map(|m| m * 60);

    let position = if args.top {
        InsertPosition::Top
    } else {
        InsertPosition::Bottom
    };
    let id = app.add_task(&list_id, task, position)?;
    finish(app)?;

    if json {
        println!("{}", serde_json::json!({ "id": id, "list": list_id }));
    } else {
        println!("{}", id);
    }
    Ok(())
}

fn cmd_mv(data_dir: &Path, args: MvArgs) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let task_id = resolve_task(app.board(), &args.task)?;
    let list_id = resolve_list(app.board(), &args.list)?;
    let before = args
        .before
        .as_deref()
        .map(|key| resolve_task(app.board(), key))
        .transpose()?;

    app.move_task(&task_id, &list_id, before.as_deref())?;
    finish(app)
}

fn cmd_done(data_dir: &Path, args: DoneArgs) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let task_id = resolve_task(app.board(), &args.task)?;
    if !app.complete_task(&task_id)? {
        println!("already completed");
    }
    finish(app)
}

fn cmd_edit(data_dir: &Path, args: EditArgs) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let task_id = resolve_task(app.board(), &args.task)?;

    let tags = if args.clear_tags {
        Some(Vec::new())
    } else if args.tags.is_empty() {
        None
    } else {
        Some(tags_from(&args.tags))
    };
    let patch = TaskPatch {
        header: args.title,
        priority: args
            .priority
            .as_deref()
            .map(|s| parse_clearable(s, |p| p.parse::<Priority>()))
            .transpose()?,
        due_date: args
            .due
            .as_deref()
            .map(|s| parse_clearable(s, parse_due))
            .transpose()?,
        description: args
            .description
            .map(|d| if d.is_empty() { None } else { Some(d) }),
        tags,
        estimated_seconds: args.estimate_min.map(|m| Some(m * 60)),
        content: args.content.map(Some),
        ..Default::default()
    };
    if patch.is_empty() {
        return Err("nothing to change: pass at least one field".into());
    }
    if let Some(header) = &patch.header
        && header.trim().is_empty()
    {
        return Err("task title cannot be empty".into());
    }

    app.update_task(&task_id, patch)?;
    finish(app)
}

fn cmd_rm(data_dir: &Path, args: RmArgs) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let task_id = resolve_task(app.board(), &args.task)?;
    let removed = app.delete_task(&task_id)?;
    println!("deleted {}", removed.header);
    finish(app)
}

fn cmd_undo(data_dir: &Path) -> CmdResult {
    let mut app = open_app(data_dir)?;
    let previous = app
        .persistence()
        .load_previous()?
        .ok_or("nothing to undo")?;
    if !app.restore(previous)? {
        println!("nothing to undo");
    }
    finish(app)
}
