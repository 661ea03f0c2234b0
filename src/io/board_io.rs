use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::model::board::{Board, BoardError};
use crate::model::list::TaskList;
use crate::model::task::Task;

const BOARD_FILE: &str = "board.json";
const LEGACY_BOARD_FILE: &str = "load.json";
const PREVIOUS_BOARD_FILE: &str = "board.prev.json";
const CONTENT_FILE: &str = "content.md";
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "avif", "bmp"];

/// Error type for board persistence
#[derive(Debug, thiserror::Error)]
pub enum BoardIoError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid board in {path}: {source}")]
    InvalidBoard { path: PathBuf, source: BoardError },
    #[error("could not serialize board: {0}")]
    SerializeError(#[from] serde_json::Error),
    #[error("bad file name pattern: {0}")]
    PatternError(#[from] regex::Error),
}

/// Where boards come from and go to.
///
/// `load` returns `Ok(None)` when there is no board yet, so the caller can
/// seed a fresh one.
pub trait BoardPersistence {
    fn load(&self) -> Result<Option<Board>, BoardIoError>;
    fn save(&mut self, board: &Board) -> Result<(), BoardIoError>;

    /// Drop anything stored alongside a deleted task
    fn discard_task(&mut self, _task_id: &str) -> Result<(), BoardIoError> {
        Ok(())
    }
}

/// On-disk layout under a data directory:
///
/// ```text
/// boards/board.json              the board (boards/load.json is read if absent)
/// boards/board.prev.json         the board as it was before the last save
/// boards/contents/<id>/content.md
/// boards/contents/<id>/assets/
/// ```
#[derive(Debug, Clone)]
pub struct BoardFiles {
    root: PathBuf,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredTask<'a> {
    #[serde(flatten)]
    task: &'a Task,
    content_path: String,
    assets_dir: String,
    /// Only written into board.prev.json, which must not depend on the
    /// content files the next save overwrites.
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

#[derive(Serialize)]
struct StoredList<'a> {
    id: &'a str,
    header: &'a str,
    tasks: Vec<StoredTask<'a>>,
}

#[derive(Deserialize)]
struct InlineList {
    #[serde(default)]
    tasks: Vec<InlineTask>,
}

#[derive(Deserialize)]
struct InlineTask {
    id: String,
    #[serde(default)]
    content: Option<String>,
}

/// Where task content comes from when a board file is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Content {
    Files,
    Inline,
}

impl BoardFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BoardFiles { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn boards_dir(&self) -> PathBuf {
        self.root.join("boards")
    }

    pub fn board_path(&self) -> PathBuf {
        self.boards_dir().join(BOARD_FILE)
    }

    pub fn previous_board_path(&self) -> PathBuf {
        self.boards_dir().join(PREVIOUS_BOARD_FILE)
    }

    pub fn task_dir(&self, task_id: &str) -> PathBuf {
        self.boards_dir().join("contents").join(task_id)
    }

    pub fn content_path(&self, task_id: &str) -> PathBuf {
        self.task_dir(task_id).join(CONTENT_FILE)
    }

    pub fn assets_dir(&self, task_id: &str) -> PathBuf {
        self.task_dir(task_id).join("assets")
    }

    pub fn has_board(&self) -> bool {
        let boards = self.boards_dir();
        boards.join(BOARD_FILE).exists() || boards.join(LEGACY_BOARD_FILE).exists()
    }

    /// The board written before the most recent save, if any
    pub fn load_previous(&self) -> Result<Option<Board>, BoardIoError> {
        let path = self.previous_board_path();
        if !path.exists() {
            return Ok(None);
        }
        self.read_board(&path, Content::Inline).map(Some)
    }

    fn read_board(&self, path: &Path, content: Content) -> Result<Board, BoardIoError> {
        let text = fs::read_to_string(path).map_err(|e| BoardIoError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut board: Board =
            serde_json::from_str(&text).map_err(|e| BoardIoError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        if board.normalize() {
            tracing::warn!(path = %path.display(), "moved Completed list to the end");
        }
        board
            .validate()
            .map_err(|e| BoardIoError::InvalidBoard {
                path: path.to_path_buf(),
                source: e,
            })?;

        match content {
            Content::Files => {
                for task in board.lists.iter_mut().flat_map(|l| l.tasks.iter_mut()) {
                    task.content = self.read_task_content(&task.id)?;
                }
            }
            Content::Inline => {
                let lists: Vec<InlineList> =
                    serde_json::from_str(&text).map_err(|e| BoardIoError::ParseError {
                        path: path.to_path_buf(),
                        source: e,
                    })?;
                let mut inline: HashMap<String, String> = lists
                    .into_iter()
                    .flat_map(|l| l.tasks)
                    .filter_map(|t| Some((t.id, t.content?)))
                    .collect();
                for task in board.lists.iter_mut().flat_map(|l| l.tasks.iter_mut()) {
                    task.content = inline.remove(&task.id);
                }
            }
        }
        Ok(board)
    }

    pub fn read_task_content(&self, task_id: &str) -> Result<Option<String>, BoardIoError> {
        let path = self.content_path(task_id);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| BoardIoError::ReadError { path, source: e })
    }

    pub fn write_task_content(&self, task_id: &str, content: &str) -> Result<(), BoardIoError> {
        let path = self.content_path(task_id);
        atomic_write(&path, content.as_bytes())
            .map_err(|e| BoardIoError::WriteError { path, source: e })
    }

    /// Remove a task's content file, keeping its assets. Missing files are fine.
    pub fn clear_task_content(&self, task_id: &str) -> Result<(), BoardIoError> {
        let path = self.content_path(task_id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BoardIoError::WriteError { path, source: e }),
        }
    }

    /// Remove a task's content directory. Missing directories are fine.
    pub fn delete_task_content(&self, task_id: &str) -> Result<(), BoardIoError> {
        let dir = self.task_dir(task_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BoardIoError::WriteError {
                path: dir,
                source: e,
            }),
        }
    }

    /// Store an attachment for a task and return where it landed.
    ///
    /// Names are reduced to `[A-Za-z0-9._-]`. Images are renamed
    /// `image-<n>.<ext>`, numbered one past the highest existing image.
    pub fn write_task_asset(
        &self,
        task_id: &str,
        filename: &str,
        bytes: &[u8],
        mime: Option<&str>,
    ) -> Result<PathBuf, BoardIoError> {
        let dir = self.assets_dir(task_id);
        let unsafe_chars = Regex::new(r"[^a-zA-Z0-9._-]")?;
        let sanitized = unsafe_chars.replace_all(filename.trim(), "_").into_owned();

        let ext = Path::new(&sanitized)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        let is_image = mime.is_some_and(|m| m.starts_with("image/"))
            || ext.as_deref().is_some_and(|e| IMAGE_EXTENSIONS.contains(&e));

        let name = if is_image {
            let next = self.highest_image_index(&dir)? + 1;
            format!("image-{}.{}", next, ext.as_deref().unwrap_or("png"))
        } else if sanitized.is_empty() {
            "asset".to_string()
        } else {
            sanitized
        };

        let path = dir.join(name);
        atomic_write(&path, bytes).map_err(|e| BoardIoError::WriteError {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    fn highest_image_index(&self, dir: &Path) -> Result<u32, BoardIoError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(BoardIoError::ReadError {
                    path: dir.to_path_buf(),
                    source: e,
                });
            }
        };
        let numbered = Regex::new(r"^image-(\d+)\.")?;
        let highest = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                numbered.captures(&name)?.get(1)?.as_str().parse::<u32>().ok()
            })
            .max()
            .unwrap_or(0);
        Ok(highest)
    }

    /// Snapshot the board on disk, content included, before it is replaced.
    /// An unreadable board is logged and not kept.
    fn keep_previous(&self, path: &Path) -> Result<(), BoardIoError> {
        let current = match self.read_board(path, Content::Files) {
            Ok(board) => board,
            Err(e) => {
                tracing::warn!(error = %e, "not keeping previous board");
                return Ok(());
            }
        };
        let json = serde_json::to_string_pretty(&self.stored_lists(&current.lists, Content::Inline))?;
        let previous = self.previous_board_path();
        atomic_write(&previous, json.as_bytes()).map_err(|e| BoardIoError::WriteError {
            path: previous.clone(),
            source: e,
        })
    }

    fn stored_lists<'a>(&self, lists: &'a [TaskList], content: Content) -> Vec<StoredList<'a>> {
        lists
            .iter()
            .map(|list| StoredList {
                id: &list.id,
                header: &list.header,
                tasks: list
                    .tasks
                    .iter()
                    .map(|task| StoredTask {
                        task,
                        content_path: self.content_path(&task.id).display().to_string(),
                        assets_dir: self.assets_dir(&task.id).display().to_string(),
                        content: match content {
                            Content::Inline => task.content.as_deref(),
                            Content::Files => None,
                        },
                    })
                    .collect(),
            })
            .collect()
    }
}

impl BoardPersistence for BoardFiles {
    fn load(&self) -> Result<Option<Board>, BoardIoError> {
        let boards = self.boards_dir();
        for name in [BOARD_FILE, LEGACY_BOARD_FILE] {
            let path = boards.join(name);
            if path.exists() {
                return self.read_board(&path, Content::Files).map(Some);
            }
        }
        Ok(None)
    }

    fn save(&mut self, board: &Board) -> Result<(), BoardIoError> {
        let json = serde_json::to_string_pretty(&self.stored_lists(&board.lists, Content::Files))?;
        let path = self.board_path();
        if path.exists() {
            self.keep_previous(&path)?;
        }
        atomic_write(&path, json.as_bytes()).map_err(|e| BoardIoError::WriteError {
            path: path.clone(),
            source: e,
        })?;

        for task in board.lists.iter().flat_map(|l| l.tasks.iter()) {
            match &task.content {
                Some(content) => self.write_task_content(&task.id, content)?,
                None => self.clear_task_content(&task.id)?,
            }
        }
        tracing::debug!(path = %path.display(), tasks = board.task_count(), "saved board");
        Ok(())
    }

    fn discard_task(&mut self, task_id: &str) -> Result<(), BoardIoError> {
        self.delete_task_content(task_id)
    }
}

/// Write `content` to `path` atomically using a temp file + rename,
/// creating parent directories as needed.
fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
