use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Events sent from the file watcher to the app loop.
#[derive(Debug)]
pub enum FileEvent {
    /// The board file changed on disk.
    BoardChanged(PathBuf),
}

/// Watches the `boards/` directory for changes made by other processes.
pub struct BoardWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<FileEvent>,
}

impl BoardWatcher {
    /// Start watching `boards_dir`. Call `poll()` each tick.
    pub fn start(boards_dir: &Path) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                let event = match result {
                    Ok(e) => e,
                    Err(e) => {
                        tracing::warn!(error = %e, "file watcher error");
                        return;
                    }
                };

                match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {}
                    _ => return,
                }

                // Temp files from atomic saves are renamed onto board.json,
                // so only the final name matters.
                if let Some(path) = event.paths.into_iter().find(|p| is_board_file(p)) {
                    let _ = tx.send(FileEvent::BoardChanged(path));
                }
            },
            Config::default(),
        )?;

        watcher.watch(boards_dir, RecursiveMode::NonRecursive)?;
        Ok(BoardWatcher {
            _watcher: watcher,
            rx,
        })
    }

    /// Non-blocking poll. Bursts of events collapse into one.
    pub fn poll(&self) -> Option<FileEvent> {
        let mut last = None;
        while let Ok(evt) = self.rx.try_recv() {
            last = Some(evt);
        }
        last
    }
}

fn is_board_file(path: &Path) -> bool {
    matches!(
        path.file_name().and_then(|n| n.to_str()),
        Some("board.json") | Some("load.json")
    )
}
