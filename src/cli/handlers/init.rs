use std::fs;
use std::path::Path;

use crate::app::BoardApp;
use crate::io::board_io::BoardFiles;
use crate::io::config_io::{self, CONFIG_FILE};

/// Create the data directory, a default `yata.toml` and a seeded board.
/// Existing files are kept.
pub fn cmd_init(data_dir: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(data_dir)
        .map_err(|e| format!("cannot create {}: {}", data_dir.display(), e))?;

    let wrote_config = config_io::write_default_config(data_dir, &Default::default())?;
    let files = BoardFiles::new(data_dir);
    let existed = files.has_board();
    let config = config_io::read_config(data_dir)?;
    let app = BoardApp::open(files, config)?;

    if json {
        let out = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "board": app.persistence().board_path().display().to_string(),
            "created": !existed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if wrote_config {
        println!("wrote {}", data_dir.join(CONFIG_FILE).display());
    }
    if existed {
        println!("board already exists at {}", app.persistence().board_path().display());
    } else {
        println!("created board at {}", app.persistence().board_path().display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::board_io::BoardPersistence;
    use tempfile::TempDir;

    #[test]
    fn init_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("nested").join("yata");
        cmd_init(&data, true).unwrap();
        let files = BoardFiles::new(&data);
        let first = files.load().unwrap().unwrap();

        cmd_init(&data, true).unwrap();
        assert_eq!(files.load().unwrap().unwrap(), first);
        assert!(data.join(CONFIG_FILE).exists());
    }
}
