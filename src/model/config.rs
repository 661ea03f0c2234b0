use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration from yata.toml. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    #[serde(default)]
    pub board: BoardSection,
    #[serde(default)]
    pub autosave: AutosaveConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSection {
    /// Name of the working list seeded into a fresh board
    #[serde(default = "default_list_name")]
    pub default_list: String,
    /// Header given to the Completed list when it has to be created
    #[serde(default = "default_completed_header")]
    pub completed_header: String,
}

impl Default for BoardSection {
    fn default() -> Self {
        BoardSection {
            default_list: default_list_name(),
            completed_header: default_completed_header(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutosaveConfig {
    /// Coalescing window for board saves, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl AutosaveConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        AutosaveConfig {
            debounce_ms: default_debounce_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            limit: default_history_limit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig { enabled: true }
    }
}

fn default_list_name() -> String {
    "Todo".to_string()
}

fn default_completed_header() -> String {
    "Completed".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_history_limit() -> usize {
    100
}

fn default_true() -> bool {
    true
}
