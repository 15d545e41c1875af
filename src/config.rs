use std::path::{Path, PathBuf};

pub const DATA_FILE_NAME: &str = "notes.json";
pub const LOG_FILE_NAME: &str = "sticky-notes.log";
pub const DEFAULT_NEW_NOTE_SHORTCUT: &str = "CommandOrControl+N";
pub const DEFAULT_CLOSE_SHORTCUT: &str = "CommandOrControl+W";

const DATA_FILE_ENV: &str = "STICKY_NOTES_DATA_FILE";
const NEW_NOTE_SHORTCUT_ENV: &str = "STICKY_NOTES_NEW_NOTE_SHORTCUT";
const CLOSE_SHORTCUT_ENV: &str = "STICKY_NOTES_CLOSE_SHORTCUT";

/// Process-level configuration resolved once at startup. User-facing display
/// settings live in the notes document instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_file: PathBuf,
    pub log_dir: PathBuf,
    pub new_note_shortcut: String,
    pub close_shortcut: String,
}

impl AppConfig {
    pub fn from_app_data_dir(app_data_dir: &Path) -> Self {
        Self::from_lookup(app_data_dir, |key| std::env::var(key).ok())
    }

    pub fn from_lookup(app_data_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            data_file: non_empty(DATA_FILE_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| app_data_dir.join(DATA_FILE_NAME)),
            log_dir: app_data_dir.join("logs"),
            new_note_shortcut: non_empty(NEW_NOTE_SHORTCUT_ENV)
                .unwrap_or_else(|| DEFAULT_NEW_NOTE_SHORTCUT.to_string()),
            close_shortcut: non_empty(CLOSE_SHORTCUT_ENV).unwrap_or_else(|| DEFAULT_CLOSE_SHORTCUT.to_string()),
        }
    }
}
