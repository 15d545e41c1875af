use crate::errors::{AppError, AppResult};
use crate::models::Document;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Owns the single JSON file backing every note and the settings row.
#[derive(Debug, Clone)]
pub struct NoteStore {
    path: PathBuf,
    /// Set while the file on disk could not be read and is still in place.
    /// The next save must move it aside before replacing it.
    preserve_existing: Arc<AtomicBool>,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            preserve_existing: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole document. A missing or empty file yields
    /// `Document::default()`, written back immediately. A corrupt file is moved
    /// aside first; if that fails, or the file could not be read at all, the
    /// defaults stay in memory and the file is left untouched.
    pub async fn load(&self) -> Document {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                tracing::info!(path = %self.path.display(), "notes file is empty, writing defaults");
            }
            Ok(bytes) => match serde_json::from_slice::<Document>(&bytes) {
                Ok(document) => {
                    tracing::info!(notes = document.notes.len(), "loaded notes document");
                    return document;
                }
                Err(error) => {
                    tracing::warn!(error = %error, path = %self.path.display(), "notes file is corrupt");
                    if let Err(error) = self.quarantine().await {
                        tracing::warn!(error = %error, "failed to move corrupt notes file aside, leaving it in place");
                        self.preserve_existing.store(true, Ordering::SeqCst);
                        return Document::default();
                    }
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "notes file missing, writing defaults");
            }
            Err(error) => {
                tracing::warn!(error = %error, path = %self.path.display(), "notes file unreadable, leaving it in place");
                self.preserve_existing.store(true, Ordering::SeqCst);
                return Document::default();
            }
        }

        let document = Document::default();
        if let Err(error) = self.save(&document).await {
            tracing::warn!(error = %error, "failed to write default notes document");
        }
        document
    }

    /// Rewrites the whole file: temp file, fsync, then rename over the target.
    pub async fn save(&self, document: &Document) -> AppResult<()> {
        if self.preserve_existing.load(Ordering::SeqCst) {
            self.quarantine().await.map_err(|error| {
                AppError::Io(format!("refusing to replace unreadable notes file: {}", error))
            })?;
            self.preserve_existing.store(false, Ordering::SeqCst);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let temp_path = self.sibling_path(".tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    pub fn quarantine_path(&self) -> PathBuf {
        self.sibling_path(".corrupt")
    }

    async fn quarantine(&self) -> std::io::Result<()> {
        let target = self.quarantine_path();
        match fs::rename(&self.path, &target).await {
            Ok(()) => {
                tracing::warn!(path = %target.display(), "moved unreadable notes file aside");
                Ok(())
            }
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let mut name: OsString = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| OsString::from("notes.json"));
        name.push(suffix);
        self.path.with_file_name(name)
    }
}
