use crate::errors::{AppError, AppResult};
use crate::models::{
    palette_color_for, Document, Note, NotePatch, NoteSettings, PositionPatch, SettingsPatch, DEFAULT_NOTE_TITLE,
};
use crate::store::NoteStore;
use chrono::Utc;
use tokio::sync::{Mutex, OnceCell};
use uuid::Uuid;

/// In-memory owner of the notes document. Every public call passes through
/// `ensure_init`, so nothing touches the document before the first load resolves.
/// Mutations are applied to a copy, written durably, and only then published.
pub struct NoteManager {
    store: NoteStore,
    document: OnceCell<Mutex<Document>>,
}

impl NoteManager {
    pub fn new(store: NoteStore) -> Self {
        Self {
            store,
            document: OnceCell::new(),
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.document.initialized()
    }

    /// Loads the document once; concurrent callers wait on the same load.
    pub async fn ensure_init(&self) -> &Mutex<Document> {
        self.document
            .get_or_init(|| async { Mutex::new(self.store.load().await) })
            .await
    }

    /// Newest first. The order is derived on every call and never persisted.
    pub async fn list_all(&self) -> Vec<Note> {
        let document = self.ensure_init().await.lock().await;
        let mut notes = document.notes.clone();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notes
    }

    pub async fn get(&self, id: &str) -> Option<Note> {
        let document = self.ensure_init().await.lock().await;
        document.notes.iter().find(|note| note.id == id).cloned()
    }

    pub async fn create(&self, draft: NotePatch) -> AppResult<Note> {
        draft.validate()?;
        let created = self
            .mutate(|document| {
                let now = now_millis();
                let mut id = Uuid::new_v4().to_string();
                while document.notes.iter().any(|note| note.id == id) {
                    id = Uuid::new_v4().to_string();
                }

                let note = Note {
                    id,
                    title: non_empty(draft.title).unwrap_or_else(|| DEFAULT_NOTE_TITLE.to_string()),
                    content: draft.content.unwrap_or_default(),
                    color: non_empty(draft.color)
                        .unwrap_or_else(|| palette_color_for(document.notes.len()).to_string()),
                    style: draft.style.unwrap_or_default(),
                    position: draft.position.unwrap_or_default(),
                    always_on_top: draft.always_on_top.unwrap_or(false),
                    created_at: now,
                    updated_at: now,
                };
                document.notes.push(note.clone());
                Some(note)
            })
            .await?;

        created.ok_or_else(|| AppError::Internal("note creation produced no record".to_string()))
    }

    /// Shallow merge into an existing note. `Ok(None)` when the id is unknown.
    pub async fn update(&self, id: &str, patch: NotePatch) -> AppResult<Option<Note>> {
        patch.validate()?;
        self.mutate(|document| {
            let note = document.notes.iter_mut().find(|note| note.id == id)?;
            note.apply(&patch);
            note.updated_at = next_stamp(note.updated_at);
            Some(note.clone())
        })
        .await
    }

    pub async fn update_position(&self, id: &str, geometry: PositionPatch) -> AppResult<Option<Note>> {
        geometry.validate()?;
        self.mutate(|document| {
            let note = document.notes.iter_mut().find(|note| note.id == id)?;
            note.position.apply(&geometry);
            note.updated_at = next_stamp(note.updated_at);
            Some(note.clone())
        })
        .await
    }

    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let removed = self
            .mutate(|document| {
                let index = document.notes.iter().position(|note| note.id == id)?;
                Some(document.notes.remove(index))
            })
            .await?;
        Ok(removed.is_some())
    }

    pub async fn get_settings(&self) -> NoteSettings {
        let document = self.ensure_init().await.lock().await;
        document.settings.clone()
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> AppResult<NoteSettings> {
        patch.validate()?;
        let settings = self
            .mutate(|document| {
                document.settings.apply(&patch);
                Some(document.settings.clone())
            })
            .await?;
        Ok(settings.unwrap_or_default())
    }

    pub async fn note_count(&self) -> usize {
        self.ensure_init().await.lock().await.notes.len()
    }

    async fn mutate<T>(&self, change: impl FnOnce(&mut Document) -> Option<T>) -> AppResult<Option<T>> {
        let mut document = self.ensure_init().await.lock().await;
        let mut next = document.clone();
        let Some(result) = change(&mut next) else {
            return Ok(None);
        };

        self.store.save(&next).await?;
        *document = next;
        Ok(Some(result))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Wall clock, but never at or before the previous stamp.
fn next_stamp(previous: i64) -> i64 {
    now_millis().max(previous.saturating_add(1))
}
