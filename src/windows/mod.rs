pub mod animation;
pub mod menu;
pub mod tauri_host;

use crate::errors::{AppError, AppResult};
use crate::models::{
    Note, NoteColorChanged, NotePatch, NoteSettings, NoteStyle, NoteStyleChanged, SettingsPatch, WindowBounds,
    WindowSettingsPatch, NOTE_COLOR_CHANGED_EVENT, NOTE_CREATED_EVENT, NOTE_STYLE_CHANGED_EVENT,
};
use crate::notes::NoteManager;
use crate::windows::animation::shrink_to_corner;
use crate::windows::menu::{note_menu, MenuAction, NoteMenu};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::Mutex;

pub const MAIN_WINDOW_LABEL: &str = "main";
const NOTE_LABEL_PREFIX: &str = "note-";

pub fn note_window_label(note_id: &str) -> String {
    format!("{}{}", NOTE_LABEL_PREFIX, note_id)
}

pub fn note_id_from_label(label: &str) -> Option<&str> {
    label
        .strip_prefix(NOTE_LABEL_PREFIX)
        .filter(|note_id| !note_id.is_empty())
}

/// One OS-level window as the controller sees it.
pub trait NoteSurface: Send + Sync {
    fn label(&self) -> String;
    /// False once the underlying window has been destroyed, by us or out-of-band.
    fn is_alive(&self) -> bool;
    fn is_visible(&self) -> AppResult<bool>;
    fn is_minimized(&self) -> AppResult<bool>;
    fn show(&self) -> AppResult<()>;
    fn hide(&self) -> AppResult<()>;
    fn focus(&self) -> AppResult<()>;
    fn minimize(&self) -> AppResult<()>;
    fn restore(&self) -> AppResult<()>;
    fn set_skip_taskbar(&self, skip: bool) -> AppResult<()>;
    fn bounds(&self) -> AppResult<WindowBounds>;
    fn set_bounds(&self, bounds: WindowBounds) -> AppResult<()>;
    fn set_size(&self, width: u32, height: u32) -> AppResult<()>;
    fn set_opacity(&self, opacity: f64) -> AppResult<()>;
    fn set_always_on_top(&self, flag: bool) -> AppResult<()>;
    fn set_background_color(&self, color: &str) -> AppResult<()>;
    fn emit(&self, event: &str, payload: serde_json::Value) -> AppResult<()>;
    fn destroy(&self) -> AppResult<()>;
}

/// Creates and looks up windows on behalf of the controller.
pub trait WindowHost: Send + Sync {
    fn create_note_window(&self, spec: &NoteWindowSpec) -> AppResult<Arc<dyn NoteSurface>>;
    fn main_window(&self) -> Option<Arc<dyn NoteSurface>>;
    fn create_main_window(&self) -> AppResult<Arc<dyn NoteSurface>>;
    fn focused_window_label(&self) -> Option<String>;
    /// Usable area of the primary display in logical pixels.
    fn work_area(&self) -> Option<WindowBounds>;
    fn show_note_menu(&self, note_id: &str, menu: &NoteMenu) -> AppResult<()>;
    fn exit(&self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteWindowSpec {
    pub note_id: String,
    pub label: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub background_color: String,
    pub always_on_top: bool,
}

impl NoteWindowSpec {
    pub fn for_note(note: &Note) -> Self {
        // Coordinates only count as a placement when both are known.
        let (x, y) = match (note.position.x, note.position.y) {
            (Some(x), Some(y)) => (Some(x), Some(y)),
            _ => (None, None),
        };
        Self {
            note_id: note.id.clone(),
            label: note_window_label(&note.id),
            title: note.title.clone(),
            width: note.position.width,
            height: note.position.height,
            x,
            y,
            background_color: note.color.clone(),
            always_on_top: note.always_on_top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WindowState {
    Open,
    Closing,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpenOutcome {
    Created,
    Focused,
    Closing,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CloseOutcome {
    Closed,
    AlreadyClosing,
    NotTracked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ToggleOutcome {
    Hidden { count: usize },
    Shown { count: usize },
    Opened { count: usize },
    Created { note_id: String },
}

struct TrackedWindow {
    surface: Arc<dyn NoteSurface>,
    state: WindowState,
}

/// Owns the note id -> window map. An entry exists exactly while its window is
/// open or closing; removal happens on close or out-of-band destruction.
pub struct WindowController {
    notes: Arc<NoteManager>,
    host: Arc<dyn WindowHost>,
    windows: StdMutex<HashMap<String, TrackedWindow>>,
    geometry_lock: Mutex<()>,
}

impl WindowController {
    pub fn new(notes: Arc<NoteManager>, host: Arc<dyn WindowHost>) -> Self {
        Self {
            notes,
            host,
            windows: StdMutex::new(HashMap::new()),
            geometry_lock: Mutex::new(()),
        }
    }

    pub fn notes(&self) -> &Arc<NoteManager> {
        &self.notes
    }

    pub fn host(&self) -> &Arc<dyn WindowHost> {
        &self.host
    }

    pub fn window_state(&self, note_id: &str) -> WindowState {
        match self.registry() {
            Ok(windows) => windows.get(note_id).map_or(WindowState::Closed, |tracked| tracked.state),
            Err(_) => WindowState::Closed,
        }
    }

    pub fn tracked_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = match self.registry() {
            Ok(windows) => windows.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        ids.sort();
        ids
    }

    pub async fn open_note(&self, note_id: &str) -> AppResult<OpenOutcome> {
        if let Some(existing) = self.existing(note_id)? {
            return Ok(existing.settle(note_id));
        }

        let Some(note) = self.notes.get(note_id).await else {
            tracing::warn!(note_id, "cannot open window for unknown note");
            return Ok(OpenOutcome::NotFound);
        };
        let opacity = self.notes.get_settings().await.opacity;

        // Building a window waits on the event-loop thread, which also takes the
        // registry lock when windows are destroyed. Never build while holding it.
        let surface = match self.host.create_note_window(&NoteWindowSpec::for_note(&note)) {
            Ok(surface) => surface,
            Err(error) => {
                // A concurrent open may own the label by now.
                if let Some(existing) = self.existing(note_id)? {
                    return Ok(existing.settle(note_id));
                }
                return Err(error);
            }
        };
        let raced = {
            let mut windows = self.registry()?;
            match existing_entry(&mut windows, note_id) {
                Some(existing) => Some(existing),
                None => {
                    windows.insert(
                        note_id.to_string(),
                        TrackedWindow {
                            surface: surface.clone(),
                            state: WindowState::Open,
                        },
                    );
                    None
                }
            }
        };
        if let Some(existing) = raced {
            tracing::debug!(note_id, "another caller opened the window first");
            if let Err(error) = surface.destroy() {
                tracing::warn!(error = %error, note_id, "failed to destroy duplicate note window");
            }
            return Ok(existing.settle(note_id));
        }

        if opacity < 1.0 {
            if let Err(error) = surface.set_opacity(opacity) {
                tracing::warn!(error = %error, note_id, "failed to apply default opacity");
            }
        }
        tracing::info!(note_id, "opened note window");
        Ok(OpenOutcome::Created)
    }

    /// Persists final bounds (best effort), untracks, then destroys. A second
    /// close while the first is in flight is a no-op.
    pub async fn close(&self, note_id: &str) -> AppResult<CloseOutcome> {
        let surface = {
            let mut windows = self.registry()?;
            let Some(tracked) = windows.get_mut(note_id) else {
                return Ok(CloseOutcome::NotTracked);
            };
            if tracked.state == WindowState::Closing {
                return Ok(CloseOutcome::AlreadyClosing);
            }
            tracked.state = WindowState::Closing;
            tracked.surface.clone()
        };

        if surface.is_alive() {
            let _geometry = self.geometry_lock.lock().await;
            self.persist_bounds(note_id, surface.as_ref()).await;
        }

        self.registry()?.remove(note_id);
        if surface.is_alive() {
            if let Err(error) = surface.destroy() {
                tracing::warn!(error = %error, note_id, "failed to destroy note window");
            }
        }
        tracing::info!(note_id, "closed note window");
        Ok(CloseOutcome::Closed)
    }

    /// The window went away without passing through `close`. A live tracked
    /// window means the event belongs to an older window for the same note.
    pub fn forget(&self, note_id: &str) -> bool {
        let Ok(mut windows) = self.registry() else {
            return false;
        };
        match windows.get(note_id) {
            Some(tracked) if !tracked.surface.is_alive() => {
                windows.remove(note_id);
                tracing::debug!(note_id, "dropped destroyed note window");
                true
            }
            Some(_) => {
                tracing::debug!(note_id, "ignored destroy event for a replaced window");
                false
            }
            None => false,
        }
    }

    /// Persists the live bounds after a move or resize. Each call is independent;
    /// failures are logged and never retried.
    pub async fn sync_geometry(&self, note_id: &str) -> bool {
        let _geometry = self.geometry_lock.lock().await;
        let Some(surface) = self.open_surface(note_id) else {
            return false;
        };
        self.persist_bounds(note_id, surface.as_ref()).await
    }

    /// Hides every window when all are visible and unminimized, otherwise shows
    /// them all. With nothing tracked it opens every note, or creates one.
    pub async fn toggle_all(&self) -> AppResult<ToggleOutcome> {
        let surfaces = self.open_surfaces()?;

        if surfaces.is_empty() {
            let notes = self.notes.list_all().await;
            if notes.is_empty() {
                let note = self.create_and_open(NotePatch::default()).await?;
                return Ok(ToggleOutcome::Created { note_id: note.id });
            }

            let mut count = 0;
            for note in notes {
                match self.open_note(&note.id).await {
                    Ok(OpenOutcome::Created | OpenOutcome::Focused) => count += 1,
                    Ok(_) => {}
                    Err(error) => tracing::warn!(error = %error, note_id = %note.id, "failed to open note window"),
                }
            }
            return Ok(ToggleOutcome::Opened { count });
        }

        let all_visible = surfaces.iter().all(|(_, surface)| {
            surface.is_visible().unwrap_or(false) && !surface.is_minimized().unwrap_or(true)
        });

        if all_visible {
            for (note_id, surface) in &surfaces {
                if let Err(error) = surface.hide() {
                    tracing::warn!(error = %error, note_id = %note_id, "failed to hide note window");
                }
            }
            return Ok(ToggleOutcome::Hidden { count: surfaces.len() });
        }

        for (note_id, surface) in &surfaces {
            let result = (|| -> AppResult<()> {
                if surface.is_minimized()? {
                    surface.restore()?;
                }
                surface.show()?;
                surface.set_skip_taskbar(false)
            })();
            if let Err(error) = result {
                tracing::warn!(error = %error, note_id = %note_id, "failed to show note window");
            }
        }
        Ok(ToggleOutcome::Shown { count: surfaces.len() })
    }

    /// Creates a note, tells the primary window about it, and opens its window.
    pub async fn create_and_open(&self, draft: NotePatch) -> AppResult<Note> {
        let note = self.notes.create(draft).await?;
        if let Some(main) = self.host.main_window() {
            let payload = serde_json::to_value(&note)?;
            if let Err(error) = main.emit(NOTE_CREATED_EVENT, payload) {
                tracing::warn!(error = %error, note_id = %note.id, "failed to notify primary window");
            }
        }
        self.open_note(&note.id).await?;
        Ok(note)
    }

    pub fn minimize(&self, note_id: &str) -> AppResult<bool> {
        let Some(surface) = self.open_surface(note_id) else {
            return Ok(false);
        };
        surface.minimize()?;
        Ok(true)
    }

    pub fn restore(&self, note_id: &str) -> AppResult<bool> {
        let Some(surface) = self.open_surface(note_id) else {
            return Ok(false);
        };
        surface.restore()?;
        surface.focus()?;
        Ok(true)
    }

    pub fn toggle(&self, note_id: &str) -> AppResult<bool> {
        let Some(surface) = self.open_surface(note_id) else {
            return Ok(false);
        };
        if surface.is_minimized()? {
            surface.restore()?;
            surface.focus()?;
        } else {
            surface.minimize()?;
        }
        Ok(true)
    }

    pub async fn set_always_on_top(&self, note_id: &str, flag: bool) -> AppResult<bool> {
        let patch = NotePatch {
            always_on_top: Some(flag),
            ..NotePatch::default()
        };
        if self.notes.update(note_id, patch).await?.is_none() {
            return Ok(false);
        }
        if let Some(surface) = self.open_surface(note_id) {
            surface.set_always_on_top(flag)?;
        }
        Ok(true)
    }

    /// Persists the settings, then pushes changed size/opacity to every open window.
    pub async fn update_settings(&self, patch: SettingsPatch) -> AppResult<NoteSettings> {
        let resize = patch.width.is_some() || patch.height.is_some();
        let reopacify = patch.opacity.is_some();
        let settings = self.notes.update_settings(patch).await?;

        for (note_id, surface) in self.open_surfaces()? {
            if resize {
                if let Err(error) = surface.set_size(settings.width, settings.height) {
                    tracing::warn!(error = %error, note_id = %note_id, "failed to resize note window");
                }
            }
            if reopacify {
                if let Err(error) = surface.set_opacity(settings.opacity) {
                    tracing::warn!(error = %error, note_id = %note_id, "failed to set note window opacity");
                }
            }
        }
        Ok(settings)
    }

    /// Live-only display override; nothing is persisted.
    pub fn apply_window_settings(&self, note_id: &str, patch: WindowSettingsPatch) -> AppResult<bool> {
        patch.validate()?;
        let Some(surface) = self.open_surface(note_id) else {
            return Ok(false);
        };
        if let (Some(width), Some(height)) = (patch.width, patch.height) {
            surface.set_size(width, height)?;
        }
        if let Some(opacity) = patch.opacity {
            surface.set_opacity(opacity)?;
        }
        Ok(true)
    }

    pub async fn show_note_menu(&self, note_id: &str) -> AppResult<bool> {
        if self.open_surface(note_id).is_none() {
            return Ok(false);
        }
        let Some(note) = self.notes.get(note_id).await else {
            return Ok(false);
        };
        self.host.show_note_menu(note_id, &note_menu(&note))?;
        Ok(true)
    }

    pub async fn handle_menu_action(&self, action: MenuAction) -> AppResult<Option<Note>> {
        match action {
            MenuAction::SetColor { note_id, color } => self.set_note_color(&note_id, color).await,
            MenuAction::SetStyle { note_id, style } => self.set_note_style(&note_id, style).await,
        }
    }

    pub async fn set_note_color(&self, note_id: &str, color: String) -> AppResult<Option<Note>> {
        let patch = NotePatch {
            color: Some(color.clone()),
            ..NotePatch::default()
        };
        let Some(note) = self.notes.update(note_id, patch).await? else {
            return Ok(None);
        };

        if let Some(surface) = self.open_surface(note_id) {
            if let Err(error) = surface.set_background_color(&color) {
                tracing::warn!(error = %error, note_id, "failed to set window background");
            }
            let payload = serde_json::to_value(NoteColorChanged {
                id: note_id.to_string(),
                color,
            })?;
            if let Err(error) = surface.emit(NOTE_COLOR_CHANGED_EVENT, payload) {
                tracing::warn!(error = %error, note_id, "failed to emit color change");
            }
        }
        Ok(Some(note))
    }

    pub async fn set_note_style(&self, note_id: &str, style: NoteStyle) -> AppResult<Option<Note>> {
        let patch = NotePatch {
            style: Some(style),
            ..NotePatch::default()
        };
        let Some(note) = self.notes.update(note_id, patch).await? else {
            return Ok(None);
        };

        if let Some(surface) = self.open_surface(note_id) {
            let payload = serde_json::to_value(NoteStyleChanged {
                id: note_id.to_string(),
                style,
            })?;
            if let Err(error) = surface.emit(NOTE_STYLE_CHANGED_EVENT, payload) {
                tracing::warn!(error = %error, note_id, "failed to emit style change");
            }
        }
        Ok(Some(note))
    }

    /// Shrinks an open window away, closes it, then removes the record.
    pub async fn delete_note(&self, note_id: &str) -> AppResult<bool> {
        if let Some(surface) = self.open_surface(note_id) {
            if let Some(area) = self.host.work_area() {
                if let Err(error) = shrink_to_corner(surface.as_ref(), area).await {
                    tracing::warn!(error = %error, note_id, "shrink animation failed");
                }
            }
            self.close(note_id).await?;
        }
        self.notes.delete(note_id).await
    }

    pub fn show_main_window(&self) -> AppResult<()> {
        match self.host.main_window().filter(|main| main.is_alive()) {
            Some(main) => {
                main.show()?;
                main.focus()?;
            }
            None => {
                self.host.create_main_window()?;
                tracing::info!("recreated primary window");
            }
        }
        Ok(())
    }

    pub fn hide_main_window(&self) -> AppResult<()> {
        if let Some(main) = self.host.main_window().filter(|main| main.is_alive()) {
            main.hide()?;
        }
        Ok(())
    }

    /// Teardown: closes every tracked window through the normal close path.
    pub async fn close_all(&self) {
        for note_id in self.tracked_ids() {
            if let Err(error) = self.close(&note_id).await {
                tracing::warn!(error = %error, note_id = %note_id, "failed to close note window");
            }
        }
    }

    async fn persist_bounds(&self, note_id: &str, surface: &dyn NoteSurface) -> bool {
        // Minimized windows report placeholder geometry; keep the last real bounds.
        if surface.is_minimized().unwrap_or(false) {
            return false;
        }
        let bounds = match surface.bounds() {
            Ok(bounds) => bounds,
            Err(error) => {
                tracing::warn!(error = %error, note_id, "failed to read window bounds");
                return false;
            }
        };
        match self.notes.update_position(note_id, bounds.into()).await {
            Ok(Some(_)) => true,
            Ok(None) => {
                tracing::debug!(note_id, "window bounds for deleted note ignored");
                false
            }
            Err(error) => {
                tracing::warn!(error = %error, note_id, "failed to save window position");
                false
            }
        }
    }

    fn open_surface(&self, note_id: &str) -> Option<Arc<dyn NoteSurface>> {
        let mut windows = self.registry().ok()?;
        let tracked = windows.get(note_id)?;
        if !tracked.surface.is_alive() {
            windows.remove(note_id);
            return None;
        }
        (tracked.state == WindowState::Open).then(|| tracked.surface.clone())
    }

    fn open_surfaces(&self) -> AppResult<Vec<(String, Arc<dyn NoteSurface>)>> {
        let mut windows = self.registry()?;
        windows.retain(|_, tracked| tracked.surface.is_alive());
        let mut surfaces: Vec<(String, Arc<dyn NoteSurface>)> = windows
            .iter()
            .filter(|(_, tracked)| tracked.state == WindowState::Open)
            .map(|(note_id, tracked)| (note_id.clone(), tracked.surface.clone()))
            .collect();
        surfaces.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(surfaces)
    }

    fn existing(&self, note_id: &str) -> AppResult<Option<Existing>> {
        Ok(existing_entry(&mut *self.registry()?, note_id))
    }

    fn registry(&self) -> AppResult<MutexGuard<'_, HashMap<String, TrackedWindow>>> {
        self.windows
            .lock()
            .map_err(|_| AppError::Internal("window registry mutex poisoned".to_string()))
    }
}

/// What an open request finds already tracked for a note.
enum Existing {
    Closing,
    Live(Arc<dyn NoteSurface>),
}

impl Existing {
    /// Runs after the registry lock is released; focusing talks to the event loop.
    fn settle(self, note_id: &str) -> OpenOutcome {
        match self {
            Self::Closing => OpenOutcome::Closing,
            Self::Live(surface) => {
                if let Err(error) = surface.focus() {
                    tracing::warn!(error = %error, note_id, "failed to focus note window");
                }
                OpenOutcome::Focused
            }
        }
    }
}

fn existing_entry(windows: &mut HashMap<String, TrackedWindow>, note_id: &str) -> Option<Existing> {
    let tracked = windows.get(note_id)?;
    if tracked.state == WindowState::Closing {
        return Some(Existing::Closing);
    }
    if !tracked.surface.is_alive() {
        tracing::debug!(note_id, "discarding stale window reference");
        windows.remove(note_id);
        return None;
    }
    Some(Existing::Live(tracked.surface.clone()))
}
