use crate::errors::AppResult;
use crate::models::NotePatch;
use crate::windows::{note_id_from_label, CloseOutcome, ToggleOutcome, WindowController, MAIN_WINDOW_LABEL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Process-wide entry points reachable from the tray icon and global shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    NewNote,
    ShowMain,
    ToggleAll,
    CloseFocused,
    Quit,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NewNote => "new-note",
            Self::ShowMain => "show-main",
            Self::ToggleAll => "toggle-all",
            Self::CloseFocused => "close-focused",
            Self::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    NoteCreated { note_id: String },
    MainShown,
    Toggled(ToggleOutcome),
    NoteClosed { note_id: String, outcome: CloseOutcome },
    MainHidden,
    NothingFocused,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainCloseAction {
    Hide,
    Allow,
}

/// Serializes activations so overlapping clicks or key repeats each run to
/// completion before the next one inspects window state.
pub struct Dispatcher {
    windows: Arc<WindowController>,
    activation: Mutex<()>,
    quitting: AtomicBool,
}

impl Dispatcher {
    pub fn new(windows: Arc<WindowController>) -> Self {
        Self {
            windows,
            activation: Mutex::new(()),
            quitting: AtomicBool::new(false),
        }
    }

    pub fn is_quitting(&self) -> bool {
        self.quitting.load(Ordering::SeqCst)
    }

    /// The primary window only really closes during quit; otherwise it hides.
    pub fn main_close_action(&self) -> MainCloseAction {
        if self.is_quitting() {
            MainCloseAction::Allow
        } else {
            MainCloseAction::Hide
        }
    }

    pub async fn dispatch(&self, trigger: Trigger) -> AppResult<DispatchOutcome> {
        let _activation = self.activation.lock().await;
        tracing::debug!(trigger = trigger.as_str(), "dispatching trigger");

        match trigger {
            Trigger::NewNote => {
                let note = self.windows.create_and_open(NotePatch::default()).await?;
                Ok(DispatchOutcome::NoteCreated { note_id: note.id })
            }
            Trigger::ShowMain => {
                self.windows.show_main_window()?;
                Ok(DispatchOutcome::MainShown)
            }
            Trigger::ToggleAll => Ok(DispatchOutcome::Toggled(self.windows.toggle_all().await?)),
            Trigger::CloseFocused => self.close_focused().await,
            Trigger::Quit => {
                self.quitting.store(true, Ordering::SeqCst);
                self.windows.close_all().await;
                tracing::info!("quitting");
                self.windows.host().exit();
                Ok(DispatchOutcome::Quitting)
            }
        }
    }

    async fn close_focused(&self) -> AppResult<DispatchOutcome> {
        let Some(label) = self.windows.host().focused_window_label() else {
            return Ok(DispatchOutcome::NothingFocused);
        };

        if label == MAIN_WINDOW_LABEL {
            self.windows.hide_main_window()?;
            return Ok(DispatchOutcome::MainHidden);
        }

        match note_id_from_label(&label) {
            Some(note_id) => {
                let outcome = self.windows.close(note_id).await?;
                Ok(DispatchOutcome::NoteClosed {
                    note_id: note_id.to_string(),
                    outcome,
                })
            }
            None => Ok(DispatchOutcome::NothingFocused),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DispatchOutcome, Dispatcher, MainCloseAction, Trigger};
    use crate::models::{WindowBounds, NOTE_CREATED_EVENT};
    use crate::notes::NoteManager;
    use crate::store::NoteStore;
    use crate::testing::FakeHost;
    use crate::windows::{CloseOutcome, ToggleOutcome, WindowController, WindowHost};
    use std::sync::Arc;

    fn dispatcher(dir: &tempfile::TempDir) -> (Arc<Dispatcher>, Arc<WindowController>, Arc<FakeHost>) {
        let notes = Arc::new(NoteManager::new(NoteStore::new(dir.path().join("notes.json"))));
        let host = Arc::new(FakeHost::default());
        let windows = Arc::new(WindowController::new(notes, host.clone() as Arc<dyn WindowHost>));
        (Arc::new(Dispatcher::new(windows.clone())), windows, host)
    }

    #[tokio::test]
    async fn each_new_note_activation_creates_exactly_one_note_and_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (dispatcher, windows, host) = dispatcher(&dir);
        windows.show_main_window().expect("main");

        let (a, b, c) = tokio::join!(
            dispatcher.dispatch(Trigger::NewNote),
            dispatcher.dispatch(Trigger::NewNote),
            dispatcher.dispatch(Trigger::NewNote),
        );
        for outcome in [a, b, c] {
            assert!(matches!(outcome.expect("dispatch"), DispatchOutcome::NoteCreated { .. }));
        }

        assert_eq!(windows.notes().note_count().await, 3);
        assert_eq!(host.created_count(), 3);
        assert_eq!(windows.tracked_ids().len(), 3);
        let announced = host.main().expect("main").events();
        assert_eq!(announced.len(), 3);
        assert!(announced.iter().all(|(event, _)| event == NOTE_CREATED_EVENT));
    }

    #[tokio::test]
    async fn overlapping_toggles_on_empty_workspace_create_a_single_note() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (dispatcher, windows, host) = dispatcher(&dir);

        let (first, second) = tokio::join!(
            dispatcher.dispatch(Trigger::ToggleAll),
            dispatcher.dispatch(Trigger::ToggleAll),
        );
        assert!(matches!(
            first.expect("first toggle"),
            DispatchOutcome::Toggled(ToggleOutcome::Created { .. })
        ));
        assert_eq!(
            second.expect("second toggle"),
            DispatchOutcome::Toggled(ToggleOutcome::Hidden { count: 1 })
        );
        assert_eq!(windows.notes().note_count().await, 1);
        assert_eq!(host.created_count(), 1);
    }

    #[tokio::test]
    async fn show_main_recreates_the_primary_window_lazily() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (dispatcher, _windows, host) = dispatcher(&dir);

        assert_eq!(dispatcher.dispatch(Trigger::ShowMain).await.expect("show"), DispatchOutcome::MainShown);
        assert_eq!(host.main_created_count(), 1);

        host.main().expect("main").kill();
        dispatcher.dispatch(Trigger::ShowMain).await.expect("show again");
        assert_eq!(host.main_created_count(), 2);

        let main = host.main().expect("main");
        dispatcher.dispatch(Trigger::ShowMain).await.expect("show existing");
        assert_eq!(host.main_created_count(), 2);
        assert_eq!(main.focus_count(), 1);
    }

    #[tokio::test]
    async fn close_focused_targets_the_focused_note() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (dispatcher, windows, host) = dispatcher(&dir);
        let note = windows
            .create_and_open(crate::models::NotePatch::default())
            .await
            .expect("create");

        assert_eq!(
            dispatcher.dispatch(Trigger::CloseFocused).await.expect("nothing"),
            DispatchOutcome::NothingFocused
        );

        host.set_focused(Some(format!("note-{}", note.id).as_str()));
        assert_eq!(
            dispatcher.dispatch(Trigger::CloseFocused).await.expect("close"),
            DispatchOutcome::NoteClosed {
                note_id: note.id.clone(),
                outcome: CloseOutcome::Closed,
            }
        );
        assert!(windows.tracked_ids().is_empty());

        windows.show_main_window().expect("main");
        host.set_focused(Some("main"));
        assert_eq!(
            dispatcher.dispatch(Trigger::CloseFocused).await.expect("hide main"),
            DispatchOutcome::MainHidden
        );
        assert!(!host.main().expect("main").visible());
    }

    #[tokio::test]
    async fn quit_persists_open_windows_and_exits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (dispatcher, windows, host) = dispatcher(&dir);
        let note = windows
            .create_and_open(crate::models::NotePatch::default())
            .await
            .expect("create");
        host.surface(&note.id)
            .expect("surface")
            .user_set_bounds(WindowBounds { x: 5, y: 6, width: 410, height: 320 });

        assert_eq!(dispatcher.main_close_action(), MainCloseAction::Hide);
        assert_eq!(dispatcher.dispatch(Trigger::Quit).await.expect("quit"), DispatchOutcome::Quitting);

        assert!(host.exited());
        assert!(dispatcher.is_quitting());
        assert_eq!(dispatcher.main_close_action(), MainCloseAction::Allow);
        assert!(windows.tracked_ids().is_empty());
        let stored = windows.notes().get(&note.id).await.expect("stored");
        assert_eq!((stored.position.width, stored.position.height), (410, 320));
    }
}
