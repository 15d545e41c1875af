mod config;
mod dispatch;
mod errors;
pub mod models;
pub mod notes;
pub mod store;
#[cfg(test)]
mod testing;
mod tray;
mod windows;

use crate::config::AppConfig;
use crate::dispatch::{Dispatcher, MainCloseAction};
use crate::models::{BooleanResponse, Note, NotePatch, NoteSettings, SettingsPatch, WindowSettingsPatch};
use crate::notes::NoteManager;
use crate::store::NoteStore;
use crate::windows::menu::MenuAction;
use crate::windows::tauri_host::TauriWindowHost;
use crate::windows::{note_id_from_label, CloseOutcome, OpenOutcome, WindowController, WindowHost, MAIN_WINDOW_LABEL};
use std::path::Path;
use std::sync::Arc;
use tauri::{Manager, WindowEvent};
use tracing_appender::non_blocking::WorkerGuard;

pub use crate::errors::{AppError, AppResult};

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

#[derive(Clone)]
struct AppState {
    notes: Arc<NoteManager>,
    windows: Arc<WindowController>,
    dispatcher: Arc<Dispatcher>,
}

#[tauri::command]
async fn list_notes(state: tauri::State<'_, AppState>) -> Result<Vec<Note>, String> {
    Ok(state.notes.list_all().await)
}

#[tauri::command]
async fn get_note(state: tauri::State<'_, AppState>, note_id: String) -> Result<Option<Note>, String> {
    Ok(state.notes.get(&note_id).await)
}

#[tauri::command]
async fn create_note(state: tauri::State<'_, AppState>, payload: Option<NotePatch>) -> Result<Note, String> {
    state
        .notes
        .create(payload.unwrap_or_default())
        .await
        .map_err(to_client_error)
}

#[tauri::command]
async fn update_note(
    state: tauri::State<'_, AppState>,
    note_id: String,
    updates: NotePatch,
) -> Result<Option<Note>, String> {
    state
        .notes
        .update(&note_id, updates)
        .await
        .map_err(to_client_error)
}

#[tauri::command]
async fn delete_note(state: tauri::State<'_, AppState>, note_id: String) -> Result<BooleanResponse, String> {
    let success = state
        .windows
        .delete_note(&note_id)
        .await
        .map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
async fn open_note_window(state: tauri::State<'_, AppState>, note_id: String) -> Result<OpenOutcome, String> {
    state.windows.open_note(&note_id).await.map_err(to_client_error)
}

#[tauri::command]
async fn close_note_window(state: tauri::State<'_, AppState>, note_id: String) -> Result<CloseOutcome, String> {
    state.windows.close(&note_id).await.map_err(to_client_error)
}

#[tauri::command]
fn minimize_note_window(state: tauri::State<'_, AppState>, note_id: String) -> Result<BooleanResponse, String> {
    let success = state.windows.minimize(&note_id).map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
fn restore_note_window(state: tauri::State<'_, AppState>, note_id: String) -> Result<BooleanResponse, String> {
    let success = state.windows.restore(&note_id).map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
fn toggle_note_window(state: tauri::State<'_, AppState>, note_id: String) -> Result<BooleanResponse, String> {
    let success = state.windows.toggle(&note_id).map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
async fn set_always_on_top(
    state: tauri::State<'_, AppState>,
    note_id: String,
    flag: bool,
) -> Result<BooleanResponse, String> {
    let success = state
        .windows
        .set_always_on_top(&note_id, flag)
        .await
        .map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
async fn get_settings(state: tauri::State<'_, AppState>) -> Result<NoteSettings, String> {
    Ok(state.notes.get_settings().await)
}

#[tauri::command]
async fn update_settings(state: tauri::State<'_, AppState>, updates: SettingsPatch) -> Result<NoteSettings, String> {
    state
        .windows
        .update_settings(updates)
        .await
        .map_err(to_client_error)
}

#[tauri::command]
fn apply_window_settings(
    state: tauri::State<'_, AppState>,
    note_id: String,
    settings: WindowSettingsPatch,
) -> Result<BooleanResponse, String> {
    let success = state
        .windows
        .apply_window_settings(&note_id, settings)
        .map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

#[tauri::command]
async fn show_color_menu(state: tauri::State<'_, AppState>, note_id: String) -> Result<BooleanResponse, String> {
    let success = state
        .windows
        .show_note_menu(&note_id)
        .await
        .map_err(to_client_error)?;
    Ok(BooleanResponse { success })
}

/// Async so a recreated primary window is not built on the IPC thread.
#[tauri::command]
async fn show_main_window(state: tauri::State<'_, AppState>) -> Result<(), String> {
    state.windows.show_main_window().map_err(to_client_error)
}

pub fn run() {
    let builder = tauri::Builder::default();
    #[cfg(desktop)]
    let builder = builder.plugin(tauri_plugin_global_shortcut::Builder::new().build());

    builder
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir().map_err(|error| error.to_string())?;
            std::fs::create_dir_all(&app_data_dir).map_err(|error| error.to_string())?;
            let config = AppConfig::from_app_data_dir(&app_data_dir);
            init_tracing(&config.log_dir).map_err(|error| error.to_string())?;
            tracing::info!(data_file = %config.data_file.display(), "starting sticky notes");

            let notes = Arc::new(NoteManager::new(NoteStore::new(config.data_file.clone())));
            let host: Arc<dyn WindowHost> = Arc::new(TauriWindowHost::new(app.handle().clone()));
            let windows = Arc::new(WindowController::new(notes.clone(), host));
            let dispatcher = Arc::new(Dispatcher::new(windows.clone()));

            tauri::async_runtime::spawn({
                let notes = notes.clone();
                async move {
                    notes.ensure_init().await;
                }
            });

            app.manage(AppState {
                notes,
                windows: windows.clone(),
                dispatcher,
            });

            windows.show_main_window().map_err(|error| error.to_string())?;
            tray::install_tray(app)?;
            #[cfg(desktop)]
            tray::register_shortcuts(app.handle(), &config);
            Ok(())
        })
        .on_window_event(handle_window_event)
        .on_menu_event(|app, event| {
            let menu_id = event.id().as_ref();
            if let Some(trigger) = tray::trigger_for_menu_id(menu_id) {
                tray::dispatch_in_background(app, trigger);
                return;
            }
            let Some(action) = MenuAction::parse(menu_id) else {
                return;
            };
            let Some(state) = app.try_state::<AppState>() else {
                return;
            };
            let windows = state.windows.clone();
            tauri::async_runtime::spawn(async move {
                let note_id = action.note_id().to_string();
                if let Err(error) = windows.handle_menu_action(action).await {
                    tracing::warn!(error = %error, note_id = %note_id, "note menu action failed");
                }
            });
        })
        .invoke_handler(tauri::generate_handler![
            list_notes,
            get_note,
            create_note,
            update_note,
            delete_note,
            open_note_window,
            close_note_window,
            minimize_note_window,
            restore_note_window,
            toggle_note_window,
            set_always_on_top,
            get_settings,
            update_settings,
            apply_window_settings,
            show_color_menu,
            show_main_window
        ])
        .run(tauri::generate_context!())
        .expect("failed to run tauri app");
}

/// Routes native window events onto the controller. Handlers run on the
/// event-loop thread, so anything that touches the store is spawned.
fn handle_window_event(window: &tauri::Window, event: &WindowEvent) {
    let Some(state) = window.try_state::<AppState>() else {
        return;
    };
    let state = state.inner().clone();

    if window.label() == MAIN_WINDOW_LABEL {
        if let WindowEvent::CloseRequested { api, .. } = event {
            if state.dispatcher.main_close_action() == MainCloseAction::Hide {
                api.prevent_close();
                if let Err(error) = window.hide() {
                    tracing::warn!(error = %error, "failed to hide primary window");
                }
            }
        }
        return;
    }

    let Some(note_id) = note_id_from_label(window.label()).map(ToString::to_string) else {
        return;
    };
    match event {
        WindowEvent::Moved(_) | WindowEvent::Resized(_) => {
            tauri::async_runtime::spawn(async move {
                state.windows.sync_geometry(&note_id).await;
            });
        }
        WindowEvent::CloseRequested { api, .. } => {
            api.prevent_close();
            tauri::async_runtime::spawn(async move {
                if let Err(error) = state.windows.close(&note_id).await {
                    tracing::warn!(error = %error, note_id = %note_id, "failed to close note window");
                }
            });
        }
        // Off the event-loop thread: an open in flight may be waiting on it.
        WindowEvent::Destroyed => {
            tauri::async_runtime::spawn(async move {
                state.windows.forget(&note_id);
            });
        }
        _ => {}
    }
}

fn init_tracing(log_dir: &Path) -> Result<(), String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, config::LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
