use crate::config::AppConfig;
use crate::dispatch::Trigger;
use crate::AppState;
use tauri::menu::{MenuBuilder, MenuItem};
use tauri::tray::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent};
use tauri::{App, AppHandle, Manager};

const TRAY_ID: &str = "sticky-notes";
const TRAY_SHOW_MAIN: &str = "tray-show-main";
const TRAY_NEW_NOTE: &str = "tray-new-note";
const TRAY_QUIT: &str = "tray-quit";

pub fn trigger_for_menu_id(menu_id: &str) -> Option<Trigger> {
    match menu_id {
        TRAY_SHOW_MAIN => Some(Trigger::ShowMain),
        TRAY_NEW_NOTE => Some(Trigger::NewNote),
        TRAY_QUIT => Some(Trigger::Quit),
        _ => None,
    }
}

/// Runs a trigger off the event-loop thread; failures are logged.
pub fn dispatch_in_background(app: &AppHandle, trigger: Trigger) {
    let Some(state) = app.try_state::<AppState>() else {
        tracing::warn!(trigger = trigger.as_str(), "trigger fired before startup finished");
        return;
    };
    let dispatcher = state.dispatcher.clone();
    tauri::async_runtime::spawn(async move {
        if let Err(error) = dispatcher.dispatch(trigger).await {
            tracing::warn!(error = %error, trigger = trigger.as_str(), "trigger failed");
        }
    });
}

/// Left click toggles every note window; the context menu carries the rest.
pub fn install_tray(app: &App) -> tauri::Result<TrayIcon> {
    let show_main = MenuItem::with_id(app, TRAY_SHOW_MAIN, "Show Main Window", true, None::<&str>)?;
    let new_note = MenuItem::with_id(app, TRAY_NEW_NOTE, "New Note", true, None::<&str>)?;
    let quit = MenuItem::with_id(app, TRAY_QUIT, "Quit", true, None::<&str>)?;
    let menu = MenuBuilder::new(app)
        .item(&show_main)
        .item(&new_note)
        .separator()
        .item(&quit)
        .build()?;

    let mut builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip("Sticky Notes")
        .show_menu_on_left_click(false)
        .on_tray_icon_event(|tray: &TrayIcon, event| {
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                dispatch_in_background(tray.app_handle(), Trigger::ToggleAll);
            }
        });
    if let Some(icon) = app.default_window_icon() {
        builder = builder.icon(icon.clone());
    }
    builder.build(app)
}

#[cfg(desktop)]
pub fn register_shortcuts(app: &AppHandle, config: &AppConfig) {
    use tauri_plugin_global_shortcut::{GlobalShortcutExt, ShortcutState};

    let bindings = [
        (config.new_note_shortcut.clone(), Trigger::NewNote),
        (config.close_shortcut.clone(), Trigger::CloseFocused),
    ];
    for (accelerator, trigger) in bindings {
        // Key release fires too; only the press counts as an activation.
        let registered = app
            .global_shortcut()
            .on_shortcut(accelerator.as_str(), move |app, _shortcut, event| {
                if event.state() == ShortcutState::Pressed {
                    dispatch_in_background(app, trigger);
                }
            });
        match registered {
            Ok(()) => tracing::info!(accelerator = %accelerator, trigger = trigger.as_str(), "registered global shortcut"),
            Err(error) => tracing::warn!(
                error = %error,
                accelerator = %accelerator,
                "global shortcut registration failed"
            ),
        }
    }
}
