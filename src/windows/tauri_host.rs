use crate::errors::{AppError, AppResult};
use crate::models::{parse_hex_color, NoteOpacityChanged, WindowBounds, NOTE_OPACITY_CHANGED_EVENT};
use crate::windows::menu::{MenuChoice, NoteMenu};
use crate::windows::{
    note_id_from_label, note_window_label, NoteSurface, NoteWindowSpec, WindowHost, MAIN_WINDOW_LABEL,
};
use std::sync::Arc;
use tauri::menu::{CheckMenuItemBuilder, MenuBuilder, Submenu, SubmenuBuilder};
use tauri::window::Color;
use tauri::{
    AppHandle, Emitter, EventTarget, LogicalPosition, LogicalSize, Manager, WebviewUrl, WebviewWindow,
    WebviewWindowBuilder,
};

const MAIN_WINDOW_TITLE: &str = "Sticky Notes";
const MAIN_WINDOW_BACKGROUND: Color = Color(0xf5, 0xf5, 0xf5, 0xff);
const DEFAULT_NOTE_BACKGROUND: Color = Color(0xff, 0xff, 0x00, 0xff);

pub struct TauriSurface {
    window: WebviewWindow,
}

impl TauriSurface {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl NoteSurface for TauriSurface {
    fn label(&self) -> String {
        self.window.label().to_string()
    }

    fn is_alive(&self) -> bool {
        self.window
            .app_handle()
            .get_webview_window(self.window.label())
            .is_some()
    }

    fn is_visible(&self) -> AppResult<bool> {
        Ok(self.window.is_visible()?)
    }

    fn is_minimized(&self) -> AppResult<bool> {
        Ok(self.window.is_minimized()?)
    }

    fn show(&self) -> AppResult<()> {
        Ok(self.window.show()?)
    }

    fn hide(&self) -> AppResult<()> {
        Ok(self.window.hide()?)
    }

    fn focus(&self) -> AppResult<()> {
        Ok(self.window.set_focus()?)
    }

    fn minimize(&self) -> AppResult<()> {
        Ok(self.window.minimize()?)
    }

    fn restore(&self) -> AppResult<()> {
        Ok(self.window.unminimize()?)
    }

    fn set_skip_taskbar(&self, skip: bool) -> AppResult<()> {
        Ok(self.window.set_skip_taskbar(skip)?)
    }

    fn bounds(&self) -> AppResult<WindowBounds> {
        let scale = self.window.scale_factor()?;
        let position = self.window.outer_position()?.to_logical::<f64>(scale);
        let size = self.window.inner_size()?.to_logical::<f64>(scale);
        Ok(WindowBounds {
            x: position.x.round() as i32,
            y: position.y.round() as i32,
            width: size.width.round() as u32,
            height: size.height.round() as u32,
        })
    }

    fn set_bounds(&self, bounds: WindowBounds) -> AppResult<()> {
        self.window
            .set_position(LogicalPosition::new(bounds.x as f64, bounds.y as f64))?;
        self.window
            .set_size(LogicalSize::new(bounds.width as f64, bounds.height as f64))?;
        Ok(())
    }

    fn set_size(&self, width: u32, height: u32) -> AppResult<()> {
        Ok(self.window.set_size(LogicalSize::new(width as f64, height as f64))?)
    }

    /// Webview windows have no native opacity setter; the page applies it.
    fn set_opacity(&self, opacity: f64) -> AppResult<()> {
        let id = note_id_from_label(self.window.label()).unwrap_or_default().to_string();
        let payload = serde_json::to_value(NoteOpacityChanged { id, opacity })?;
        self.emit(NOTE_OPACITY_CHANGED_EVENT, payload)
    }

    fn set_always_on_top(&self, flag: bool) -> AppResult<()> {
        Ok(self.window.set_always_on_top(flag)?)
    }

    fn set_background_color(&self, color: &str) -> AppResult<()> {
        let (r, g, b, a) =
            parse_hex_color(color).ok_or_else(|| AppError::Validation(format!("invalid color '{}'", color)))?;
        Ok(self.window.set_background_color(Some(Color(r, g, b, a)))?)
    }

    fn emit(&self, event: &str, payload: serde_json::Value) -> AppResult<()> {
        let target = EventTarget::webview_window(self.window.label());
        Ok(self.window.emit_to(target, event, payload)?)
    }

    fn destroy(&self) -> AppResult<()> {
        Ok(self.window.destroy()?)
    }
}

pub struct TauriWindowHost {
    app: AppHandle,
}

impl TauriWindowHost {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    fn check_items(&self, title: &str, choices: &[MenuChoice]) -> AppResult<Submenu<tauri::Wry>> {
        let mut builder = SubmenuBuilder::new(&self.app, title);
        for choice in choices {
            let item = CheckMenuItemBuilder::with_id(choice.id.clone(), &choice.label)
                .checked(choice.checked)
                .build(&self.app)?;
            builder = builder.item(&item);
        }
        Ok(builder.build()?)
    }
}

impl WindowHost for TauriWindowHost {
    fn create_note_window(&self, spec: &NoteWindowSpec) -> AppResult<Arc<dyn NoteSurface>> {
        let note_id = serde_json::to_string(&spec.note_id)?;
        let background = parse_hex_color(&spec.background_color)
            .map(|(r, g, b, a)| Color(r, g, b, a))
            .unwrap_or(DEFAULT_NOTE_BACKGROUND);

        let mut builder = WebviewWindowBuilder::new(&self.app, &spec.label, WebviewUrl::App("note.html".into()))
            .title(&spec.title)
            .inner_size(spec.width as f64, spec.height as f64)
            .decorations(false)
            .resizable(true)
            .skip_taskbar(false)
            .always_on_top(spec.always_on_top)
            .background_color(background)
            .initialization_script(&format!("window.__NOTE_ID__ = {};", note_id));
        if let (Some(x), Some(y)) = (spec.x, spec.y) {
            builder = builder.position(x as f64, y as f64);
        }

        let window = builder.build()?;
        Ok(Arc::new(TauriSurface::new(window)))
    }

    fn main_window(&self) -> Option<Arc<dyn NoteSurface>> {
        self.app
            .get_webview_window(MAIN_WINDOW_LABEL)
            .map(|window| Arc::new(TauriSurface::new(window)) as Arc<dyn NoteSurface>)
    }

    /// Half the primary work area, centered.
    fn create_main_window(&self) -> AppResult<Arc<dyn NoteSurface>> {
        let mut builder = WebviewWindowBuilder::new(&self.app, MAIN_WINDOW_LABEL, WebviewUrl::App("index.html".into()))
            .title(MAIN_WINDOW_TITLE)
            .background_color(MAIN_WINDOW_BACKGROUND);

        builder = match self.work_area() {
            Some(area) => {
                let width = (area.width / 2) as f64;
                let height = (area.height / 2) as f64;
                let x = area.x as f64 + (area.width as f64 - width) / 2.0;
                let y = area.y as f64 + (area.height as f64 - height) / 2.0;
                builder.inner_size(width, height).position(x, y)
            }
            None => builder.inner_size(800.0, 600.0).center(),
        };

        let window = builder.build()?;
        Ok(Arc::new(TauriSurface::new(window)))
    }

    fn focused_window_label(&self) -> Option<String> {
        self.app
            .webview_windows()
            .into_iter()
            .find(|(_, window)| window.is_focused().unwrap_or(false))
            .map(|(label, _)| label)
    }

    /// Excludes taskbars and docks.
    fn work_area(&self) -> Option<WindowBounds> {
        let monitor = self.app.primary_monitor().ok().flatten()?;
        let scale = monitor.scale_factor();
        let area = monitor.work_area();
        let position = area.position.to_logical::<f64>(scale);
        let size = area.size.to_logical::<f64>(scale);
        Some(WindowBounds {
            x: position.x.round() as i32,
            y: position.y.round() as i32,
            width: size.width.round() as u32,
            height: size.height.round() as u32,
        })
    }

    fn show_note_menu(&self, note_id: &str, menu: &NoteMenu) -> AppResult<()> {
        let window = self
            .app
            .get_webview_window(&note_window_label(note_id))
            .ok_or_else(|| AppError::NotFound(format!("no window for note {}", note_id)))?;

        let colors = self.check_items("Color", &menu.colors)?;
        let styles = self.check_items("Style", &menu.styles)?;
        let popup = MenuBuilder::new(&self.app).item(&colors).item(&styles).build()?;
        window.popup_menu(&popup)?;
        Ok(())
    }

    fn exit(&self) {
        self.app.exit(0);
    }
}
