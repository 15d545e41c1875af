use crate::errors::{AppError, AppResult};
use crate::models::WindowBounds;
use crate::windows::menu::NoteMenu;
use crate::windows::{note_window_label, NoteSurface, NoteWindowSpec, WindowHost, MAIN_WINDOW_LABEL};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
struct SurfaceState {
    alive: bool,
    visible: bool,
    minimized: bool,
    always_on_top: bool,
    opacity: f64,
    background: String,
    bounds: WindowBounds,
    focus_count: usize,
    destroy_count: usize,
    events: Vec<(String, serde_json::Value)>,
}

/// In-memory window that records every call made on it.
#[derive(Debug)]
pub struct FakeSurface {
    label: String,
    state: Mutex<SurfaceState>,
}

impl FakeSurface {
    fn new(label: &str, bounds: WindowBounds, background: &str, always_on_top: bool) -> Self {
        Self {
            label: label.to_string(),
            state: Mutex::new(SurfaceState {
                alive: true,
                visible: true,
                minimized: false,
                always_on_top,
                opacity: 1.0,
                background: background.to_string(),
                bounds,
                focus_count: 0,
                destroy_count: 0,
                events: Vec::new(),
            }),
        }
    }

    fn with<T>(&self, read: impl FnOnce(&mut SurfaceState) -> T) -> T {
        let mut state = self.state.lock().expect("fake surface lock");
        read(&mut state)
    }

    /// Destroys the window behind the controller's back.
    pub fn kill(&self) {
        self.with(|state| state.alive = false);
    }

    /// Simulates the user dragging or resizing the window.
    pub fn user_set_bounds(&self, bounds: WindowBounds) {
        self.with(|state| state.bounds = bounds);
    }

    pub fn focus_count(&self) -> usize {
        self.with(|state| state.focus_count)
    }

    pub fn destroy_count(&self) -> usize {
        self.with(|state| state.destroy_count)
    }

    pub fn visible(&self) -> bool {
        self.with(|state| state.visible)
    }

    pub fn minimized(&self) -> bool {
        self.with(|state| state.minimized)
    }

    pub fn always_on_top(&self) -> bool {
        self.with(|state| state.always_on_top)
    }

    pub fn opacity(&self) -> f64 {
        self.with(|state| state.opacity)
    }

    pub fn background(&self) -> String {
        self.with(|state| state.background.clone())
    }

    pub fn current_bounds(&self) -> WindowBounds {
        self.with(|state| state.bounds)
    }

    pub fn events(&self) -> Vec<(String, serde_json::Value)> {
        self.with(|state| state.events.clone())
    }

    fn live<T>(&self, change: impl FnOnce(&mut SurfaceState) -> T) -> AppResult<T> {
        self.with(|state| {
            if !state.alive {
                return Err(AppError::Window(format!("window {} is destroyed", self.label)));
            }
            Ok(change(state))
        })
    }
}

impl NoteSurface for FakeSurface {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_alive(&self) -> bool {
        self.with(|state| state.alive)
    }

    fn is_visible(&self) -> AppResult<bool> {
        self.live(|state| state.visible)
    }

    fn is_minimized(&self) -> AppResult<bool> {
        self.live(|state| state.minimized)
    }

    fn show(&self) -> AppResult<()> {
        self.live(|state| state.visible = true)
    }

    fn hide(&self) -> AppResult<()> {
        self.live(|state| state.visible = false)
    }

    fn focus(&self) -> AppResult<()> {
        self.live(|state| state.focus_count += 1)
    }

    fn minimize(&self) -> AppResult<()> {
        self.live(|state| state.minimized = true)
    }

    fn restore(&self) -> AppResult<()> {
        self.live(|state| state.minimized = false)
    }

    fn set_skip_taskbar(&self, _skip: bool) -> AppResult<()> {
        self.live(|_| ())
    }

    fn bounds(&self) -> AppResult<WindowBounds> {
        self.live(|state| state.bounds)
    }

    fn set_bounds(&self, bounds: WindowBounds) -> AppResult<()> {
        self.live(|state| state.bounds = bounds)
    }

    fn set_size(&self, width: u32, height: u32) -> AppResult<()> {
        self.live(|state| {
            state.bounds.width = width;
            state.bounds.height = height;
        })
    }

    fn set_opacity(&self, opacity: f64) -> AppResult<()> {
        self.live(|state| state.opacity = opacity)
    }

    fn set_always_on_top(&self, flag: bool) -> AppResult<()> {
        self.live(|state| state.always_on_top = flag)
    }

    fn set_background_color(&self, color: &str) -> AppResult<()> {
        self.live(|state| state.background = color.to_string())
    }

    fn emit(&self, event: &str, payload: serde_json::Value) -> AppResult<()> {
        self.live(|state| state.events.push((event.to_string(), payload)))
    }

    fn destroy(&self) -> AppResult<()> {
        self.live(|state| {
            state.alive = false;
            state.destroy_count += 1;
        })
    }
}

/// Host that hands out `FakeSurface`s and remembers everything it was asked to do.
#[derive(Default)]
pub struct FakeHost {
    created: Mutex<Vec<(NoteWindowSpec, Arc<FakeSurface>)>>,
    main: Mutex<Option<Arc<FakeSurface>>>,
    main_created: Mutex<usize>,
    focused: Mutex<Option<String>>,
    menus: Mutex<Vec<(String, NoteMenu)>>,
    exited: AtomicBool,
    on_create: Mutex<Option<CreateHook>>,
}

type CreateHook = Box<dyn Fn() + Send + Sync>;

impl FakeHost {
    pub fn created_count(&self) -> usize {
        self.created.lock().expect("fake host lock").len()
    }

    pub fn specs(&self) -> Vec<NoteWindowSpec> {
        self.created
            .lock()
            .expect("fake host lock")
            .iter()
            .map(|(spec, _)| spec.clone())
            .collect()
    }

    /// Most recent window created for the note.
    pub fn surface(&self, note_id: &str) -> Option<Arc<FakeSurface>> {
        let label = note_window_label(note_id);
        self.created
            .lock()
            .expect("fake host lock")
            .iter()
            .rev()
            .find(|(spec, _)| spec.label == label)
            .map(|(_, surface)| surface.clone())
    }

    pub fn main(&self) -> Option<Arc<FakeSurface>> {
        self.main.lock().expect("fake host lock").clone()
    }

    pub fn main_created_count(&self) -> usize {
        *self.main_created.lock().expect("fake host lock")
    }

    pub fn set_focused(&self, label: Option<&str>) {
        *self.focused.lock().expect("fake host lock") = label.map(ToString::to_string);
    }

    pub fn last_menu(&self) -> Option<(String, NoteMenu)> {
        self.menus.lock().expect("fake host lock").last().cloned()
    }

    /// Runs inside every `create_note_window` call, before the window exists.
    pub fn on_create(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.on_create.lock().expect("fake host lock") = Some(Box::new(hook));
    }

    pub fn exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }
}

impl WindowHost for FakeHost {
    fn create_note_window(&self, spec: &NoteWindowSpec) -> AppResult<Arc<dyn NoteSurface>> {
        if let Some(hook) = self.on_create.lock().expect("fake host lock").as_ref() {
            hook();
        }
        let bounds = WindowBounds {
            x: spec.x.unwrap_or(100),
            y: spec.y.unwrap_or(100),
            width: spec.width,
            height: spec.height,
        };
        let surface = Arc::new(FakeSurface::new(
            &spec.label,
            bounds,
            &spec.background_color,
            spec.always_on_top,
        ));
        self.created
            .lock()
            .expect("fake host lock")
            .push((spec.clone(), surface.clone()));
        Ok(surface)
    }

    fn main_window(&self) -> Option<Arc<dyn NoteSurface>> {
        self.main().map(|main| main as Arc<dyn NoteSurface>)
    }

    fn create_main_window(&self) -> AppResult<Arc<dyn NoteSurface>> {
        let bounds = WindowBounds { x: 480, y: 270, width: 960, height: 540 };
        let main = Arc::new(FakeSurface::new(MAIN_WINDOW_LABEL, bounds, "#f5f5f5", false));
        *self.main.lock().expect("fake host lock") = Some(main.clone());
        *self.main_created.lock().expect("fake host lock") += 1;
        Ok(main)
    }

    fn focused_window_label(&self) -> Option<String> {
        self.focused.lock().expect("fake host lock").clone()
    }

    fn work_area(&self) -> Option<WindowBounds> {
        Some(WindowBounds { x: 0, y: 0, width: 1920, height: 1040 })
    }

    fn show_note_menu(&self, note_id: &str, menu: &NoteMenu) -> AppResult<()> {
        self.menus
            .lock()
            .expect("fake host lock")
            .push((note_id.to_string(), menu.clone()));
        Ok(())
    }

    fn exit(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }
}
