use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{AppError, AppResult};

static HEX_COLOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid hex color regex")
});

pub const DEFAULT_NOTE_TITLE: &str = "New Note";
pub const DEFAULT_NOTE_WIDTH: u32 = 150;
pub const DEFAULT_NOTE_HEIGHT: u32 = 200;

pub const NOTE_CREATED_EVENT: &str = "note-created";
pub const NOTE_COLOR_CHANGED_EVENT: &str = "note-color-changed";
pub const NOTE_STYLE_CHANGED_EVENT: &str = "note-style-changed";
pub const NOTE_OPACITY_CHANGED_EVENT: &str = "note-opacity-changed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    pub name: &'static str,
    pub color: &'static str,
}

/// Default note colors, cycled by note count when a note is created without one.
pub const PALETTE: [PaletteColor; 8] = [
    PaletteColor { name: "Yellow", color: "#ffff00" },
    PaletteColor { name: "Orange", color: "#ffa500" },
    PaletteColor { name: "Green", color: "#90ee90" },
    PaletteColor { name: "Sky Blue", color: "#87ceeb" },
    PaletteColor { name: "Pink", color: "#ffb6c1" },
    PaletteColor { name: "Lavender", color: "#dda0dd" },
    PaletteColor { name: "Wheat", color: "#f5deb3" },
    PaletteColor { name: "Khaki", color: "#f0e68c" },
];

pub fn palette_color_for(note_count: usize) -> &'static str {
    PALETTE[note_count % PALETTE.len()].color
}

pub fn is_valid_color(value: &str) -> bool {
    HEX_COLOR_RE.is_match(value)
}

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa` into RGBA channels.
pub fn parse_hex_color(value: &str) -> Option<(u8, u8, u8, u8)> {
    if !is_valid_color(value) {
        return None;
    }
    let hex = &value[1..];
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match hex.len() {
        3 => {
            let expand = |index: usize| {
                let digit = u8::from_str_radix(&hex[index..index + 1], 16).ok()?;
                Some(digit * 17)
            };
            Some((expand(0)?, expand(1)?, expand(2)?, 255))
        }
        6 => Some((channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
        8 => Some((channel(0..2)?, channel(2..4)?, channel(4..6)?, channel(6..8)?)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoteStyle {
    #[default]
    Normal,
    Todo,
}

impl NoteStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Todo => "todo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "todo" => Some(Self::Todo),
            _ => None,
        }
    }
}

/// Stored window geometry. Absent `x`/`y` lets the OS place the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotePosition {
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl Default for NotePosition {
    fn default() -> Self {
        Self {
            width: DEFAULT_NOTE_WIDTH,
            height: DEFAULT_NOTE_HEIGHT,
            x: None,
            y: None,
        }
    }
}

impl NotePosition {
    pub fn apply(&mut self, patch: &PositionPatch) {
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(x) = patch.x {
            self.x = Some(x);
        }
        if let Some(y) = patch.y {
            self.y = Some(y);
        }
    }
}

/// Fields other than `id` fall back to defaults so a hand-edited or older file
/// still loads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    #[serde(default = "default_note_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_note_color")]
    pub color: String,
    #[serde(default)]
    pub style: NoteStyle,
    #[serde(default)]
    pub position: NotePosition,
    #[serde(default)]
    pub always_on_top: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

fn default_note_title() -> String {
    DEFAULT_NOTE_TITLE.to_string()
}

fn default_note_color() -> String {
    palette_color_for(0).to_string()
}

impl Note {
    /// Shallow merge: present fields replace, absent fields are untouched.
    pub fn apply(&mut self, patch: &NotePatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(content) = &patch.content {
            self.content = content.clone();
        }
        if let Some(color) = &patch.color {
            self.color = color.clone();
        }
        if let Some(style) = patch.style {
            self.style = style;
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(always_on_top) = patch.always_on_top {
            self.always_on_top = always_on_top;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteSettings {
    pub width: u32,
    pub height: u32,
    pub opacity: f64,
    pub font_size: u32,
    pub font_color: String,
    pub font_family: String,
    pub font_weight: String,
    pub font_style: String,
    pub style: NoteStyle,
}

impl Default for NoteSettings {
    fn default() -> Self {
        Self {
            width: 300,
            height: 400,
            opacity: 1.0,
            font_size: 14,
            font_color: "#333333".to_string(),
            font_family: "Microsoft YaHei".to_string(),
            font_weight: "normal".to_string(),
            font_style: "normal".to_string(),
            style: NoteStyle::Normal,
        }
    }
}

impl NoteSettings {
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(font_color) = &patch.font_color {
            self.font_color = font_color.clone();
        }
        if let Some(font_family) = &patch.font_family {
            self.font_family = font_family.clone();
        }
        if let Some(font_weight) = &patch.font_weight {
            self.font_weight = font_weight.clone();
        }
        if let Some(font_style) = &patch.font_style {
            self.font_style = font_style.clone();
        }
        if let Some(style) = patch.style {
            self.style = style;
        }
    }
}

/// The persisted unit: every note plus the global settings row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Document {
    #[serde(deserialize_with = "lenient_notes")]
    pub notes: Vec<Note>,
    pub settings: NoteSettings,
}

/// Reads the notes array entry by entry. An entry that cannot be read, or whose
/// id is empty or already taken, is skipped instead of failing the document.
fn lenient_notes<'de, D>(deserializer: D) -> Result<Vec<Note>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<serde_json::Value>::deserialize(deserializer)?;
    let mut notes: Vec<Note> = Vec::with_capacity(entries.len());
    for entry in entries {
        match serde_json::from_value::<Note>(entry) {
            Ok(mut note) if !note.id.is_empty() && !notes.iter().any(|kept| kept.id == note.id) => {
                note.updated_at = note.updated_at.max(note.created_at);
                notes.push(note);
            }
            Ok(note) => tracing::warn!(note_id = %note.id, "skipped note with empty or duplicate id"),
            Err(error) => tracing::warn!(error = %error, "skipped unreadable note entry"),
        }
    }
    Ok(notes)
}

/// Partial note used for both creation and update. Identity and timestamps
/// are not part of the patch and cannot be overwritten through it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub color: Option<String>,
    pub style: Option<NoteStyle>,
    pub position: Option<NotePosition>,
    pub always_on_top: Option<bool>,
}

impl NotePatch {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(color) = &self.color {
            if !color.is_empty() && !is_valid_color(color) {
                return Err(AppError::Validation(format!("invalid note color '{}'", color)));
            }
        }
        if let Some(position) = &self.position {
            validate_size(position.width, position.height)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PositionPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl PositionPatch {
    pub fn validate(&self) -> AppResult<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(AppError::Validation("window size must be positive".to_string()));
        }
        Ok(())
    }
}

impl From<WindowBounds> for PositionPatch {
    fn from(bounds: WindowBounds) -> Self {
        Self {
            width: Some(bounds.width),
            height: Some(bounds.height),
            x: Some(bounds.x),
            y: Some(bounds.y),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub opacity: Option<f64>,
    pub font_size: Option<u32>,
    pub font_color: Option<String>,
    pub font_family: Option<String>,
    pub font_weight: Option<String>,
    pub font_style: Option<String>,
    pub style: Option<NoteStyle>,
}

impl SettingsPatch {
    pub fn validate(&self) -> AppResult<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(AppError::Validation("default window size must be positive".to_string()));
        }
        if let Some(opacity) = self.opacity {
            validate_opacity(opacity)?;
        }
        if self.font_size == Some(0) {
            return Err(AppError::Validation("font size must be positive".to_string()));
        }
        Ok(())
    }
}

/// Per-window display overrides that are applied live and never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowSettingsPatch {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub opacity: Option<f64>,
}

impl WindowSettingsPatch {
    pub fn validate(&self) -> AppResult<()> {
        if self.width == Some(0) || self.height == Some(0) {
            return Err(AppError::Validation("window size must be positive".to_string()));
        }
        if let Some(opacity) = self.opacity {
            validate_opacity(opacity)?;
        }
        Ok(())
    }
}

/// Live outer geometry of a window in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanResponse {
    pub success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteColorChanged {
    pub id: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStyleChanged {
    pub id: String,
    pub style: NoteStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteOpacityChanged {
    pub id: String,
    pub opacity: f64,
}

fn validate_size(width: u32, height: u32) -> AppResult<()> {
    if width == 0 || height == 0 {
        return Err(AppError::Validation("window size must be positive".to_string()));
    }
    Ok(())
}

fn validate_opacity(opacity: f64) -> AppResult<()> {
    if !(0.0..=1.0).contains(&opacity) {
        return Err(AppError::Validation(format!("opacity {} is outside 0..=1", opacity)));
    }
    Ok(())
}
