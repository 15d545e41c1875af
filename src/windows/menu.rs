use crate::models::{Note, NoteStyle, PALETTE};

const COLOR_PREFIX: &str = "note-color:";
const STYLE_PREFIX: &str = "note-style:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuChoice {
    pub id: String,
    pub label: String,
    pub checked: bool,
}

/// Context menu for one note: the palette and the two styles, current values checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteMenu {
    pub colors: Vec<MenuChoice>,
    pub styles: Vec<MenuChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    SetColor { note_id: String, color: String },
    SetStyle { note_id: String, style: NoteStyle },
}

impl MenuAction {
    /// Menu item ids carry the note id and the chosen value, e.g.
    /// `note-color:<id>:<palette index>` or `note-style:<id>:todo`.
    pub fn parse(menu_id: &str) -> Option<Self> {
        if let Some(rest) = menu_id.strip_prefix(COLOR_PREFIX) {
            let (note_id, index) = rest.rsplit_once(':')?;
            let entry = PALETTE.get(index.parse::<usize>().ok()?)?;
            if note_id.is_empty() {
                return None;
            }
            return Some(Self::SetColor {
                note_id: note_id.to_string(),
                color: entry.color.to_string(),
            });
        }

        let rest = menu_id.strip_prefix(STYLE_PREFIX)?;
        let (note_id, style) = rest.rsplit_once(':')?;
        if note_id.is_empty() {
            return None;
        }
        Some(Self::SetStyle {
            note_id: note_id.to_string(),
            style: NoteStyle::parse(style)?,
        })
    }

    pub fn note_id(&self) -> &str {
        match self {
            Self::SetColor { note_id, .. } | Self::SetStyle { note_id, .. } => note_id,
        }
    }
}

pub fn note_menu(note: &Note) -> NoteMenu {
    let colors = PALETTE
        .iter()
        .enumerate()
        .map(|(index, entry)| MenuChoice {
            id: format!("{}{}:{}", COLOR_PREFIX, note.id, index),
            label: entry.name.to_string(),
            checked: note.color.eq_ignore_ascii_case(entry.color),
        })
        .collect();

    let styles = [(NoteStyle::Normal, "Normal"), (NoteStyle::Todo, "To-do")]
        .into_iter()
        .map(|(style, label)| MenuChoice {
            id: format!("{}{}:{}", STYLE_PREFIX, note.id, style.as_str()),
            label: label.to_string(),
            checked: note.style == style,
        })
        .collect();

    NoteMenu { colors, styles }
}
