use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokePhase {
    Start,
    Draw,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawPoint {
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub size: f32,
    pub phase: StrokePhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNote {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub color: String,
}

/// Events on a room's whiteboard topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum BoardEvent {
    DrawPoint(DrawPoint),
    StickyUpsert(StickyNote),
    Clear,
}

impl BoardEvent {
    pub const DRAW_POINT: &'static str = "draw-point";
    pub const STICKY_UPSERT: &'static str = "sticky-upsert";
    pub const CLEAR: &'static str = "clear";
    pub const EVENTS: [&'static str; 3] = [Self::DRAW_POINT, Self::STICKY_UPSERT, Self::CLEAR];

    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::DrawPoint(_) => Self::DRAW_POINT,
            BoardEvent::StickyUpsert(_) => Self::STICKY_UPSERT,
            BoardEvent::Clear => Self::CLEAR,
        }
    }
}

/// Events on a room's code topic. Edits carry the full new content of the
/// file; the last write for a file name wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "kebab-case")]
pub enum CodeEvent {
    FileAdd { name: String, content: String },
    FileEdit { name: String, content: String },
    FileDelete { name: String },
    LanguageChange { name: String, language: String },
}

impl CodeEvent {
    pub const FILE_ADD: &'static str = "file-add";
    pub const FILE_EDIT: &'static str = "file-edit";
    pub const FILE_DELETE: &'static str = "file-delete";
    pub const LANGUAGE_CHANGE: &'static str = "language-change";
    pub const EVENTS: [&'static str; 4] = [
        Self::FILE_ADD,
        Self::FILE_EDIT,
        Self::FILE_DELETE,
        Self::LANGUAGE_CHANGE,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CodeEvent::FileAdd { .. } => Self::FILE_ADD,
            CodeEvent::FileEdit { .. } => Self::FILE_EDIT,
            CodeEvent::FileDelete { .. } => Self::FILE_DELETE,
            CodeEvent::LanguageChange { .. } => Self::LANGUAGE_CHANGE,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            CodeEvent::FileAdd { name, .. }
            | CodeEvent::FileEdit { name, .. }
            | CodeEvent::FileDelete { name }
            | CodeEvent::LanguageChange { name, .. } => name,
        }
    }
}
