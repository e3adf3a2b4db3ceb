use roomcast_core::{BoardEvent, DrawPoint, StickyNote};
use std::collections::BTreeMap;

/// Whiteboard state rebuilt from events: the stroke log in arrival order
/// and the sticky notes by id.
#[derive(Debug, Clone, Default)]
pub struct Board {
    strokes: Vec<DrawPoint>,
    stickies: BTreeMap<String, StickyNote>,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &BoardEvent) {
        match event {
            BoardEvent::DrawPoint(point) => self.strokes.push(point.clone()),
            BoardEvent::StickyUpsert(note) => {
                self.stickies.insert(note.id.clone(), note.clone());
            }
            BoardEvent::Clear => {
                self.strokes.clear();
                self.stickies.clear();
            }
        }
    }

    pub fn strokes(&self) -> &[DrawPoint] {
        &self.strokes
    }

    pub fn stickies(&self) -> impl Iterator<Item = &StickyNote> {
        self.stickies.values()
    }

    pub fn sticky(&self, id: &str) -> Option<&StickyNote> {
        self.stickies.get(id)
    }
}
