//! Open-item state for the sheet modal.

use serde::Serialize;

use crate::category::FileRef;
use crate::pitch::{PitchClass, NOTE_NAMES};
use crate::render::{render, RenderedSheet};
use crate::transpose::semitones_between;

/// Label for a transposition offset: `"Original"`, `"+2"`, `"-1"`.
pub fn shift_label(shift: i32) -> String {
    if shift == 0 {
        "Original".to_string()
    } else {
        format!("{:+}", shift)
    }
}

/// One column of the note reference bar shown over image sheets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteMapping {
    pub from: &'static str,
    pub to: &'static str,
}

/// Where each of the 12 notes lands after `shift`. Images cannot be
/// rewritten, so this is what the viewer offers instead. Empty at 0.
pub fn note_map(shift: i32) -> Vec<NoteMapping> {
    if shift == 0 {
        return Vec::new();
    }
    (0..NOTE_NAMES.len() as i32)
        .map(|i| {
            let from = PitchClass::new(i);
            NoteMapping {
                from: from.name(),
                to: from.shift(shift).name(),
            }
        })
        .collect()
}

/// A chord sheet opened for reading
#[derive(Debug, Clone)]
pub struct SheetViewer {
    file: FileRef,
    original: String,
    shift: i32,
}

impl SheetViewer {
    /// Open a sheet at its written key.
    pub fn open(file: FileRef, text: impl Into<String>) -> Self {
        Self {
            file,
            original: text.into(),
            shift: 0,
        }
    }

    pub fn file(&self) -> &FileRef {
        &self.file
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn shift(&self) -> i32 {
        self.shift
    }

    /// Step the shift by `delta` and re-render.
    pub fn change_transpose(&mut self, delta: i32) -> RenderedSheet {
        self.shift = self.shift.saturating_add(delta);
        self.render()
    }

    pub fn reset(&mut self) -> RenderedSheet {
        self.shift = 0;
        self.render()
    }

    /// Set the shift that moves `from` to `to` (upwards, 0..=11). Unknown
    /// notes leave the shift unchanged.
    pub fn transpose_to(&mut self, from: &str, to: &str) -> Option<RenderedSheet> {
        self.shift = semitones_between(from, to)?;
        Some(self.render())
    }

    pub fn label(&self) -> String {
        shift_label(self.shift)
    }

    pub fn render(&self) -> RenderedSheet {
        render(&self.original, self.shift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn viewer() -> SheetViewer {
        SheetViewer::open(FileRef::new("f1", "Hino.txt", "text/plain"), "G D Em C")
    }

    #[test]
    fn test_labels() {
        assert_eq!(shift_label(0), "Original");
        assert_eq!(shift_label(2), "+2");
        assert_eq!(shift_label(-1), "-1");
        assert_eq!(shift_label(13), "+13");
    }

    #[test]
    fn test_steps_accumulate() {
        let mut viewer = viewer();
        assert_eq!(viewer.label(), "Original");
        viewer.change_transpose(1);
        let sheet = viewer.change_transpose(1);
        assert_eq!(viewer.label(), "+2");
        assert_eq!(sheet.to_plain_text(), "A E F#m D");

        viewer.change_transpose(-3);
        assert_eq!(viewer.label(), "-1");
        assert_eq!(viewer.render().to_plain_text(), "F# C# D#m B");

        assert_eq!(viewer.reset().to_plain_text(), "G D Em C");
    }

    #[test]
    fn test_reopening_resets_shift() {
        let mut viewer = viewer();
        viewer.change_transpose(5);
        let viewer = SheetViewer::open(viewer.file().clone(), viewer.original().to_string());
        assert_eq!(viewer.shift(), 0);
    }

    #[test]
    fn test_transpose_to_key() {
        let mut viewer = viewer();
        let sheet = viewer.transpose_to("G", "A").unwrap();
        assert_eq!(viewer.shift(), 2);
        assert_eq!(sheet.to_plain_text(), "A E F#m D");
        assert!(viewer.transpose_to("G", "H").is_none());
        assert_eq!(viewer.shift(), 2);
    }

    #[test]
    fn test_note_map() {
        assert!(note_map(0).is_empty());
        let map = note_map(-1);
        assert_eq!(map.len(), 12);
        assert_eq!(map[0], NoteMapping { from: "C", to: "B" });
        assert_eq!(map[11], NoteMapping { from: "B", to: "A#" });
        assert!(note_map(12).iter().all(|m| m.from == m.to));
    }
}
