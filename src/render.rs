//! # Text Renderer
//!
//! Turns a whole chord sheet into a [`RenderedSheet`]: literal text kept
//! byte-for-byte, chords transposed and tagged with what they were before.
//!
//! The result is markup-agnostic. [`RenderedSheet::to_html`] produces the
//! span-annotated form the browser viewer shows; [`RenderedSheet::to_plain_text`]
//! produces the transposed sheet as plain text.
//!
//! ```rust
//! use songbook::{render, RenderedSegment};
//!
//! let sheet = render("C G Am F", 2);
//! assert_eq!(sheet.to_plain_text(), "D A Bm G");
//! assert_eq!(
//!     sheet.segments[0],
//!     RenderedSegment::Chord { text: "D".into(), original: Some("C".into()), offset: 0 }
//! );
//! ```

use serde::Serialize;

use crate::chord::{tokenize, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RenderedSegment {
    /// Non-chord text, unchanged
    Text { text: String },
    /// A chord in the current key. `original` is set only when transposition
    /// changed its spelling.
    Chord {
        text: String,
        original: Option<String>,
        offset: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSheet {
    pub shift: i32,
    pub segments: Vec<RenderedSegment>,
}

/// Render `text` transposed by `shift` semitones.
///
/// Pure: the same `(text, shift)` always gives an identical result.
pub fn render(text: &str, shift: i32) -> RenderedSheet {
    let segments = tokenize(text)
        .map(|segment| match segment {
            Segment::Literal(literal) => RenderedSegment::Text {
                text: literal.to_string(),
            },
            Segment::Chord(chord) => {
                let current = chord.transposed(shift);
                let original = (current != chord.as_str()).then(|| chord.as_str().to_string());
                RenderedSegment::Chord {
                    text: current,
                    original,
                    offset: chord.offset(),
                }
            }
        })
        .collect();

    RenderedSheet { shift, segments }
}

impl RenderedSheet {
    /// Chords in order of appearance, in the current key
    pub fn chords(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            RenderedSegment::Chord { text, .. } => Some(text.as_str()),
            RenderedSegment::Text { .. } => None,
        })
    }

    /// The sheet in the current key with no annotation
    pub fn to_plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| match segment {
                RenderedSegment::Text { text } | RenderedSegment::Chord { text, .. } => text.as_str(),
            })
            .collect()
    }

    /// HTML fragment for a `white-space: pre` container.
    ///
    /// Every chord is wrapped in `<span class="chord">`. A transposed chord is
    /// additionally wrapped with a hidden `chord-original` span holding its
    /// previous spelling.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for segment in &self.segments {
            match segment {
                RenderedSegment::Text { text } => html.push_str(&escape_html(text)),
                RenderedSegment::Chord {
                    text,
                    original: None,
                    ..
                } => {
                    html.push_str(&format!("<span class=\"chord\">{}</span>", escape_html(text)));
                }
                RenderedSegment::Chord {
                    text,
                    original: Some(original),
                    ..
                } => {
                    html.push_str("<span class=\"chord-overlay\">");
                    html.push_str(&format!(
                        "<span class=\"chord transposed\">{}</span>",
                        escape_html(text)
                    ));
                    html.push_str(&format!(
                        "<span class=\"chord-original\">{}</span>",
                        escape_html(original)
                    ));
                    html.push_str("</span>");
                }
            }
        }
        html
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{PitchClass, NOTE_NAMES};
    use crate::transpose::transpose_note;
    use pretty_assertions::assert_eq;

    const EXTENSIONS: &[&str] = &["m7b5", "7sus4", "13", "m11"];

    #[test]
    fn test_progression_up_a_tone() {
        let sheet = render("C G Am F", 2);
        assert_eq!(sheet.chords().collect::<Vec<_>>(), vec!["D", "A", "Bm", "G"]);
        assert_eq!(sheet.to_plain_text(), "D A Bm G");
    }

    #[test]
    fn test_shift_zero_marks_without_original() {
        let sheet = render("Em  C\nletra", 0);
        assert_eq!(
            sheet.segments,
            vec![
                RenderedSegment::Chord { text: "Em".into(), original: None, offset: 0 },
                RenderedSegment::Text { text: "  ".into() },
                RenderedSegment::Chord { text: "C".into(), original: None, offset: 4 },
                RenderedSegment::Text { text: "\nletra".into() },
            ]
        );
        assert_eq!(
            sheet.to_html(),
            "<span class=\"chord\">Em</span>  <span class=\"chord\">C</span>\nletra"
        );
    }

    #[test]
    fn test_transposed_html_carries_original() {
        let html = render("G", -2).to_html();
        assert_eq!(
            html,
            "<span class=\"chord-overlay\"><span class=\"chord transposed\">F</span>\
             <span class=\"chord-original\">G</span></span>"
        );
    }

    #[test]
    fn test_full_octave_is_unannotated() {
        let sheet = render("Bb F", 12);
        assert!(sheet
            .segments
            .iter()
            .all(|s| !matches!(s, RenderedSegment::Chord { original: Some(_), .. })));
    }

    #[test]
    fn test_no_chords_passes_through() {
        let text = "só letra, sem acordes\n\n  fim  ";
        for shift in [0, 3, -5] {
            let sheet = render(text, shift);
            assert_eq!(sheet.chords().count(), 0);
            assert_eq!(sheet.to_plain_text(), text);
            assert_eq!(sheet.to_html(), text);
        }
    }

    #[test]
    fn test_whitespace_and_line_breaks_preserved() {
        let text = "  C   G/B\r\n\tAm\n";
        let sheet = render(text, 5);
        assert_eq!(sheet.to_plain_text(), "  F   C/B\r\n\tDm\n");
    }

    #[test]
    fn test_render_is_repeatable() {
        let text = "Intro: D A Bm G (x2)";
        assert_eq!(render(text, 3), render(text, 3));
        assert_eq!(render(text, 3).to_html(), render(text, 3).to_html());
    }

    #[test]
    fn test_html_escapes_literal_text() {
        let html = render("<b>C</b> & D", 0).to_html();
        assert_eq!(
            html,
            "&lt;b&gt;<span class=\"chord\">C</span>&lt;/b&gt; &amp; <span class=\"chord\">D</span>"
        );
    }

    #[test]
    fn test_sharp_roots_keep_unknown_extensions() {
        assert_eq!(render("C#m7b5", 1).to_plain_text(), "Dm7b5");
        assert_eq!(render("F#7sus4", 1).to_plain_text(), "G7sus4");
        assert_eq!(render("F#13", -1).to_plain_text(), "F13");

        for root in NOTE_NAMES.iter().filter(|n| n.ends_with('#')) {
            let pitch = PitchClass::from_name(root).unwrap();
            for extension in EXTENSIONS {
                let text = format!("{}{}", root, extension);
                for shift in 1..12 {
                    let sheet = render(&text, shift);
                    let shifted = sheet.to_plain_text();
                    let chord = sheet.chords().next().unwrap();
                    assert_eq!(chord, pitch.shift(shift).name(), "{} {:+}", text, shift);
                    assert_eq!(shifted, format!("{}{}", chord, extension));

                    let back = transpose_note(&shifted, -shift);
                    assert_eq!(back, text);
                    // A natural root glued to letters reads as a word, so only
                    // sharp results go back through the tokenizer.
                    if chord.ends_with('#') {
                        assert_eq!(render(&shifted, -shift).to_plain_text(), text);
                    }
                }
            }
        }
    }
}
