//! # Chord Tokenizer
//!
//! Splits free-form chord-sheet text into chord symbols and literal spans.
//!
//! ## Chord Grammar
//! ```text
//! chord  = root quality? digit? bass?
//! root   = [A-G] ("#" | "b")?
//! quality = "m" | "maj" | "min" | "sus" | "dim" | "aug" | "add"
//! digit  = [0-9]
//! bass   = "/" [A-G] ("#" | "b")?
//! ```
//!
//! A chord must start at a word boundary and must not be followed by a word
//! character, so `Cm7` matches but the `C` in `Cabo` does not. Only uppercase
//! letters are roots. The grammar is deliberately loose: ordinary words that
//! happen to fit it (a lone `A`, `Dim`) are treated as chords.
//!
//! ## Example
//! ```rust
//! use songbook::{tokenize, Segment};
//!
//! let parts: Vec<Segment> = tokenize("Am7  D/F#\nla la").collect();
//! assert_eq!(parts.len(), 4);
//! assert!(matches!(parts[0], Segment::Chord(ref c) if c.root() == "A" && c.suffix() == "m7"));
//! assert_eq!(parts[1], Segment::Literal("  "));
//! assert!(matches!(parts[2], Segment::Chord(ref c) if c.as_str() == "D/F#"));
//! assert_eq!(parts[3], Segment::Literal("\nla la"));
//! ```

use std::sync::OnceLock;

use regex::{CaptureMatches, Regex};

use crate::pitch::PitchClass;

/// The trailing group ends the chord at a non-word character, the end of text,
/// or a word boundary. The match backs off to a shorter chord when the longer
/// one runs into a word, and the boundary after a `#` keeps `C#` whole in
/// `C#m7b5`.
const CHORD_PATTERN: &str =
    r"\b(?P<chord>[A-G](?:#|b)?(?:m|maj|min|sus|dim|aug|add)?[0-9]?(?:/[A-G](?:#|b)?)?)(?:\W|$|\b)";

fn chord_regex() -> &'static Regex {
    static CHORD_RE: OnceLock<Regex> = OnceLock::new();
    CHORD_RE.get_or_init(|| Regex::new(CHORD_PATTERN).expect("chord pattern is valid"))
}

/// A chord symbol found in source text: root plus an opaque suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordToken<'a> {
    text: &'a str,
    root_len: usize,
    pitch: PitchClass,
    offset: usize,
}

impl<'a> ChordToken<'a> {
    /// Read the root (`[A-G]` plus optional `#`/`b`) off the front of `text`.
    ///
    /// Everything after the root is kept as the suffix, unparsed. Returns `None`
    /// when `text` does not start with a root.
    pub fn parse(text: &'a str) -> Option<Self> {
        Self::parse_at(text, 0)
    }

    fn parse_at(text: &'a str, offset: usize) -> Option<Self> {
        let bytes = text.as_bytes();
        if !matches!(bytes.first(), Some(b'A'..=b'G')) {
            return None;
        }
        let root_len = match bytes.get(1) {
            Some(b'#') | Some(b'b') => 2,
            _ => 1,
        };
        let pitch = PitchClass::from_name(&text[..root_len])?;
        Some(ChordToken {
            text,
            root_len,
            pitch,
            offset,
        })
    }

    /// The full token as written
    pub fn as_str(&self) -> &'a str {
        self.text
    }

    /// Root as written, e.g. `"Bb"`
    pub fn root(&self) -> &'a str {
        &self.text[..self.root_len]
    }

    /// Everything after the root, e.g. `"m7/G#"`
    pub fn suffix(&self) -> &'a str {
        &self.text[self.root_len..]
    }

    pub fn pitch(&self) -> PitchClass {
        self.pitch
    }

    /// Byte offset of the token in the tokenized text (0 for [`ChordToken::parse`])
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// One piece of tokenized text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Chord(ChordToken<'a>),
    Literal(&'a str),
}

impl<'a> Segment<'a> {
    /// The source text this segment covers
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Chord(chord) => chord.as_str(),
            Segment::Literal(text) => text,
        }
    }
}

/// Lazy iterator over the [`Segment`]s of a text.
///
/// Concatenating `as_str()` of every segment reproduces the input exactly.
pub struct Tokens<'a> {
    text: &'a str,
    position: usize,
    pending: Option<ChordToken<'a>>,
    matches: CaptureMatches<'static, 'a>,
}

/// Tokenize `text` into chords and literal spans.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens {
        text,
        position: 0,
        pending: None,
        matches: chord_regex().captures_iter(text),
    }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(chord) = self.pending.take() {
            return Some(Segment::Chord(chord));
        }

        while let Some(captures) = self.matches.next() {
            let Some(found) = captures.name("chord") else {
                continue;
            };
            let Some(chord) = ChordToken::parse_at(found.as_str(), found.start()) else {
                continue;
            };

            let literal = &self.text[self.position..found.start()];
            self.position = found.end();
            if literal.is_empty() {
                return Some(Segment::Chord(chord));
            }
            self.pending = Some(chord);
            return Some(Segment::Literal(literal));
        }

        if self.position < self.text.len() {
            let rest = &self.text[self.position..];
            self.position = self.text.len();
            return Some(Segment::Literal(rest));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chords(text: &str) -> Vec<&str> {
        tokenize(text)
            .filter_map(|segment| match segment {
                Segment::Chord(chord) => Some(chord.as_str()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_simple_progression() {
        assert_eq!(chords("C G Am F"), vec!["C", "G", "Am", "F"]);
    }

    #[test]
    fn test_qualities_extensions_and_bass() {
        assert_eq!(
            chords("Cmaj7 Dsus4 Edim Faug Gadd9 Bbm7 C#m D/F# Ab/Eb"),
            vec!["Cmaj7", "Dsus4", "Edim", "Faug", "Gadd9", "Bbm7", "C#m", "D/F#", "Ab/Eb"]
        );
    }

    #[test]
    fn test_sharp_before_space_and_end_of_text() {
        assert_eq!(chords("F# C#"), vec!["F#", "C#"]);
        assert_eq!(chords("(A#)"), vec!["A#"]);
    }

    #[test]
    fn test_sharp_root_before_unknown_extension() {
        for text in ["C#m7b5", "F#7sus4", "F#13", "G#m11"] {
            let found: Vec<_> = tokenize(text)
                .filter_map(|segment| match segment {
                    Segment::Chord(chord) => Some(chord),
                    Segment::Literal(_) => None,
                })
                .collect();
            assert_eq!(found.len(), 1, "{}", text);
            assert_eq!(found[0].root(), &text[..2]);
            assert_eq!(found[0].offset(), 0);
        }
        assert_eq!(chords("A#m9b13 x"), vec!["A#"]);
    }

    #[test]
    fn test_ignores_words_and_lowercase() {
        assert!(chords("Cabo da Esperança").is_empty());
        assert!(chords("cm am g").is_empty());
        assert!(chords("ABC").is_empty());
        assert!(chords("C11").is_empty());
    }

    #[test]
    fn test_backs_off_to_shorter_chord_before_punctuation() {
        assert_eq!(chords("C/x"), vec!["C"]);
        assert_eq!(chords("G, D."), vec!["G", "D"]);
    }

    #[test]
    fn test_roundtrip_covers_input() {
        let text = "Intro: C  G/B\n\tAm - F (2x)\nÉ tudo Dm7!";
        let rebuilt: String = tokenize(text).map(|s| s.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn test_offsets_point_into_source() {
        let text = "x Em y Bb";
        for segment in tokenize(text) {
            if let Segment::Chord(chord) = segment {
                assert_eq!(&text[chord.offset()..chord.offset() + chord.as_str().len()], chord.as_str());
            }
        }
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(tokenize("").count(), 0);
    }

    #[test]
    fn test_parse_prefix() {
        let chord = ChordToken::parse("Bbm7/F").unwrap();
        assert_eq!(chord.root(), "Bb");
        assert_eq!(chord.suffix(), "m7/F");
        assert_eq!(chord.pitch().name(), "A#");
        assert!(ChordToken::parse("xyz").is_none());
        assert!(ChordToken::parse("").is_none());
    }
}
