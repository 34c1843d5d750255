//! Pitch classes and the fixed sharp-spelled note table.

use std::fmt;

/// Canonical note names, sharp spelling only. Index = semitones above C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the 12 chromatic pitch classes (0 = C ... 11 = B)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PitchClass(u8);

impl PitchClass {
    /// Build from any integer, wrapping into `0..12`.
    pub fn new(index: i32) -> Self {
        PitchClass(index.rem_euclid(12) as u8)
    }

    /// Parse a root name: letter `A`-`G` plus an optional `#` or `b`.
    ///
    /// Flat spellings resolve to the same class as their sharp equivalent
    /// (`Bb` is `A#`), so every well-formed root maps to exactly one class.
    ///
    /// ```
    /// use songbook::PitchClass;
    ///
    /// assert_eq!(PitchClass::from_name("C").map(|p| p.index()), Some(0));
    /// assert_eq!(PitchClass::from_name("Bb"), PitchClass::from_name("A#"));
    /// assert_eq!(PitchClass::from_name("H"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let mut chars = name.chars();
        let base: i32 = match chars.next()? {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };
        let accidental = match chars.next() {
            None => 0,
            Some('#') => 1,
            Some('b') => -1,
            Some(_) => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(PitchClass::new(base + accidental))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// Sharp-spelled name from [`NOTE_NAMES`].
    pub fn name(self) -> &'static str {
        NOTE_NAMES[self.0 as usize]
    }

    /// Move by `semitones`, wrapping in both directions.
    pub fn shift(self, semitones: i32) -> Self {
        PitchClass::new(self.0 as i32 + semitones.rem_euclid(12))
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_chromatic() {
        for (i, name) in NOTE_NAMES.iter().enumerate() {
            let pc = PitchClass::from_name(name).unwrap();
            assert_eq!(pc.index() as usize, i);
            assert_eq!(pc.name(), *name);
        }
    }

    #[test]
    fn test_enharmonic_flats_and_edge_spellings() {
        assert_eq!(PitchClass::from_name("Db").unwrap().name(), "C#");
        assert_eq!(PitchClass::from_name("Cb").unwrap().name(), "B");
        assert_eq!(PitchClass::from_name("E#").unwrap().name(), "F");
        assert_eq!(PitchClass::from_name("B#").unwrap().name(), "C");
    }

    #[test]
    fn test_rejects_malformed_roots() {
        assert!(PitchClass::from_name("").is_none());
        assert!(PitchClass::from_name("c").is_none());
        assert!(PitchClass::from_name("Cm").is_none());
        assert!(PitchClass::from_name("C##").is_none());
    }

    #[test]
    fn test_shift_wraps_negative_and_large() {
        let b = PitchClass::from_name("B").unwrap();
        assert_eq!(b.shift(1).name(), "C");
        assert_eq!(PitchClass::new(0).shift(-1).name(), "B");
        assert_eq!(PitchClass::new(0).shift(-13).name(), "B");
        assert_eq!(PitchClass::new(3).shift(i32::MAX).index(), 10);
        assert_eq!(PitchClass::new(-25).name(), "B");
    }
}
