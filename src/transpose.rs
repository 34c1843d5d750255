use crate::chord::ChordToken;
use crate::pitch::PitchClass;

/// Whether a shift leaves every pitch class where it is
fn is_identity(semitones: i32) -> bool {
    semitones.rem_euclid(12) == 0
}

impl ChordToken<'_> {
    /// Rewrite the root `semitones` away, keeping the suffix byte-for-byte.
    ///
    /// The new root is always sharp-spelled. A slash bass is part of the suffix
    /// and is not moved.
    pub fn transposed(&self, semitones: i32) -> String {
        if is_identity(semitones) {
            return self.as_str().to_string();
        }
        let root = self.pitch().shift(semitones);
        format!("{}{}", root.name(), self.suffix())
    }
}

/// Transpose a single chord symbol by `semitones` (negative = down).
///
/// Text that does not start with a chord root comes back unchanged, and any
/// shift that is a multiple of 12 returns the input exactly.
///
/// # Examples
/// ```
/// use songbook::transpose_note;
///
/// assert_eq!(transpose_note("C", 2), "D");
/// assert_eq!(transpose_note("B", 1), "C");
/// assert_eq!(transpose_note("Am7", 3), "Cm7");
/// assert_eq!(transpose_note("Bb", 1), "B");
/// assert_eq!(transpose_note("D/F#", 2), "E/F#");
/// assert_eq!(transpose_note("x7", 5), "x7");
/// ```
pub fn transpose_note(token: &str, semitones: i32) -> String {
    match ChordToken::parse(token) {
        Some(chord) => chord.transposed(semitones),
        None => token.to_string(),
    }
}

/// Upward distance in semitones (0-11) from one root to another, e.g. to move
/// a song from its written key into a singer's key.
///
/// ```
/// use songbook::semitones_between;
///
/// assert_eq!(semitones_between("G", "A"), Some(2));
/// assert_eq!(semitones_between("A", "G"), Some(10));
/// assert_eq!(semitones_between("A", "Q"), None);
/// ```
pub fn semitones_between(from: &str, to: &str) -> Option<i32> {
    let from = PitchClass::from_name(from)?;
    let to = PitchClass::from_name(to)?;
    Some((to.index() as i32 - from.index() as i32).rem_euclid(12))
}
