//! Music theory utilities for key matching
//!
//! Provides Camelot-wheel codes (`1A`..`12B`) and conversion from conventional
//! key names (`Am`, `C#`, `Bbm`) as returned by many key detectors.

use std::fmt;

/// Number of positions around the Camelot wheel
pub const WHEEL_SIZE: u8 = 12;

/// Mode half of a Camelot code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyMode {
    /// `A` side of the wheel (minor keys)
    Minor,
    /// `B` side of the wheel (major keys)
    Major,
}

impl KeyMode {
    /// Wheel letter for this mode
    pub fn letter(self) -> char {
        match self {
            KeyMode::Minor => 'A',
            KeyMode::Major => 'B',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(KeyMode::Minor),
            'B' => Some(KeyMode::Major),
            _ => None,
        }
    }
}

/// A position on the Camelot wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CamelotKey {
    number: u8,
    mode: KeyMode,
}

impl CamelotKey {
    /// Create a key from a wheel number (1-12) and mode
    pub fn new(number: u8, mode: KeyMode) -> Option<Self> {
        (1..=WHEEL_SIZE)
            .contains(&number)
            .then_some(Self { number, mode })
    }

    /// Parse a Camelot code (`"8A"`, `"12b"`) or a conventional key name (`"Am"`, `"F#"`)
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::parse_code(s).or_else(|| MusicalKey::parse(s).map(|k| k.camelot()))
    }

    fn parse_code(s: &str) -> Option<Self> {
        let mut chars = s.chars();
        let mode = KeyMode::from_letter(chars.next_back()?)?;
        let digits = chars.as_str();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let number: u8 = digits.parse().ok()?;
        Self::new(number, mode)
    }

    /// Wheel number (1-12)
    pub fn number(&self) -> u8 {
        self.number
    }

    /// Minor (A) or major (B)
    pub fn mode(&self) -> KeyMode {
        self.mode
    }

    /// Linear position 0..23: `1A`=0, `1B`=1, `2A`=2, ... `12B`=23
    pub fn wheel_position(&self) -> u8 {
        (self.number - 1) * 2
            + match self.mode {
                KeyMode::Minor => 0,
                KeyMode::Major => 1,
            }
    }

    /// Circle-of-fifths index 0..11 (mode collapsed)
    pub fn circle_index(&self) -> u8 {
        self.wheel_position() / 2
    }

    /// Shortest number of steps between two keys around the wheel (0..=6)
    pub fn circle_steps(&self, other: &CamelotKey) -> u8 {
        let diff = self.circle_index().abs_diff(other.circle_index());
        diff.min(WHEEL_SIZE - diff)
    }

    /// All 24 codes in wheel order
    pub fn all() -> impl Iterator<Item = CamelotKey> {
        (1..=WHEEL_SIZE).flat_map(|number| {
            [KeyMode::Minor, KeyMode::Major]
                .into_iter()
                .map(move |mode| CamelotKey { number, mode })
        })
    }
}

impl fmt::Display for CamelotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.number, self.mode.letter())
    }
}

/// Musical key with root note and scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalKey {
    /// Root note as semitone offset from C (0=C, 1=C#, 2=D, ..., 11=B)
    pub root: u8,
    /// true = minor, false = major
    pub minor: bool,
}

impl MusicalKey {
    /// Create a new musical key
    pub const fn new(root: u8, minor: bool) -> Self {
        Self {
            root: root % 12,
            minor,
        }
    }

    /// Parse key string like "Am", "C#m", "F", "Bb", "Ebmin", "Gmaj"
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let mut chars = s.chars().peekable();

        let base_root = match chars.next()?.to_ascii_uppercase() {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let root = match chars.peek() {
            Some('#') => {
                chars.next();
                (base_root + 1) % 12
            }
            Some('b') => {
                chars.next();
                (base_root + 11) % 12
            }
            _ => base_root,
        };

        let suffix: String = chars.collect::<String>().trim().to_lowercase();
        let minor = match suffix.as_str() {
            "" | "maj" | "major" => false,
            "m" | "min" | "minor" => true,
            _ => return None,
        };

        Some(Self { root, minor })
    }

    /// Get the Camelot wheel position
    ///
    /// Major keys (B): C=8, G=9, D=10, A=11, E=12, B=1, F#=2, Db=3, Ab=4, Eb=5, Bb=6, F=7
    /// Minor keys (A): Am=8, Em=9, Bm=10, F#m=11, C#m=12, G#m=1, D#m=2, Bbm=3, Fm=4, Cm=5, Gm=6, Dm=7
    pub fn camelot(&self) -> CamelotKey {
        const CAMELOT_MAJOR: [u8; 12] = [8, 3, 10, 5, 12, 7, 2, 9, 4, 11, 6, 1];
        const CAMELOT_MINOR: [u8; 12] = [5, 12, 7, 2, 9, 4, 11, 6, 1, 8, 3, 10];

        let (number, mode) = if self.minor {
            (CAMELOT_MINOR[self.root as usize], KeyMode::Minor)
        } else {
            (CAMELOT_MAJOR[self.root as usize], KeyMode::Major)
        };
        CamelotKey { number, mode }
    }
}
