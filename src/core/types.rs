use serde::{Deserialize, Serialize};

/// Index of an entry in the TileMap
pub type TilePosition = usize;

/// Whether both allele copies carry the same variant combination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zygosity {
    Het,
    Hom,
}

impl Zygosity {
    /// Key prefix character: `x` for het, `_` for hom
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::Het => 'x',
            Self::Hom => '_',
        }
    }

    #[must_use]
    pub fn from_prefix(c: char) -> Option<Self> {
        match c {
            'x' => Some(Self::Het),
            '_' => Some(Self::Hom),
            _ => None,
        }
    }
}

/// Primary calls versus the alternate (gap-bearing) subclass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subclass {
    Primary,
    Alt,
}

impl Subclass {
    /// Key subclass character: `.` for primary, `*` for alt
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Primary => '.',
            Self::Alt => '*',
        }
    }

    #[must_use]
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Primary),
            '*' => Some(Self::Alt),
            _ => None,
        }
    }
}

/// The zygosity/subclass pair that labels a TileMap entry.
///
/// Persisted labels are `het`, `het*`, `hom` and `hom*`; the `-alt` spellings
/// are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZygosityClass {
    pub zygosity: Zygosity,
    pub subclass: Subclass,
}

impl ZygosityClass {
    pub const HET: Self = Self::new(Zygosity::Het, Subclass::Primary);
    pub const HET_ALT: Self = Self::new(Zygosity::Het, Subclass::Alt);
    pub const HOM: Self = Self::new(Zygosity::Hom, Subclass::Primary);
    pub const HOM_ALT: Self = Self::new(Zygosity::Hom, Subclass::Alt);

    #[must_use]
    pub const fn new(zygosity: Zygosity, subclass: Subclass) -> Self {
        Self { zygosity, subclass }
    }

    /// Parse a persisted type label
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "het" => Some(Self::HET),
            "het*" | "het-alt" => Some(Self::HET_ALT),
            "hom" => Some(Self::HOM),
            "hom*" | "hom-alt" => Some(Self::HOM_ALT),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_hom(self) -> bool {
        self.zygosity == Zygosity::Hom
    }
}

impl std::fmt::Display for ZygosityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let base = match self.zygosity {
            Zygosity::Het => "het",
            Zygosity::Hom => "hom",
        };
        match self.subclass {
            Subclass::Primary => write!(f, "{base}"),
            Subclass::Alt => write!(f, "{base}*"),
        }
    }
}

impl Serialize for ZygosityClass {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZygosityClass {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown tile map type '{label}'")))
    }
}

/// Reserved call-string characters that never denote a TileMap position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentinelKind {
    /// No call at this step (`-`)
    Gap,
    /// Wholly unknown, or covered by a call anchored at an earlier step (`*`)
    Wildcard,
    /// Escape to the overflow tiers (`#`)
    Overflow,
    /// Reserved for future use (`^`)
    Reserved,
}

impl std::fmt::Display for SentinelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gap => write!(f, "gap"),
            Self::Wildcard => write!(f, "wildcard"),
            Self::Overflow => write!(f, "overflow"),
            Self::Reserved => write!(f, "reserved"),
        }
    }
}
