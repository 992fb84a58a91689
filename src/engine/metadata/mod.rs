//! Tag editing.
//!
//! A flat, string-keyed view over a file's tags. Well-known fields are
//! addressed either by their iTunes atom name (`©nam`, `trkn`, ...) or by a
//! plain name (`title`, `tracknumber`, ...); any other key is kept as a
//! free-form item. Track and disk numbers travel as `"N"` or `"N/M"`.

pub mod lofty_store;

use std::fmt;
use std::str::FromStr;

pub use lofty_store::LoftyStore;

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("unable to read tags: {0}")]
    Read(String),

    #[error("unable to write tags: {0}")]
    Write(String),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: String, value: String },

    #[error("{key} cannot be stored in this file's tag format")]
    Unsupported { key: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagKey {
    Title,
    Artist,
    Writer,
    Album,
    Year,
    Tool,
    Comment,
    Genre,
    Grouping,
    TrackNumber,
    DiskNumber,
    Compilation,
    Tempo,
    CoverArt,
    FreeForm(String),
}

impl TagKey {
    pub const WELL_KNOWN: [TagKey; 14] = [
        TagKey::Title,
        TagKey::Artist,
        TagKey::Writer,
        TagKey::Album,
        TagKey::Year,
        TagKey::Tool,
        TagKey::Comment,
        TagKey::Genre,
        TagKey::Grouping,
        TagKey::TrackNumber,
        TagKey::DiskNumber,
        TagKey::Compilation,
        TagKey::Tempo,
        TagKey::CoverArt,
    ];

    pub fn parse(key: &str) -> Self {
        match key {
            "©nam" => return TagKey::Title,
            "©ART" => return TagKey::Artist,
            "©wrt" => return TagKey::Writer,
            "©alb" => return TagKey::Album,
            "©day" => return TagKey::Year,
            "©too" => return TagKey::Tool,
            "©cmt" => return TagKey::Comment,
            "©gen" | "gnre" => return TagKey::Genre,
            "©grp" => return TagKey::Grouping,
            "trkn" => return TagKey::TrackNumber,
            "disk" => return TagKey::DiskNumber,
            "cpil" => return TagKey::Compilation,
            "tmpo" => return TagKey::Tempo,
            "covr" => return TagKey::CoverArt,
            _ => {}
        }

        match key.to_ascii_lowercase().as_str() {
            "title" => TagKey::Title,
            "artist" => TagKey::Artist,
            "writer" | "composer" => TagKey::Writer,
            "album" => TagKey::Album,
            "year" | "date" => TagKey::Year,
            "tool" | "encoder" => TagKey::Tool,
            "comment" => TagKey::Comment,
            "genre" => TagKey::Genre,
            "grouping" => TagKey::Grouping,
            "track" | "tracknumber" => TagKey::TrackNumber,
            "disc" | "discnumber" | "disknumber" => TagKey::DiskNumber,
            "compilation" => TagKey::Compilation,
            "tempo" | "bpm" => TagKey::Tempo,
            "cover" | "coverart" => TagKey::CoverArt,
            _ => TagKey::FreeForm(key.to_string()),
        }
    }

    /// Canonical atom name; free-form keys keep their own name.
    pub fn atom(&self) -> &str {
        match self {
            TagKey::Title => "©nam",
            TagKey::Artist => "©ART",
            TagKey::Writer => "©wrt",
            TagKey::Album => "©alb",
            TagKey::Year => "©day",
            TagKey::Tool => "©too",
            TagKey::Comment => "©cmt",
            TagKey::Genre => "©gen",
            TagKey::Grouping => "©grp",
            TagKey::TrackNumber => "trkn",
            TagKey::DiskNumber => "disk",
            TagKey::Compilation => "cpil",
            TagKey::Tempo => "tmpo",
            TagKey::CoverArt => "covr",
            TagKey::FreeForm(name) => name,
        }
    }
}

impl From<&str> for TagKey {
    fn from(key: &str) -> Self {
        TagKey::parse(key)
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.atom())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    Text(String),
    Binary(Vec<u8>),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(text) => Some(text),
            TagValue::Binary(_) => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TagValue::Text(text) => text.as_bytes(),
            TagValue::Binary(bytes) => bytes,
        }
    }
}

impl From<&str> for TagValue {
    fn from(text: &str) -> Self {
        TagValue::Text(text.to_string())
    }
}

impl From<String> for TagValue {
    fn from(text: String) -> Self {
        TagValue::Text(text)
    }
}

impl From<Vec<u8>> for TagValue {
    fn from(bytes: Vec<u8>) -> Self {
        TagValue::Binary(bytes)
    }
}

/// A track or disk position, optionally with the set's total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberPair {
    pub number: u32,
    pub total: Option<u32>,
}

impl FromStr for NumberPair {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((number, total)) => {
                let total: u32 = total.trim().parse()?;
                Ok(NumberPair {
                    number: number.trim().parse()?,
                    total: (total > 0).then_some(total),
                })
            }
            None => Ok(NumberPair {
                number: s.trim().parse()?,
                total: None,
            }),
        }
    }
}

impl fmt::Display for NumberPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{}/{}", self.number, total),
            None => write!(f, "{}", self.number),
        }
    }
}

/// Parses a compilation flag: `"0"` and `"n"` are false, anything else true.
pub fn parse_flag(value: &str) -> bool {
    !matches!(value.trim(), "0" | "n" | "N")
}

/// Read/write access to one file's tags.
pub trait MetadataStore {
    fn get(&self, key: &str) -> Option<TagValue>;

    fn set(&mut self, key: &str, value: TagValue) -> Result<(), TagError>;

    fn remove(&mut self, key: &str);

    /// Atom names of well-known fields present, then free-form names.
    fn keys(&self) -> Vec<String>;

    /// Writes pending changes back to the file.
    fn save(&mut self) -> Result<(), TagError>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn set_text(&mut self, key: &str, value: &str) -> Result<(), TagError> {
        self.set(key, TagValue::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atoms_and_plain_names_agree() {
        assert_eq!(TagKey::parse("©nam"), TagKey::Title);
        assert_eq!(TagKey::parse("Title"), TagKey::Title);
        assert_eq!(TagKey::parse("trkn"), TagKey::TrackNumber);
        assert_eq!(TagKey::parse("tracknumber"), TagKey::TrackNumber);
        assert_eq!(TagKey::parse("gnre"), TagKey::Genre);
        assert_eq!(TagKey::parse("BPM"), TagKey::Tempo);
    }

    #[test]
    fn unknown_keys_are_free_form() {
        let key = TagKey::parse("MusicBrainz Track Id");
        assert_eq!(key, TagKey::FreeForm("MusicBrainz Track Id".into()));
        assert_eq!(key.atom(), "MusicBrainz Track Id");
    }

    #[test]
    fn every_well_known_atom_round_trips() {
        for key in TagKey::WELL_KNOWN.iter() {
            assert_eq!(&TagKey::parse(key.atom()), key);
        }
    }

    #[test]
    fn number_pairs() {
        let pair: NumberPair = "3/12".parse().unwrap();
        assert_eq!(pair, NumberPair { number: 3, total: Some(12) });
        assert_eq!(pair.to_string(), "3/12");

        let single: NumberPair = "7".parse().unwrap();
        assert_eq!(single.total, None);
        assert_eq!(single.to_string(), "7");

        let zero_total: NumberPair = "4/0".parse().unwrap();
        assert_eq!(zero_total.to_string(), "4");

        assert!("three".parse::<NumberPair>().is_err());
        assert!("3/".parse::<NumberPair>().is_err());
    }

    #[test]
    fn compilation_flags() {
        assert!(!parse_flag("0"));
        assert!(!parse_flag("n"));
        assert!(parse_flag("1"));
        assert!(parse_flag("yes"));
    }
}
