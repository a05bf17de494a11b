//! Track metadata: the `id parent begin end` records of a lineage file.

use crate::label::{Frame, Label};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

/// One track record.
///
/// Within a dataset the track id doubles as the pixel label of every object
/// on the track. `parent == 0` marks a root track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    pub id: Label,
    pub parent: Label,
    pub begin: Frame,
    pub end: Frame,
}

impl Track {
    pub fn new(id: Label, parent: Label, begin: Frame, end: Frame) -> Self {
        Self {
            id,
            parent,
            begin,
            end,
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent == 0
    }

    #[inline]
    pub fn contains(&self, frame: Frame) -> bool {
        self.begin <= frame && frame <= self.end
    }

    /// Number of frames covered by the track; zero for an inverted range.
    #[inline]
    pub fn len(&self) -> u32 {
        if self.end < self.begin {
            0
        } else {
            (self.end - self.begin).saturating_add(1)
        }
    }

    /// Frames of the track that are not later than `last`.
    #[inline]
    pub fn frames_until(&self, last: Frame) -> RangeInclusive<Frame> {
        self.begin..=self.end.min(last)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors raised while reading a track file.
#[derive(thiserror::Error, Debug)]
pub enum TrackFileError {
    #[error("failed to read track file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected 4 non-negative integers, got {got} field(s)")]
    FieldCount { line: usize, got: usize },
    #[error("line {line}: '{value}' is not a valid {field}")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// Ordered track records of one dataset.
///
/// Records are kept in file order, duplicates included, so that consistency
/// checks can see them. Lookups by id return the first record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Track>", into = "Vec<Track>")]
pub struct TrackSet {
    tracks: Vec<Track>,
    index: HashMap<Label, usize>,
}

impl From<Vec<Track>> for TrackSet {
    fn from(tracks: Vec<Track>) -> Self {
        let mut index = HashMap::with_capacity(tracks.len());
        for (i, t) in tracks.iter().enumerate() {
            index.entry(t.id).or_insert(i);
        }
        Self { tracks, index }
    }
}

impl From<TrackSet> for Vec<Track> {
    fn from(set: TrackSet) -> Self {
        set.tracks
    }
}

impl FromIterator<Track> for TrackSet {
    fn from_iter<I: IntoIterator<Item = Track>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl TrackSet {
    /// Parse the plain-text format: one `id parent begin end` record per line.
    ///
    /// Blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, TrackFileError> {
        let mut tracks = Vec::new();
        for (n, raw) in text.lines().enumerate() {
            let line = n + 1;
            let fields: Vec<&str> = raw.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            if fields.len() != 4 {
                return Err(TrackFileError::FieldCount {
                    line,
                    got: fields.len(),
                });
            }
            let id = parse_field::<Label>(line, "track id", fields[0])?;
            let parent = parse_field::<Label>(line, "parent id", fields[1])?;
            let begin = parse_field::<Frame>(line, "start frame", fields[2])?;
            let end = parse_field::<Frame>(line, "end frame", fields[3])?;
            if id == 0 {
                return Err(TrackFileError::InvalidField {
                    line,
                    field: "track id",
                    value: fields[0].to_string(),
                });
            }
            tracks.push(Track::new(id, parent, begin, end));
        }
        Ok(Self::from(tracks))
    }

    /// Read and parse a track file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TrackFileError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| TrackFileError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Serialise back to the plain-text format.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for t in &self.tracks {
            out.push_str(&format!("{} {} {} {}\n", t.id, t.parent, t.begin, t.end));
        }
        out
    }

    #[inline]
    pub fn get(&self, id: Label) -> Option<&Track> {
        self.index.get(&id).map(|&i| &self.tracks[i])
    }

    #[inline]
    pub fn contains_id(&self, id: Label) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Track> {
        self.tracks.iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[Track] {
        &self.tracks
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Records naming `parent` as their parent, in file order.
    pub fn children_of(&self, parent: Label) -> impl Iterator<Item = &Track> + '_ {
        self.tracks
            .iter()
            .filter(move |t| parent != 0 && t.parent == parent)
    }

    /// Largest end frame over all records.
    pub fn last_frame(&self) -> Option<Frame> {
        self.tracks.iter().map(|t| t.end).max()
    }
}

impl<'a> IntoIterator for &'a TrackSet {
    type Item = &'a Track;
    type IntoIter = std::slice::Iter<'a, Track>;

    fn into_iter(self) -> Self::IntoIter {
        self.tracks.iter()
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    field: &'static str,
    value: &str,
) -> Result<T, TrackFileError> {
    value.parse().map_err(|_| TrackFileError::InvalidField {
        line,
        field,
        value: value.to_string(),
    })
}
