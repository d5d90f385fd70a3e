use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Title prefix followed by a non-digit separator and an `sNNeNN` or `NxNN` marker.
static EPISODE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)\D(s\d+e\d+|\d+x\d+)").expect("valid episode pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no season/episode marker in {0:?}")]
    NotFound(String),
    #[error("empty series title in {0:?}")]
    EmptyTitle(String),
}

/// Normalized series title used as the directory name under the library root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey(String);

impl SeriesKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for SeriesKey {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Derives the series key from a file or folder basename.
///
/// The basename is lowercased, the text before the last season/episode
/// marker is kept, and every `.` in it becomes a space. Returns
/// [`ParseError::NotFound`] for names without a marker, which is the
/// normal outcome for artwork and sidecar files.
pub fn parse(basename: &str) -> Result<SeriesKey, ParseError> {
    let normalized = basename.to_lowercase();

    let captures = EPISODE_MARKER
        .captures(&normalized)
        .ok_or_else(|| ParseError::NotFound(basename.to_owned()))?;

    let title = captures
        .get(1)
        .map(|m| m.as_str().replace('.', " "))
        .unwrap_or_default();
    let title = title.trim();

    if title.is_empty() {
        return Err(ParseError::EmptyTitle(basename.to_owned()));
    }

    Ok(SeriesKey(title.to_owned()))
}

/// Series parser with fixed overrides for titles the marker pattern gets wrong.
///
/// An alias maps a lowercase basename prefix straight to a series key, e.g.
/// `timeless` to `timeless 2016` so a reboot does not share a directory with
/// the earlier series. Aliases are checked before the marker pattern.
#[derive(Debug, Clone, Default)]
pub struct SeriesNameParser {
    aliases: Vec<(String, SeriesKey)>,
}

impl SeriesNameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a parser from `(prefix, series)` pairs.
    ///
    /// Longer prefixes win over shorter ones that match the same name.
    pub fn with_aliases<I, P, S>(aliases: I) -> Self
    where
        I: IntoIterator<Item = (P, S)>,
        P: Into<String>,
        S: Into<String>,
    {
        let mut aliases: Vec<(String, SeriesKey)> = aliases
            .into_iter()
            .map(|(prefix, series)| {
                (
                    prefix.into().to_lowercase(),
                    SeriesKey(series.into().trim().to_lowercase()),
                )
            })
            .filter(|(prefix, series)| !prefix.is_empty() && !series.0.is_empty())
            .collect();
        aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self { aliases }
    }

    pub fn parse(&self, basename: &str) -> Result<SeriesKey, ParseError> {
        let normalized = basename.to_lowercase();
        if let Some((_, series)) = self
            .aliases
            .iter()
            .find(|(prefix, _)| normalized.starts_with(prefix.as_str()))
        {
            return Ok(series.clone());
        }

        parse(basename)
    }
}
