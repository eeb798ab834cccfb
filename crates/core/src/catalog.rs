use crate::metadata::{CaptureDate, DateSource, MediaFile};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub file: MediaFile,
    pub date: Option<CaptureDate>,
}

/// Reads each file's capture date exactly once.
pub fn scan_dates<S: DateSource>(files: Vec<MediaFile>, source: &S) -> Vec<ScannedFile> {
    files
        .into_iter()
        .map(|file| {
            let date = source.extract_date(&file.path);
            debug!(path = %file.path.display(), date = ?date.as_ref().map(|d| &d.date), "scanned");
            ScannedFile { file, date }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub date: String,
    pub files: Vec<PathBuf>,
}

/// Distinct capture dates in ascending order. Undated files are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCatalog {
    pub entries: Vec<CatalogEntry>,
}

impl DateCatalog {
    pub fn build(scanned: &[ScannedFile]) -> Self {
        let mut grouped = BTreeMap::<String, Vec<PathBuf>>::new();
        for item in scanned {
            if let Some(date) = &item.date {
                grouped
                    .entry(date.date.clone())
                    .or_default()
                    .push(item.file.path.clone());
            }
        }
        Self {
            entries: grouped
                .into_iter()
                .map(|(date, files)| CatalogEntry { date, files })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves 1-based indices to dates. Indices must come from `parse_selection`.
    pub fn dates_for(&self, indices: &BTreeSet<usize>) -> BTreeSet<String> {
        indices
            .iter()
            .filter_map(|i| i.checked_sub(1).and_then(|i| self.entries.get(i)))
            .map(|entry| entry.date.clone())
            .collect()
    }

    pub fn write_listing<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (i, entry) in self.entries.iter().enumerate() {
            let noun = if entry.files.len() == 1 { "file" } else { "files" };
            writeln!(out, "{:>3}. {} ({} {})", i + 1, entry.date, entry.files.len(), noun)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("selection is empty")]
    Empty,
    #[error("not a number: {0:?}")]
    InvalidToken(String),
    #[error("{index} is out of range (1-{max})")]
    OutOfRange { index: usize, max: usize },
    #[error("malformed range: {0:?}")]
    InvalidRange(String),
}

/// Parses `all`, or comma separated 1-based indices and inclusive `start-end`
/// ranges. A single bad token rejects the whole input.
pub fn parse_selection(input: &str, count: usize) -> Result<BTreeSet<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectionError::Empty);
    }
    if input.eq_ignore_ascii_case("all") {
        return Ok((1..=count).collect());
    }

    let mut selected = BTreeSet::new();
    for token in input.split(',') {
        let token = token.trim();
        if let Some((start, end)) = token.split_once('-') {
            let start = parse_index(start.trim(), token, count)?;
            let end = parse_index(end.trim(), token, count)?;
            if start > end {
                return Err(SelectionError::InvalidRange(token.to_string()));
            }
            selected.extend(start..=end);
        } else {
            let index = token
                .parse::<usize>()
                .map_err(|_| SelectionError::InvalidToken(token.to_string()))?;
            selected.insert(check_range(index, count)?);
        }
    }
    Ok(selected)
}

fn parse_index(value: &str, token: &str, count: usize) -> Result<usize, SelectionError> {
    let index = value
        .parse::<usize>()
        .map_err(|_| SelectionError::InvalidRange(token.to_string()))?;
    check_range(index, count)
}

fn check_range(index: usize, max: usize) -> Result<usize, SelectionError> {
    if index == 0 || index > max {
        return Err(SelectionError::OutOfRange { index, max });
    }
    Ok(index)
}

/// Shows the catalog and asks until the answer parses. `none` or end of input
/// returns an empty set, which callers treat as an abort.
pub fn prompt_selection<R: BufRead, W: Write>(
    catalog: &DateCatalog,
    input: &mut R,
    output: &mut W,
) -> io::Result<BTreeSet<String>> {
    if catalog.is_empty() {
        writeln!(output, "No dated files found.")?;
        return Ok(BTreeSet::new());
    }

    catalog.write_listing(output)?;
    loop {
        write!(
            output,
            "Select dates (e.g. 1,3 or 2-4, 'all', 'none' to cancel): "
        )?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(BTreeSet::new());
        }
        if line.trim().eq_ignore_ascii_case("none") {
            return Ok(BTreeSet::new());
        }

        match parse_selection(&line, catalog.len()) {
            Ok(indices) => return Ok(catalog.dates_for(&indices)),
            Err(err) => writeln!(output, "Invalid selection: {err}. Try again.")?,
        }
    }
}
