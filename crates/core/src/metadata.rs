use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MediaFile {
    pub path: PathBuf,
    pub file_name: String,
    pub extension: Option<String>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|v| v.to_string_lossy().to_string());
        Self {
            path,
            file_name,
            extension,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CaptureDate {
    pub year: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

/// Capability that yields a capture date for a file. Implementations swallow
/// their own I/O and parse failures and answer `None`.
pub trait DateSource {
    fn extract_date(&self, path: &Path) -> Option<CaptureDate>;
}

/// Turns a tag value such as `2024:01:15 10:30:00` into a capture date.
/// Anything that is not a real calendar date yields `None`.
pub fn parse_capture_date(raw: &str) -> Option<CaptureDate> {
    let date_part = raw
        .trim()
        .trim_end_matches('\0')
        .split([' ', 'T'])
        .next()?;
    let date = date_part.replace(':', "-");

    // Fixed width keeps "2024-1-5" style values out of folder names.
    if date.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(&date, "%Y-%m-%d").ok()?;

    let year = date.get(..4)?.to_string();
    Some(CaptureDate { year, date })
}
