use crate::metadata::{parse_capture_date, CaptureDate, DateSource};
use anyhow::{Context, Result};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// Capture time first, then the generic modification stamp.
const DATE_TAGS: &[Tag] = &[Tag::DateTimeOriginal, Tag::DateTime];

#[derive(Debug, Clone, Copy, Default)]
pub struct ExifDateReader;

impl DateSource for ExifDateReader {
    fn extract_date(&self, path: &Path) -> Option<CaptureDate> {
        match read_exif(path) {
            Ok(exif) => {
                let date = find_date(&exif);
                if date.is_none() {
                    debug!(path = %path.display(), "no usable date tag");
                }
                date
            }
            Err(err) => {
                warn!("Error reading metadata from {}: {:#}", path.display(), err);
                None
            }
        }
    }
}

fn read_exif(path: &Path) -> Result<Exif> {
    let file = File::open(path)
        .with_context(|| format!("could not open file: {}", path.display()))?;
    let mut buf = BufReader::new(file);
    Reader::new()
        .read_from_container(&mut buf)
        .with_context(|| format!("could not parse EXIF: {}", path.display()))
}

fn find_date(exif: &Exif) -> Option<CaptureDate> {
    DATE_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        parse_capture_date(&field_text(field, exif))
    })
}

// display_value() reformats date strings, so prefer the raw ASCII bytes.
fn field_text(field: &exif::Field, exif: &Exif) -> String {
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).to_string())
            .unwrap_or_default(),
        _ => field.display_value().with_unit(exif).to_string(),
    }
}
