use crate::metadata::MediaFile;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const MEDIA_EXTENSIONS: &[&str] = &[
    // images
    "jpg", "jpeg", "jpe", "png", "gif", "bmp", "tif", "tiff", "heic", "heif", "avif", "webp",
    // raw
    "dng", "cr2", "cr3", "crw", "nef", "nrw", "arw", "srf", "sr2", "raf", "orf", "rw2", "pef",
    "srw", "x3f", "3fr", "iiq", "erf", "kdc", "mrw", "rwl",
    // video
    "mp4", "m4v", "mov", "avi", "mts", "m2ts", "mkv", "3gp", "mxf", "wmv", "mpg", "mpeg",
    // vfx
    "exr", "dpx", "hdr", "cin",
];

#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    pub recursive: bool,
    /// `None` accepts every file; otherwise lowercase extensions without dots.
    pub allowed_extensions: Option<Vec<String>>,
}

impl CollectOptions {
    pub fn media_only(recursive: bool, extra_extensions: &[String]) -> Self {
        let mut allowed: Vec<String> = MEDIA_EXTENSIONS.iter().map(|v| v.to_string()).collect();
        allowed.extend(
            extra_extensions
                .iter()
                .map(|v| v.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|v| !v.is_empty()),
        );
        Self {
            recursive,
            allowed_extensions: Some(allowed),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub files: Vec<MediaFile>,
    pub scanned_files: usize,
    pub skipped_unsupported: usize,
    /// Folders or entries that could not be read; the walk continues past them.
    pub unreadable: usize,
}

pub fn collect_media_files(root: &Path, options: &CollectOptions) -> Collection {
    let mut collection = Collection::default();

    if options.recursive {
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("could not read {}: {}", walk_error_path(&err, root), err);
                    collection.unreadable += 1;
                    continue;
                }
            };
            if entry.file_type().is_file() {
                accept(entry.path(), options, &mut collection);
            }
        }
    } else {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("could not read folder {}: {}", root.display(), err);
                collection.unreadable += 1;
                return collection;
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            match entry.and_then(|e| flat_entry_is_file(&e).map(|is_file| (e, is_file))) {
                Ok((entry, true)) => paths.push(entry.path()),
                Ok((_, false)) => {}
                Err(err) => {
                    warn!("could not read entry in {}: {}", root.display(), err);
                    collection.unreadable += 1;
                }
            }
        }
        paths.sort();
        for path in paths {
            accept(&path, options, &mut collection);
        }
    }

    debug!(
        root = %root.display(),
        scanned = collection.scanned_files,
        accepted = collection.files.len(),
        unsupported = collection.skipped_unsupported,
        unreadable = collection.unreadable,
        "collected files"
    );
    collection
}

// Only symlinks need a second lookup to see what they point at.
fn flat_entry_is_file(entry: &fs::DirEntry) -> std::io::Result<bool> {
    let file_type = entry.file_type()?;
    if file_type.is_symlink() {
        Ok(fs::metadata(entry.path())?.is_file())
    } else {
        Ok(file_type.is_file())
    }
}

fn walk_error_path(err: &walkdir::Error, root: &Path) -> String {
    err.path().unwrap_or(root).display().to_string()
}

fn accept(path: &Path, options: &CollectOptions, collection: &mut Collection) {
    collection.scanned_files += 1;
    if is_allowed(path, options.allowed_extensions.as_deref()) {
        collection.files.push(MediaFile::new(path));
    } else {
        collection.skipped_unsupported += 1;
    }
}

fn is_allowed(path: &Path, allowed: Option<&[String]>) -> bool {
    let Some(allowed) = allowed else {
        return true;
    };
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            allowed.iter().any(|v| ext.eq_ignore_ascii_case(v))
        })
        .unwrap_or(false)
}
