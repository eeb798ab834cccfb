use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    NoDate,
    Duplicate,
    UnsupportedExtension,
    DateNotSelected,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NoDate => "no date",
            Self::Duplicate => "duplicate",
            Self::UnsupportedExtension => "unsupported extension",
            Self::DateNotSelected => "date not selected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CopyOutcome {
    Copied,
    Skipped(SkipReason),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    Copying {
        index: usize,
        total: usize,
        name: String,
        dry_run: bool,
    },
    Skipping {
        name: String,
        reason: SkipReason,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copying {
                index,
                total,
                name,
                dry_run: false,
            } => write!(f, "copying {index}/{total}: {name}"),
            Self::Copying {
                index,
                total,
                name,
                dry_run: true,
            } => write!(f, "would copy {index}/{total}: {name}"),
            Self::Skipping { name, reason } => write!(f, "skipping: {name} ({reason})"),
            Self::Failed { name, reason } => write!(f, "error copying {name}: {reason}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyReport {
    pub total: usize,
    pub copied: usize,
    pub skipped_no_date: usize,
    pub skipped_duplicate: usize,
    pub skipped_unsupported: usize,
    pub skipped_not_selected: usize,
    pub errors: usize,
    /// Folders or entries the collector could not read. Also counted in `errors`.
    pub unreadable: usize,
    pub dry_run: bool,
}

impl CopyReport {
    pub fn record(&mut self, outcome: &CopyOutcome) {
        self.total += 1;
        match outcome {
            CopyOutcome::Copied => self.copied += 1,
            CopyOutcome::Skipped(reason) => self.record_skip(*reason),
            CopyOutcome::Error(_) => self.errors += 1,
        }
    }

    /// Counts files the collector already excluded without visiting them again.
    pub fn record_unsupported(&mut self, count: usize) {
        self.total += count;
        self.skipped_unsupported += count;
    }

    /// Unreadable entries are not files, so they count as errors but not in `total`.
    pub fn record_unreadable(&mut self, count: usize) {
        self.unreadable += count;
        self.errors += count;
    }

    pub fn skipped(&self) -> usize {
        self.skipped_no_date
            + self.skipped_duplicate
            + self.skipped_unsupported
            + self.skipped_not_selected
    }

    fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::NoDate => self.skipped_no_date += 1,
            SkipReason::Duplicate => self.skipped_duplicate += 1,
            SkipReason::UnsupportedExtension => self.skipped_unsupported += 1,
            SkipReason::DateNotSelected => self.skipped_not_selected += 1,
        }
    }
}

impl fmt::Display for CopyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = if self.dry_run { "would be copied" } else { "copied" };
        write!(
            f,
            "{} {verb}, {} skipped ({} duplicate, {} nodate, {} unsupported, {} not selected), {} errors, {} total",
            self.copied,
            self.skipped(),
            self.skipped_duplicate,
            self.skipped_no_date,
            self.skipped_unsupported,
            self.skipped_not_selected,
            self.errors,
            self.total
        )
    }
}
