use crate::metadata::CaptureDate;
use crate::report::SkipReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_NODATE_FOLDER: &str = "nodate";

/// Folder naming for dated files. One per run; the variants do not combine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FolderPolicy {
    #[default]
    FlatDate,
    YearNested,
    CustomSuffix(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOptions {
    pub destination: PathBuf,
    pub policy: FolderPolicy,
    /// Only undated files are copied, into the nodate folder.
    pub nodate_only: bool,
    /// Undated files go to the nodate folder instead of being skipped.
    pub nodate_bucket: bool,
    pub nodate_folder: String,
    /// When set, dated files outside the set are not copied.
    pub date_filter: Option<BTreeSet<String>>,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::new(),
            policy: FolderPolicy::default(),
            nodate_only: false,
            nodate_bucket: false,
            nodate_folder: DEFAULT_NODATE_FOLDER.to_string(),
            date_filter: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Copy(PathBuf),
    Skip(SkipReason),
}

pub fn plan_destination(date: Option<&CaptureDate>, options: &PlanOptions) -> Placement {
    if options.nodate_only {
        return match date {
            Some(_) => Placement::Skip(SkipReason::DateNotSelected),
            None => Placement::Copy(nodate_folder(options)),
        };
    }

    let Some(date) = date else {
        return if options.nodate_bucket {
            Placement::Copy(nodate_folder(options))
        } else {
            Placement::Skip(SkipReason::NoDate)
        };
    };

    if let Some(filter) = &options.date_filter {
        if !filter.contains(&date.date) {
            return Placement::Skip(SkipReason::DateNotSelected);
        }
    }

    Placement::Copy(dated_folder(&options.destination, date, &options.policy))
}

pub fn dated_folder(destination: &Path, date: &CaptureDate, policy: &FolderPolicy) -> PathBuf {
    match policy {
        FolderPolicy::FlatDate => destination.join(&date.date),
        FolderPolicy::YearNested => destination.join(&date.year).join(&date.date),
        FolderPolicy::CustomSuffix(suffix) => {
            let suffix = suffix.trim();
            if suffix.is_empty() {
                destination.join(&date.date)
            } else {
                destination.join(format!("{} - {}", date.date, suffix))
            }
        }
    }
}

fn nodate_folder(options: &PlanOptions) -> PathBuf {
    options.destination.join(&options.nodate_folder)
}
