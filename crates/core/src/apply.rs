use crate::metadata::MediaFile;
use crate::planner::Placement;
use crate::report::{CopyOutcome, CopyReport, ProgressEvent, SkipReason};
use anyhow::{Context, Result};
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedCopy {
    pub file: MediaFile,
    pub placement: Placement,
}

/// Runs every planned copy, isolating per-file failures, and folds the
/// outcomes into a report. The report's `total` covers only `plan`.
pub fn apply_plan<F>(plan: &[PlannedCopy], options: &ApplyOptions, mut on_progress: F) -> CopyReport
where
    F: FnMut(&ProgressEvent),
{
    let mut report = CopyReport {
        dry_run: options.dry_run,
        ..CopyReport::default()
    };
    let total = plan.len();
    // A dry run writes nothing, so same-run collisions are only visible here.
    let mut claimed = HashSet::<PathBuf>::new();

    for (index, planned) in plan.iter().enumerate() {
        let name = planned.file.file_name.clone();
        let outcome = match &planned.placement {
            Placement::Skip(reason) => CopyOutcome::Skipped(*reason),
            Placement::Copy(folder) => {
                let target = folder.join(&name);
                if claimed.contains(&target) || target.exists() {
                    CopyOutcome::Skipped(SkipReason::Duplicate)
                } else {
                    on_progress(&ProgressEvent::Copying {
                        index: index + 1,
                        total,
                        name: name.clone(),
                        dry_run: options.dry_run,
                    });
                    let outcome = copy_into(&planned.file.path, folder, &target, options);
                    if outcome == CopyOutcome::Copied {
                        claimed.insert(target);
                    }
                    outcome
                }
            }
        };

        match &outcome {
            CopyOutcome::Copied => {}
            CopyOutcome::Skipped(reason) => on_progress(&ProgressEvent::Skipping {
                name,
                reason: *reason,
            }),
            CopyOutcome::Error(reason) => on_progress(&ProgressEvent::Failed {
                name,
                reason: reason.clone(),
            }),
        }
        report.record(&outcome);
    }

    report
}

fn copy_into(source: &Path, folder: &Path, target: &Path, options: &ApplyOptions) -> CopyOutcome {
    if options.dry_run {
        debug!(from = %source.display(), to = %target.display(), "dry run");
        return CopyOutcome::Copied;
    }

    match copy_file(source, folder, target) {
        Ok(()) => {
            debug!(from = %source.display(), to = %target.display(), "copied");
            CopyOutcome::Copied
        }
        Err(err) => {
            error!("Error copying {}: {:#}", source.display(), err);
            CopyOutcome::Error(format!("{err:#}"))
        }
    }
}

/// Copies through a temp file in the target folder so an interrupted copy never
/// leaves a partial file under the final name.
fn copy_file(source: &Path, folder: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(folder)
        .with_context(|| format!("could not create folder: {}", folder.display()))?;

    let temp = temp_path_for(target);
    if let Err(err) = fs::copy(source, &temp) {
        let _ = fs::remove_file(&temp);
        return Err(anyhow::Error::from(err).context(format!(
            "copy failed: {} -> {}",
            source.display(),
            target.display()
        )));
    }

    preserve_times(source, &temp);

    if let Err(err) = fs::rename(&temp, target) {
        let _ = fs::remove_file(&temp);
        return Err(anyhow::Error::from(err).context(format!(
            "could not move copy into place: {}",
            target.display()
        )));
    }
    Ok(())
}

// Permissions come across with fs::copy; timestamps need filetime.
fn preserve_times(source: &Path, copy: &Path) {
    let result = fs::metadata(source)
        .with_context(|| format!("could not stat: {}", source.display()))
        .and_then(|meta| {
            let atime = FileTime::from_last_access_time(&meta);
            let mtime = FileTime::from_last_modification_time(&meta);
            filetime::set_file_times(copy, atime, mtime)
                .with_context(|| format!("could not set timestamps: {}", copy.display()))
        });
    if let Err(err) = result {
        warn!("{:#}", err);
    }
}

fn temp_path_for(target: &Path) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    let file_name = target
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!(".dated_copy_tmp_{}_{}", now, file_name))
}
