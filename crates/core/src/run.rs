use crate::apply::{apply_plan, ApplyOptions, PlannedCopy};
use crate::catalog::{prompt_selection, scan_dates, DateCatalog};
use crate::collector::{collect_media_files, CollectOptions};
use crate::metadata::DateSource;
use crate::planner::{plan_destination, FolderPolicy, PlanOptions, DEFAULT_NODATE_FOLDER};
use crate::report::{CopyReport, ProgressEvent};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    #[default]
    Copy,
    SelectDates,
    NodateOnly,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub mode: RunMode,
    pub policy: FolderPolicy,
    pub nodate_bucket: bool,
    pub nodate_folder: String,
    pub collect: CollectOptions,
    pub dry_run: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            mode: RunMode::default(),
            policy: FolderPolicy::default(),
            nodate_bucket: false,
            nodate_folder: DEFAULT_NODATE_FOLDER.to_string(),
            collect: CollectOptions {
                recursive: true,
                allowed_extensions: None,
            },
            dry_run: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("source folder does not exist: {}", .0.display())]
    SourceMissing(PathBuf),
    #[error("no dates selected, nothing to copy")]
    EmptySelection,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Chooses which catalog dates a `SelectDates` run copies.
pub trait DateSelector {
    fn select(&mut self, catalog: &DateCatalog) -> Result<BTreeSet<String>>;
}

pub struct PromptSelector<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptSelector<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> DateSelector for PromptSelector<R, W> {
    fn select(&mut self, catalog: &DateCatalog) -> Result<BTreeSet<String>> {
        prompt_selection(catalog, &mut self.input, &mut self.output)
            .context("could not read date selection")
    }
}

pub fn run<S, F>(
    options: &RunOptions,
    source: &S,
    selector: &mut dyn DateSelector,
    on_progress: F,
) -> Result<CopyReport, RunError>
where
    S: DateSource,
    F: FnMut(&ProgressEvent),
{
    info!(
        source = %options.source.display(),
        destination = %options.destination.display(),
        mode = ?options.mode,
        "starting copy"
    );
    ensure_source(&options.source)?;

    let collection = collect_media_files(&options.source, &options.collect);
    let skipped_unsupported = collection.skipped_unsupported;
    let unreadable = collection.unreadable;
    let scanned = scan_dates(collection.files, source);

    let date_filter = match options.mode {
        RunMode::SelectDates => {
            let catalog = DateCatalog::build(&scanned);
            let chosen = selector.select(&catalog)?;
            if chosen.is_empty() {
                return Err(RunError::EmptySelection);
            }
            debug!(dates = ?chosen, "selected dates");
            Some(chosen)
        }
        RunMode::Copy | RunMode::NodateOnly => None,
    };

    let plan_options = PlanOptions {
        destination: options.destination.clone(),
        policy: options.policy.clone(),
        nodate_only: options.mode == RunMode::NodateOnly,
        nodate_bucket: options.nodate_bucket,
        nodate_folder: options.nodate_folder.clone(),
        date_filter,
    };
    let plan: Vec<PlannedCopy> = scanned
        .into_iter()
        .map(|item| PlannedCopy {
            placement: plan_destination(item.date.as_ref(), &plan_options),
            file: item.file,
        })
        .collect();

    let mut report = apply_plan(
        &plan,
        &ApplyOptions {
            dry_run: options.dry_run,
        },
        on_progress,
    );
    report.record_unsupported(skipped_unsupported);
    report.record_unreadable(unreadable);

    info!(
        total = report.total,
        copied = report.copied,
        skipped = report.skipped(),
        errors = report.errors,
        "copy finished"
    );
    Ok(report)
}

pub fn list_dates<S: DateSource>(
    root: &Path,
    collect: &CollectOptions,
    source: &S,
) -> Result<DateCatalog, RunError> {
    ensure_source(root)?;
    let collection = collect_media_files(root, collect);
    Ok(DateCatalog::build(&scan_dates(collection.files, source)))
}

fn ensure_source(root: &Path) -> Result<(), RunError> {
    if root.is_dir() {
        Ok(())
    } else {
        Err(RunError::SourceMissing(root.to_path_buf()))
    }
}

#[cfg(test)]
mod tests {
    use super::{list_dates, run, DateSelector, PromptSelector, RunError, RunMode, RunOptions};
    use crate::catalog::DateCatalog;
    use crate::collector::CollectOptions;
    use crate::metadata::testing::FakeDates;
    use crate::planner::FolderPolicy;
    use crate::report::{CopyReport, ProgressEvent};
    use anyhow::Result;
    use std::collections::BTreeSet;
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    struct Pick(Vec<&'static str>);

    impl DateSelector for Pick {
        fn select(&mut self, _catalog: &DateCatalog) -> Result<BTreeSet<String>> {
            Ok(self.0.iter().map(|d| d.to_string()).collect())
        }
    }

    fn touch(path: &Path, body: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, body).expect("write file");
    }

    fn options(source: &Path, destination: &Path) -> RunOptions {
        RunOptions {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            ..RunOptions::default()
        }
    }

    fn run_quiet(options: &RunOptions, dates: &FakeDates) -> Result<CopyReport, RunError> {
        run(options, dates, &mut Pick(Vec::new()), |_| {})
    }

    fn tree(root: &Path) -> Vec<PathBuf> {
        let mut out: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .flatten()
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().strip_prefix(root).expect("prefix").to_path_buf())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn year_nested_copy_then_rerun_is_idempotent() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        touch(&src.join("b.jpg"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.policy = FolderPolicy::YearNested;

        let mut events = Vec::new();
        let first = run(&opts, &dates, &mut Pick(Vec::new()), |e| events.push(e.to_string()))
            .expect("first run");
        assert_eq!(first.copied, 1);
        assert_eq!(first.skipped_no_date, 1);
        assert_eq!(first.total, 2);
        assert!(first.to_string().starts_with("1 copied, 1 skipped"));
        assert_eq!(tree(&dest), vec![PathBuf::from("2024/2024-01-15/a.jpg")]);
        assert_eq!(
            events,
            vec!["copying 1/2: a.jpg", "skipping: b.jpg (no date)"]
        );

        let second = run_quiet(&opts, &dates).expect("second run");
        assert_eq!(second.copied, 0);
        assert_eq!(second.skipped_duplicate, first.copied);
        assert_eq!(second.skipped_no_date, 1);
        assert_eq!(tree(&dest), vec![PathBuf::from("2024/2024-01-15/a.jpg")]);
    }

    #[test]
    fn custom_suffix_and_nested_sources() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("DCIM/100/a.jpg"), b"a");
        touch(&src.join("DCIM/101/b.mov"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15"), ("b.mov", "2024-01-16")]);

        let mut opts = options(&src, &dest);
        opts.policy = FolderPolicy::CustomSuffix("Trip".to_string());

        let report = run_quiet(&opts, &dates).expect("run");
        assert_eq!(report.copied, 2);
        assert_eq!(
            tree(&dest),
            vec![
                PathBuf::from("2024-01-15 - Trip/a.jpg"),
                PathBuf::from("2024-01-16 - Trip/b.mov"),
            ]
        );
    }

    #[test]
    fn flat_collection_ignores_subfolders() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        touch(&src.join("sub/b.jpg"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15"), ("b.jpg", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.collect.recursive = false;

        let report = run_quiet(&opts, &dates).expect("run");
        assert_eq!(report.total, 1);
        assert_eq!(tree(&dest), vec![PathBuf::from("2024-01-15/a.jpg")]);
    }

    #[test]
    fn unsupported_extensions_never_reach_destination() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        touch(&src.join("notes.txt"), b"n");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15"), ("notes.txt", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.collect = CollectOptions::media_only(true, &[]);

        let mut events = Vec::new();
        let report = run(&opts, &dates, &mut Pick(Vec::new()), |e| events.push(e.clone()))
            .expect("run");
        assert_eq!(report.total, 2);
        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped_unsupported, 1);
        assert_eq!(report.errors, 0);
        assert_eq!(tree(&dest), vec![PathBuf::from("2024-01-15/a.jpg")]);
        assert!(events
            .iter()
            .all(|e| !matches!(e, ProgressEvent::Failed { .. })));
    }

    #[test]
    fn nodate_only_copies_just_undated_files() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        touch(&src.join("b.jpg"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.mode = RunMode::NodateOnly;

        let report = run_quiet(&opts, &dates).expect("run");
        assert_eq!(report.copied, 1);
        assert_eq!(report.skipped_not_selected, 1);
        assert_eq!(tree(&dest), vec![PathBuf::from("nodate/b.jpg")]);
    }

    #[test]
    fn nodate_bucket_keeps_undated_files_alongside_dated_ones() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        touch(&src.join("b.jpg"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.nodate_bucket = true;

        let report = run_quiet(&opts, &dates).expect("run");
        assert_eq!(report.copied, 2);
        assert_eq!(
            tree(&dest),
            vec![PathBuf::from("2024-01-15/a.jpg"), PathBuf::from("nodate/b.jpg")]
        );
    }

    #[test]
    fn selected_dates_limit_the_copy() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg"] {
            touch(&src.join(name), name.as_bytes());
        }
        let dates = FakeDates::new(&[
            ("a.jpg", "2024-01-15"),
            ("b.jpg", "2024-01-16"),
            ("c.jpg", "2024-01-17"),
        ]);

        let mut opts = options(&src, &dest);
        opts.mode = RunMode::SelectDates;

        // Catalog is 1: 01-15, 2: 01-16, 3: 01-17.
        let mut selector = PromptSelector::new(Cursor::new("x\n1,3\n"), Vec::new());
        let report = run(&opts, &dates, &mut selector, |_| {}).expect("run");

        assert_eq!(report.copied, 2);
        assert_eq!(report.skipped_not_selected, 1);
        assert_eq!(report.skipped_no_date, 1);
        assert_eq!(
            tree(&dest),
            vec![PathBuf::from("2024-01-15/a.jpg"), PathBuf::from("2024-01-17/c.jpg")]
        );
    }

    #[test]
    fn empty_selection_aborts_without_side_effects() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.mode = RunMode::SelectDates;

        let err = run(&opts, &dates, &mut Pick(Vec::new()), |_| {}).expect_err("abort");
        assert!(matches!(err, RunError::EmptySelection));
        assert!(!dest.exists());
    }

    #[test]
    fn missing_source_aborts_before_any_work() {
        let temp = tempdir().expect("tempdir");
        let dest = temp.path().join("archive");
        let opts = options(&temp.path().join("missing"), &dest);

        let err = run_quiet(&opts, &FakeDates::new(&[])).expect_err("missing source");
        assert!(matches!(err, RunError::SourceMissing(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn empty_source_completes_with_zero_counts() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        fs::create_dir_all(&src).expect("create src");

        let report =
            run_quiet(&options(&src, &temp.path().join("archive")), &FakeDates::new(&[]))
                .expect("run");
        assert_eq!(report, CopyReport::default());
    }

    #[test]
    fn list_dates_builds_catalog() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("a.jpg"), b"a");
        touch(&temp.path().join("b.jpg"), b"b");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15"), ("b.jpg", "2024-01-15")]);

        let catalog = list_dates(
            temp.path(),
            &CollectOptions {
                recursive: true,
                allowed_extensions: None,
            },
            &dates,
        )
        .expect("catalog");
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.entries[0].files.len(), 2);
    }

    #[test]
    fn same_name_in_two_subfolders_copies_once() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("DCIM/100/IMG_0001.JPG"), b"first");
        touch(&src.join("DCIM/101/IMG_0001.JPG"), b"second");
        let dates = FakeDates::new(&[("IMG_0001.JPG", "2024-01-15")]);

        let mut opts = options(&src, &dest);
        opts.dry_run = true;
        let dry = run_quiet(&opts, &dates).expect("dry run");
        assert!(!dest.exists());

        opts.dry_run = false;
        let real = run_quiet(&opts, &dates).expect("real run");

        assert_eq!(real.copied, 1);
        assert_eq!(real.skipped_duplicate, 1);
        assert_eq!(dry.copied, real.copied);
        assert_eq!(dry.skipped_duplicate, real.skipped_duplicate);
        assert_eq!(tree(&dest), vec![PathBuf::from("2024-01-15/IMG_0001.JPG")]);
        assert_eq!(
            fs::read(dest.join("2024-01-15/IMG_0001.JPG")).expect("read"),
            b"first"
        );
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entry_does_not_stop_the_run() {
        use std::os::unix::fs::symlink;

        let temp = tempdir().expect("tempdir");
        let src = temp.path().join("card");
        let dest = temp.path().join("archive");
        touch(&src.join("a.jpg"), b"a");
        symlink(src.join("gone"), src.join("broken")).expect("symlink");
        let dates = FakeDates::new(&[("a.jpg", "2024-01-15")]);

        for recursive in [true, false] {
            let mut opts = options(&src, &dest);
            opts.collect.recursive = recursive;
            opts.dry_run = true;

            let report = run_quiet(&opts, &dates).expect("run");
            assert_eq!(report.copied, 1, "recursive={recursive}");
            assert_eq!(report.unreadable, 1);
            assert_eq!(report.errors, 1);
            assert_eq!(report.total, 1);
        }

        let report = run_quiet(&options(&src, &dest), &dates).expect("run");
        assert_eq!(report.copied, 1);
        assert_eq!(tree(&dest), vec![PathBuf::from("2024-01-15/a.jpg")]);
    }
}
