mod apply;
mod catalog;
mod collector;
mod config;
mod exif_reader;
mod metadata;
mod planner;
mod report;
mod run;

pub use apply::{apply_plan, ApplyOptions, PlannedCopy};
pub use catalog::{
    parse_selection, prompt_selection, scan_dates, CatalogEntry, DateCatalog, ScannedFile,
    SelectionError,
};
pub use collector::{collect_media_files, CollectOptions, Collection, MEDIA_EXTENSIONS};
pub use config::{
    app_paths, load_config, load_config_from, save_config, save_config_to, AppConfig, AppPaths,
};
pub use exif_reader::ExifDateReader;
pub use metadata::{parse_capture_date, CaptureDate, DateSource, MediaFile};
pub use planner::{dated_folder, plan_destination, FolderPolicy, PlanOptions, Placement};
pub use report::{CopyOutcome, CopyReport, ProgressEvent, SkipReason};
pub use run::{list_dates, run, DateSelector, PromptSelector, RunError, RunMode, RunOptions};
