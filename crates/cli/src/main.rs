use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use dated_copy_core::{
    app_paths, list_dates, load_config, run, save_config, AppConfig, CollectOptions, CopyReport,
    ExifDateReader, FolderPolicy, ProgressEvent, PromptSelector, RunError, RunMode, RunOptions,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "dated-copy", version)]
#[command(about = "Copy photos and videos into folders named after their capture date")]
struct Cli {
    /// Repeat for more log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Copy files into date folders
    Copy(CopyArgs),
    /// List the capture dates found under a folder
    Dates(DatesArgs),
    /// Show or create the config file
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the config file location and its current values
    Show,
    /// Write the default config file
    Init,
}

#[derive(Debug, Args)]
struct ScanArgs {
    /// Only look at files directly inside the source folder
    #[arg(long, conflicts_with = "recursive")]
    flat: bool,
    /// Walk every subfolder of the source folder
    #[arg(long)]
    recursive: bool,
    /// Only consider known image, raw, video and vfx extensions
    #[arg(long, conflicts_with = "all_files")]
    media_only: bool,
    /// Consider every file regardless of extension
    #[arg(long)]
    all_files: bool,
}

#[derive(Debug, Args)]
struct CopyArgs {
    /// Folder to copy from, such as a camera card
    source: PathBuf,
    /// Folder that receives the date folders
    destination: PathBuf,
    /// Name appended to each date folder: "<date> - <name>"
    #[arg(long, conflicts_with = "year_folders")]
    folder_name: Option<String>,
    /// Nest date folders under a year folder: "<year>/<date>"
    #[arg(long)]
    year_folders: bool,
    /// Pick the dates to copy from a list
    #[arg(long, conflicts_with = "nodate_only")]
    select_dates: bool,
    /// Copy only files without a capture date
    #[arg(long)]
    nodate_only: bool,
    /// Copy undated files into the nodate folder instead of skipping them
    #[arg(long, conflicts_with = "nodate_only")]
    nodate_bucket: bool,
    #[command(flatten)]
    scan: ScanArgs,
    /// Report what would be copied without touching the destination
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Summary format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Args)]
struct DatesArgs {
    /// Folder to scan for capture dates
    source: PathBuf,
    #[command(flatten)]
    scan: ScanArgs,
    /// Listing format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Copy(args) => cmd_copy(args),
        Commands::Dates(args) => cmd_dates(args),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            match err.downcast_ref::<RunError>() {
                Some(RunError::EmptySelection) => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "dated_copy=warn,dated_copy_core=warn",
        1 => "dated_copy=info,dated_copy_core=info",
        _ => "dated_copy=debug,dated_copy_core=debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn collect_options(scan: &ScanArgs, config: &AppConfig) -> CollectOptions {
    let recursive = if scan.flat {
        false
    } else {
        scan.recursive || config.recursive_default
    };
    let media_only = if scan.all_files {
        false
    } else {
        scan.media_only || config.media_only_default
    };

    if media_only {
        CollectOptions::media_only(recursive, &config.extra_extensions)
    } else {
        CollectOptions {
            recursive,
            allowed_extensions: None,
        }
    }
}

fn cmd_copy(args: CopyArgs) -> Result<()> {
    let config = load_config()?;
    debug!(?config, "loaded config");

    let policy = match (&args.folder_name, args.year_folders) {
        (Some(name), _) => FolderPolicy::CustomSuffix(name.clone()),
        (None, true) => FolderPolicy::YearNested,
        (None, false) => FolderPolicy::FlatDate,
    };
    let mode = if args.select_dates {
        RunMode::SelectDates
    } else if args.nodate_only {
        RunMode::NodateOnly
    } else {
        RunMode::Copy
    };

    let options = RunOptions {
        source: args.source,
        destination: args.destination,
        mode,
        policy,
        nodate_bucket: args.nodate_bucket,
        nodate_folder: config.nodate_folder.clone(),
        collect: collect_options(&args.scan, &config),
        dry_run: args.dry_run,
    };

    let stdin = io::stdin();
    let mut selector = PromptSelector::new(stdin.lock(), io::stdout());
    // Failures are logged by the core; only progress goes to stdout.
    let report = run(&options, &ExifDateReader, &mut selector, |event| match event {
        ProgressEvent::Copying { .. } | ProgressEvent::Skipping { .. } => println!("{event}"),
        ProgressEvent::Failed { .. } => {}
    })?;

    print_report(&report, args.output)
}

fn print_report(report: &CopyReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let heading = if report.dry_run {
                "Dry run complete"
            } else {
                "Copy complete"
            };
            println!("{heading}: {report}");
        }
    }
    Ok(())
}

fn cmd_dates(args: DatesArgs) -> Result<()> {
    let config = load_config()?;
    let collect = collect_options(&args.scan, &config);
    let catalog = list_dates(&args.source, &collect, &ExifDateReader)?;

    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&catalog)?),
        OutputFormat::Table => {
            if catalog.is_empty() {
                println!("No dated files found.");
            } else {
                catalog.write_listing(&mut io::stdout().lock())?;
            }
        }
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let paths = app_paths()?;
    println!("config file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let paths = app_paths()?;
    if paths.config_path.exists() {
        anyhow::bail!(
            "config file already exists: {}",
            paths.config_path.display()
        );
    }
    let path = save_config(&AppConfig::default())?;
    println!("wrote {}", path.display());
    Ok(())
}
