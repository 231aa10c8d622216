use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use als2mid_core::{normalize_bytes, ExportPlan, PrefsScanner, Verdict};
use als2mid_host::{
    default_prefs_root, latest_live_dir, wait_for_output, LocateRequest, Locator,
    LocatorSettings, PollOutcome, ReadRetry, Resolution, SettingsStore,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{debug, warn};

const EXIT_READY: i32 = 0;
const EXIT_SAVE_REQUIRED: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;

#[derive(Parser)]
#[command(
    name = "als2mid-cli",
    about = "Locate the Ableton Live project to export as MIDI",
    author,
    version
)]
struct Cli {
    /// 設定檔路徑。 / Settings file (defaults to `<config dir>/als2mid/settings.json`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// 顯示除錯訊息。 / Print debug logging to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,
    /// 只顯示警告與錯誤。 / Only log warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 找出目前開啟的專案。 / Resolve the project Live currently has open.
    Resolve(ResolveArgs),
    /// 讀取最近開啟的專案清單。 / Print the most recent entry of a Preferences.cfg.
    Recent(RecentArgs),
    /// 顯示專案的匯出位置。 / Show where the MIDI export of a project would go.
    Plan(PlanArgs),
    /// 檢視或修改設定檔。 / Show or change the settings file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// 以 JSON 顯示目前設定。 / Print the effective settings as JSON.
    Show,
    /// 更新設定並儲存。 / Change settings and save them.
    Set(ConfigSetArgs),
}

#[derive(Args)]
struct ConfigSetArgs {
    /// Ableton 偏好設定根目錄。 / Folder holding the `Live <version>` directories.
    #[arg(long, value_name = "PATH")]
    prefs_root: Option<PathBuf>,
    /// 讀取的記錄檔行數。 / Number of log lines scanned from the end.
    #[arg(long, value_name = "LINES")]
    log_tail_lines: Option<usize>,
    /// 專案副檔名。 / Project file extension.
    #[arg(long, value_name = "EXT")]
    project_extension: Option<String>,
    /// 等待時的最多嘗試次數。 / Attempts made by `resolve --wait`.
    #[arg(long, value_name = "COUNT")]
    max_attempts: Option<u32>,
    /// 第一次檢查前的等待毫秒數。 / Delay before the first look, in milliseconds.
    #[arg(long, value_name = "MS")]
    initial_delay_ms: Option<u64>,
    /// 每次重試間隔毫秒數。 / Delay between attempts, in milliseconds.
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,
}

impl ConfigSetArgs {
    fn apply(self, settings: &mut LocatorSettings) {
        if let Some(root) = self.prefs_root {
            settings.prefs_root = Some(root);
        }
        if let Some(lines) = self.log_tail_lines {
            settings.log_tail_lines = lines;
        }
        if let Some(extension) = self.project_extension {
            settings.scan.project_extension = extension;
        }
        if let Some(attempts) = self.max_attempts {
            settings.retry.max_attempts = attempts;
        }
        if let Some(delay) = self.initial_delay_ms {
            settings.retry.initial_delay_ms = delay;
        }
        if let Some(interval) = self.interval_ms {
            settings.retry.interval_ms = interval;
        }
    }
}

#[derive(Args)]
struct ResolveArgs {
    /// Ableton 偏好設定根目錄。 / Folder holding the `Live <version>` directories.
    #[arg(long, value_name = "PATH", conflicts_with = "log")]
    prefs_root: Option<PathBuf>,
    /// 直接指定 Log.txt。 / Read this Log.txt instead of the newest installation's.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// 直接指定 Preferences.cfg。 / Read this Preferences.cfg.
    #[arg(long, value_name = "PATH")]
    prefs: Option<PathBuf>,
    /// 輔助程式輸出的最近路徑。 / Helper output holding one quoted recent path.
    #[arg(long, value_name = "PATH")]
    recent_file: Option<PathBuf>,
    /// 找不到時由此資料夾搜尋專案。 / Folder to search for a project when nothing else resolves.
    #[arg(long, value_name = "PATH")]
    search_from: Option<PathBuf>,
    /// 等待記錄檔寫入完成。 / Poll until the log is written before reading it.
    #[arg(long)]
    wait: bool,
    /// 寫入完成的標記檔。 / Marker file whose presence means the log is complete.
    #[arg(long, value_name = "PATH", requires = "wait")]
    done_file: Option<PathBuf>,
    /// 以 JSON 輸出。 / Print the resolution as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct RecentArgs {
    /// 要讀取的 Preferences.cfg。 / Preferences.cfg to read.
    prefs_file: PathBuf,
}

#[derive(Args)]
struct PlanArgs {
    /// 專案檔路徑。 / Path of the project file.
    project: String,
    /// 以 JSON 輸出。 / Print the plan as JSON.
    #[arg(long)]
    json: bool,
}

fn main() {
    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {err:#}");
            process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let json_output = match &cli.command {
        Commands::Resolve(args) => args.json,
        Commands::Plan(args) => args.json,
        Commands::Config(ConfigCommand::Show) => true,
        Commands::Recent(_) | Commands::Config(_) => false,
    };
    init_logging(cli.verbose, cli.quiet || json_output);

    let config_path = cli.config.or_else(SettingsStore::default_path);
    match cli.command {
        Commands::Resolve(args) => execute_resolve(args, load_settings(config_path.as_deref())?),
        Commands::Recent(args) => execute_recent(args, &load_settings(config_path.as_deref())?),
        Commands::Plan(args) => execute_plan(args, &load_settings(config_path.as_deref())?),
        Commands::Config(command) => execute_config(command, config_path),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

fn load_settings(config: Option<&Path>) -> Result<LocatorSettings> {
    let Some(path) = config else {
        return Ok(LocatorSettings::default());
    };
    let store = SettingsStore::load(path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    debug!("settings loaded from {}", store.path().display());
    Ok(store.into_settings())
}

fn execute_resolve(args: ResolveArgs, settings: LocatorSettings) -> Result<i32> {
    let mut request = match args.log {
        Some(log) => LocateRequest {
            log,
            ..LocateRequest::default()
        },
        None => {
            let root = match args.prefs_root.or_else(|| settings.prefs_root.clone()) {
                Some(root) => root,
                None => default_prefs_root()?,
            };
            let paths = latest_live_dir(&root)?;
            debug!("using Live {} under {}", paths.version, root.display());
            LocateRequest::for_live(&paths)
        }
    };
    if args.prefs.is_some() {
        request.prefs = args.prefs;
    }
    request.recent_file = args.recent_file;
    request.search_from = args.search_from;

    if args.wait {
        let mut retry = ReadRetry::from_settings(&settings.retry);
        let outcome = wait_for_output(
            &request.log,
            args.done_file.as_deref(),
            &mut retry,
            thread::sleep,
        );
        if outcome == PollOutcome::TimedOut {
            warn!(
                "gave up waiting for {} after {} attempts",
                request.log.display(),
                retry.attempts()
            );
        }
    }

    let locator = Locator::new(settings);
    let resolution = locator.locate(&request)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        print_resolution(&resolution);
    }
    Ok(exit_code(&resolution))
}

fn print_resolution(resolution: &Resolution) {
    match (&resolution.verdict, resolution.project_path()) {
        (Verdict::SaveRequired { reason }, _) => {
            println!("SAVE YOUR PROJECT FIRST ({reason})");
        }
        (verdict, Some(path)) => {
            let source = verdict
                .candidate()
                .map(|candidate| candidate.source().to_string())
                .unwrap_or_else(|| "filesystem".to_string());
            println!("Ready: {path} (from {source})");
            if let Some(plan) = &resolution.export {
                println!("Export folder: {}", plan.folder);
                println!("Output: {}", plan.output);
            }
        }
        (_, None) => println!("Project file not found"),
    }
}

fn exit_code(resolution: &Resolution) -> i32 {
    if resolution.save_reason().is_some() {
        EXIT_SAVE_REQUIRED
    } else if resolution.project_path().is_some() {
        EXIT_READY
    } else {
        EXIT_NOT_FOUND
    }
}

fn execute_recent(args: RecentArgs, settings: &LocatorSettings) -> Result<i32> {
    let bytes = fs::read(&args.prefs_file)
        .with_context(|| format!("failed to read {}", args.prefs_file.display()))?;
    let scanner = PrefsScanner::new(&settings.scan);
    let recent = scanner.extract_recent_path(&normalize_bytes(&bytes));
    if recent.is_empty() {
        println!("No recent project found");
        return Ok(EXIT_NOT_FOUND);
    }
    println!("{recent}");
    Ok(EXIT_READY)
}

fn execute_plan(args: PlanArgs, settings: &LocatorSettings) -> Result<i32> {
    let plan = ExportPlan::for_project(&args.project, &settings.scan.project_extension);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        println!("Project: {}", plan.project);
        println!("Export folder: {}", plan.folder);
        println!("Output: {}", plan.output);
    }
    Ok(EXIT_READY)
}

fn execute_config(command: ConfigCommand, config: Option<PathBuf>) -> Result<i32> {
    let path = config.context("no settings location known for this platform; pass --config")?;
    let mut store = SettingsStore::load(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    match command {
        ConfigCommand::Show => {
            println!("{}", serde_json::to_string_pretty(store.settings())?);
        }
        ConfigCommand::Set(args) => {
            store
                .update(|settings| args.apply(settings))
                .with_context(|| format!("failed to save settings to {}", path.display()))?;
            println!("Saved {}", store.path().display());
        }
    }
    Ok(EXIT_READY)
}
