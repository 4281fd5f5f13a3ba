use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};

use sentinel_automate::archive::{list_archive_entries, list_archives};
use sentinel_automate::events::{FanoutSink, LogFileSink, TracingSink};
use sentinel_automate::quarantine::QuarantineManager;
use sentinel_automate::{init_tracing, Automation};

#[derive(Parser)]
#[command(
    name = "sentinel-automate",
    version,
    about = "Archive, organize and clean up a workspace directory",
    long_about = "Runs rule-driven maintenance over a workspace: backs up configured \
                  folders into dated archives, moves files by pattern and age, and \
                  quarantines duplicate and expired files."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run archive, organize and cleanup against a workspace
    Run {
        /// Workspace root
        root: PathBuf,
        /// Configuration file (JSON)
        #[arg(short, long, default_value = "automation_config.json")]
        config: PathBuf,
        /// Also append events to <DIR>/automation_<YYYYMMDD>.log
        #[arg(long, env = "SENTINEL_LOG_DIR")]
        log_dir: Option<PathBuf>,
    },

    /// List quarantined files
    Quarantine {
        /// Workspace root
        root: PathBuf,
    },

    /// List backup archives
    Archives {
        /// Workspace root
        root: PathBuf,
        /// Also list the files inside each archive
        #[arg(long)]
        entries: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Commands::Run {
            root,
            config,
            log_dir,
        } => run(&root, &config, log_dir.as_deref()),
        Commands::Quarantine { root } => show_quarantine(&existing_root(&root)?),
        Commands::Archives { root, entries } => show_archives(&existing_root(&root)?, entries),
    }
}

fn existing_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        bail!("workspace root does not exist: {}", root.display());
    }
    root.canonicalize()
        .with_context(|| format!("failed to resolve {}", root.display()))
}

fn run(root: &Path, config: &Path, log_dir: Option<&Path>) -> Result<()> {
    let root = existing_root(root)?;
    let automation = Automation::load(&root, config)
        .with_context(|| format!("cannot start automation for {}", root.display()))?;

    let ctx = automation.context();
    let mut sink = FanoutSink::new().with(TracingSink);
    if let Some(dir) = log_dir {
        let file_sink = LogFileSink::open(dir, ctx.now)
            .with_context(|| format!("cannot open log directory {}", dir.display()))?;
        sink = sink.with(file_sink);
    }

    let report = automation.run(&ctx, &mut sink);

    if let Some(archive) = &report.archive {
        println!(
            "Archives: {} created, {} pruned",
            archive.created.len(),
            archive.pruned
        );
    }
    if let Some(organize) = &report.organize {
        println!(
            "Organize: {} moved, {} skipped",
            organize.moved, organize.skipped
        );
    }
    if let Some(cleanup) = &report.cleanup {
        println!(
            "Cleanup: {} duplicate(s), {} expired, {} empty folder(s) removed",
            cleanup.duplicates_quarantined, cleanup.expired_quarantined, cleanup.folders_deleted
        );
    }
    if report.failures() > 0 {
        println!("{} item(s) failed; see the log for details", report.failures());
    }
    if let Some(stage) = report.cancelled_at {
        println!("Cancelled during {} stage", stage);
    }

    // Item failures are reported, not fatal
    Ok(())
}

fn show_quarantine(root: &Path) -> Result<()> {
    let manager = QuarantineManager::for_root(root);
    let items = manager.list()?;

    if items.is_empty() {
        println!("Quarantine is empty.");
        return Ok(());
    }

    for item in &items {
        println!(
            "{:<10} {}  {:>10}  {}",
            format!("{:?}", item.reason).to_lowercase(),
            item.modified.format("%Y-%m-%d %H:%M"),
            item.size,
            item.relative.display()
        );
    }

    let stats = manager.stats()?;
    println!();
    println!(
        "{} duplicate(s), {} expired, {} bytes total",
        stats.duplicates, stats.expired, stats.total_bytes
    );
    Ok(())
}

fn show_archives(root: &Path, with_entries: bool) -> Result<()> {
    let archives = list_archives(root)?;

    if archives.is_empty() {
        println!("No archives under {}", root.join("backups").display());
        return Ok(());
    }

    let now = Local::now();
    for info in &archives {
        let age_days = (now - info.modified).num_days();
        println!(
            "{:<16} {}  {:>10}  {} day(s) old",
            info.folder,
            info.path.file_name().unwrap_or_default().to_string_lossy(),
            info.size,
            age_days
        );
        if with_entries {
            for entry in list_archive_entries(&info.path)? {
                println!("    {}", entry);
            }
        }
    }
    Ok(())
}
