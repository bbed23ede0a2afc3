pub mod command;
pub mod console;
pub mod export;
pub mod session;
pub mod shutdown;

use std::{
    io::{stdout, IsTerminal, Write},
    path::PathBuf,
};

use anyhow::Result;
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use console::{stdin_lines, Console};
use export::{export_summary, SystemViewer, Viewer};
use session::{Session, SessionOptions};
use shutdown::detect_shutdown;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};

use crate::{
    storage::{
        backup::{BackupStore, JsonBackupStore},
        registry::ProjectRegistry,
    },
    tracker::{collection::TimerCollection, summary::SummaryRow},
    utils::{
        dir::{create_application_default_path, ensure_dir, AppPaths},
        logging::{enable_logging, LOG_PREFIX},
        time::format_elapsed,
    },
};

#[derive(Parser, Debug)]
#[command(name = "Punchclock", version, long_about = None)]
#[command(about = "Per-project timers in your terminal", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default uses $XDG_STATE_HOME/punchclock or $HOME/.local/state/punchclock"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log", global = true, help = "Log level. Falls back to RUST_LOG, then info")]
    log: Option<LevelFilter>,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console", global = true)]
    log_console: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Start an interactive session with your timers")]
    Start {
        #[arg(long, help = "Open exported summaries in the default application")]
        open: bool,
    },
    #[command(about = "Export a summary of backed up timers without starting a session")]
    Export {
        #[arg(short, long, help = "Where to write the CSV. Defaults to summary.csv in the application directory")]
        output: Option<PathBuf>,
        #[arg(long, help = "Open the summary in the default application")]
        open: bool,
    },
    #[command(about = "Show backed up timers")]
    Status {},
    #[command(about = "Show previously used projects")]
    Projects {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;
    let paths = AppPaths::new(dir);
    enable_logging(LOG_PREFIX, &paths.logs(), args.log, args.log_console)?;
    info!("Using application directory {:?}", paths.root());

    match args.commands {
        Commands::Start { open } => start_session(paths, open).await,
        Commands::Export { output, open } => {
            let viewer = open.then_some(&SystemViewer as &dyn Viewer);
            export_backup(&paths, output, viewer).await
        }
        Commands::Status {} => print_status(&paths, &mut stdout()).await,
        Commands::Projects {} => print_projects(&paths, &mut stdout()).await,
    }
}

async fn start_session(paths: AppPaths, open: bool) -> Result<()> {
    let registry = ProjectRegistry::load(paths.registry()).await?;
    let shutdown = CancellationToken::new();
    let options = SessionOptions {
        summary_path: paths.summary(),
        viewer: open.then(|| Box::new(SystemViewer) as Box<dyn Viewer>),
        colored: stdout().is_terminal(),
    };
    let mut session = Session::new(
        TimerCollection::new(JsonBackupStore::new(paths.backup())),
        registry,
        Console::new(stdin_lines(), stdout()),
        options,
        shutdown.clone(),
    );

    let (_, result) = tokio::join!(detect_shutdown(shutdown.clone()), async {
        let result = session.offer_restore().await;
        match result {
            Ok(()) => session.run().await,
            Err(e) => {
                shutdown.cancel();
                Err(e)
            }
        }
    });
    result
}

async fn export_backup(
    paths: &AppPaths,
    output: Option<PathBuf>,
    viewer: Option<&dyn Viewer>,
) -> Result<()> {
    let snapshot = JsonBackupStore::new(paths.backup()).load().await?;
    let rows = snapshot
        .iter()
        .map(|(project_id, record)| {
            SummaryRow::new(project_id, &record.project_name, record.elapsed_time)
        })
        .collect::<Vec<_>>();
    let output = output.unwrap_or_else(|| paths.summary());
    export_summary(&rows, &output, viewer).await?;
    println!("Summary written to {}", output.display());
    Ok(())
}

async fn print_status(paths: &AppPaths, out: &mut impl Write) -> Result<()> {
    let store = JsonBackupStore::new(paths.backup());
    let snapshot = store.load().await?;
    if snapshot.is_empty() {
        writeln!(out, "No backed up timers")?;
        return Ok(());
    }

    if let Ok(modified) = tokio::fs::metadata(store.path())
        .await
        .and_then(|metadata| metadata.modified())
    {
        let modified: DateTime<Local> = modified.into();
        writeln!(out, "Last saved {}", modified.format("%Y-%m-%d %H:%M:%S"))?;
    }
    for (project_id, record) in snapshot.iter() {
        writeln!(
            out,
            "{}\t{}\t{}\t{}",
            format_elapsed(record.elapsed_time),
            project_id,
            record.project_name,
            record.notes
        )?;
    }
    Ok(())
}

async fn print_projects(paths: &AppPaths, out: &mut impl Write) -> Result<()> {
    let registry = ProjectRegistry::load(paths.registry()).await?;
    if registry.is_empty() {
        writeln!(out, "No projects yet")?;
    }
    for (name, id) in registry.iter() {
        writeln!(out, "{name}\t{id}")?;
    }
    Ok(())
}
