mod cli;
mod display;
mod edit;
mod session;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::Parser;
use liquida_ai::{GeminiClient, RetryPolicy};
use liquida_export::{naming, pdf, xlsx};
use liquida_store::HistoryStore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ExportArgs, HistoryCommand, ProcessArgs};
use session::{ProcessOptions, Session};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    info!("liquida v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(Cli::parse()).await {
        error!("{e}");
        for cause in e.chain().skip(1) {
            error!("  caused by: {cause}");
        }
        std::process::exit(1);
    }
}

fn history_path(cli: &Cli) -> Result<PathBuf> {
    if let Some(path) = &cli.history {
        return Ok(path.clone());
    }
    let base = dirs::data_dir().context("no data directory; pass --history")?;
    Ok(base.join("liquida").join("history.json"))
}

async fn run(cli: Cli) -> Result<()> {
    let path = history_path(&cli)?;
    let store = HistoryStore::open(&path)
        .with_context(|| format!("failed to open history at {}", path.display()))?;
    let mut session = Session::new(store);

    match cli.command {
        Commands::Process(args) => process(&mut session, args).await,
        Commands::History(cmd) => history(&mut session, cmd),
        Commands::Edit(args) => edit_entry(&mut session, &args),
        Commands::Export(args) => export(&session, &args),
    }
}

async fn process(session: &mut Session, args: ProcessArgs) -> Result<()> {
    let (candidates, unreadable) = session::describe_files(&args.files);
    for message in &unreadable {
        println!("rejected: {message}");
    }

    let selection = session.select(candidates);
    for rejection in &selection.rejected {
        println!("rejected: {rejection}");
    }
    for name in &selection.duplicates {
        println!("skipped duplicate: {name}");
    }
    if session.queue().is_empty() {
        bail!("no valid documents to process");
    }

    let retry = RetryPolicy {
        max_retries: args.max_retries,
        ..RetryPolicy::default()
    };
    let client = GeminiClient::new(
        &args.api_base,
        args.api_key,
        Duration::from_secs(args.timeout_secs),
    )?
    .with_retry_policy(retry);

    let options = ProcessOptions {
        instructions: args.instructions,
        employer_percent: args.employer_percent,
        model: args.model.into(),
    };
    let outcome = session.process_queue(&client, &options).await?;

    println!(
        "{} processed, {} failed, {} left in queue",
        outcome.succeeded,
        outcome.failed,
        session.queue().len()
    );
    if args.show {
        for id in &outcome.recorded {
            if let Some(entry) = session.store().get(id) {
                println!();
                print!("{}", display::settlement_card(entry));
            }
        }
    } else if let Some(entry) = session.current() {
        println!("last entry: {}", entry.id);
    }

    if let Some(message) = outcome.halted {
        bail!("model quota exhausted, wait a minute and retry the remaining files: {message}");
    }
    Ok(())
}

fn history(session: &mut Session, cmd: HistoryCommand) -> Result<()> {
    match cmd {
        HistoryCommand::List => {
            print!("{}", display::history_table(session.store().entries()));
            if let Some(path) = session.store().path() {
                println!("({} entries in {})", session.store().len(), path.display());
            }
        }
        HistoryCommand::Show { id } => {
            let entry = session
                .resolve(&id)
                .with_context(|| format!("no history entry matches {id:?}"))?;
            print!("{}", display::settlement_card(entry));
        }
        HistoryCommand::Clear { yes } => {
            if !yes {
                bail!("refusing to clear history without --yes");
            }
            let count = session.store().len();
            session.store_mut().clear()?;
            println!("removed {count} entries");
        }
    }
    Ok(())
}

fn edit_entry(session: &mut Session, args: &cli::EditArgs) -> Result<()> {
    let ops = edit::collect_ops(args)?;
    session
        .open(&args.id)
        .with_context(|| format!("no history entry matches {:?}", args.id))?;
    let Some(entry) = session.current() else {
        bail!("entry {} disappeared", args.id);
    };

    let outcome = edit::run_edits(entry.result.clone(), ops);
    let mut preview = entry.clone();
    preview.result = outcome.result.clone();
    print!("{}", display::settlement_card(&preview));

    if args.dry_run {
        println!("\n(dry run, {} edits not saved)", outcome.changed);
        return Ok(());
    }
    if outcome.save {
        session.save_current(outcome.result)?;
        println!("\nsaved {} edits", outcome.changed);
        if outcome.stale {
            println!("stored totals were out of date and have been recomputed");
        }
    } else if outcome.stale {
        println!("\nno changes; stored totals differ from the recomputed ones shown above");
    } else {
        println!("\nno changes");
    }
    Ok(())
}

fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote report");
    println!("{}", path.display());
    Ok(())
}

fn export(session: &Session, args: &ExportArgs) -> Result<()> {
    let (want_pdf, want_xlsx) = match (args.pdf, args.xlsx) {
        (false, false) => (true, true),
        flags => flags,
    };
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    let today = Local::now().date_naive();

    if args.all {
        let entries = session.store().entries();
        if entries.is_empty() {
            bail!("history is empty, nothing to export");
        }
        if want_pdf {
            let results: Vec<_> = entries.iter().map(|e| e.result.clone()).collect();
            let bytes = pdf::render_report(&results, today)?;
            write_file(&args.out, naming::CONSOLIDATED_PDF, &bytes)?;
        }
        if want_xlsx {
            let bytes = xlsx::history_workbook(entries)?;
            write_file(&args.out, naming::HISTORY_XLSX, &bytes)?;
        }
        return Ok(());
    }

    let id = args.id.as_deref().unwrap_or_default();
    let entry = session
        .resolve(id)
        .with_context(|| format!("no history entry matches {id:?}"))?;
    if want_pdf {
        let bytes = pdf::render_report(std::slice::from_ref(&entry.result), today)?;
        write_file(&args.out, &naming::settlement_pdf(&entry.result.claimant), &bytes)?;
    }
    if want_xlsx {
        let bytes = xlsx::settlement_workbook(&entry.result)?;
        write_file(&args.out, &naming::settlement_xlsx(&entry.file_name), &bytes)?;
    }
    Ok(())
}
