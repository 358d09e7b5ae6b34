//! CLI entrypoint for `leakdb-import`.
//!
//! Validates the leak metadata, parses the dump through the library parser,
//! asks for confirmation when lines were rejected, stores the import in one
//! transaction, prints a terminal summary, and finally notifies the webhook
//! when one is configured.
use std::collections::HashSet;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use leakdb::{
    dump::ParseError,
    export::save_rejected_lines_csv,
    io::{DEFAULT_MMAP_THRESHOLD_BYTES, read_lines_auto},
    leak::{BadActor, DateInSeconds, Import, Leak, Platform},
    notify::Notifier,
    parser::{DEFAULT_CHUNK_SIZE, DumpParser},
    report::render_summary_with_top,
    stats::import_stats,
    store::Store,
};
use log::{LevelFilter, error, info, warn};

/// Above this many rejected lines only the count is logged.
const MAX_LOGGED_ERRORS: usize = 20_000;

#[derive(Parser, Debug)]
#[command(
    name = "leakdb-import",
    version,
    about = "Import a leaked credentials dump into a normalized SQLite database"
)]
struct Args {
    /// Path to the SQLite database (created when missing)
    #[arg(long = "database-path", visible_alias = "db", env = "LEAKDB_DATABASE_PATH")]
    database_path: PathBuf,

    /// Path to the leak dump (one identifier/secret pair per line)
    #[arg(long = "leak-path", visible_alias = "lp")]
    leak_path: PathBuf,

    /// Free-text context describing the leak
    #[arg(short = 'c', long = "context")]
    context: String,

    /// Date the leak was shared, as YYYY-MM-DD
    #[arg(long = "share-date", visible_alias = "sd")]
    share_date: String,

    /// Comma separated identifiers of the actors behind the leak
    #[arg(short = 'l', long = "leakers", value_delimiter = ',', required = true)]
    leakers: Vec<String>,

    /// Comma separated platforms affected by the leak
    #[arg(
        short = 'p',
        long = "platforms",
        value_delimiter = ',',
        default_value = "Unknown"
    )]
    platforms: Vec<String>,

    /// Webhook notified with the new leak key after a successful import
    #[arg(long = "notify-url", env = "LEAKDB_NOTIFY_URL")]
    notify_url: Option<String>,

    /// Import without asking when some lines were rejected
    #[arg(short = 'y', long = "skip-interactive")]
    skip_interactive: bool,

    /// Maximum number of lines handed to one parse worker
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Override mmap threshold in bytes. If zero, disable mmap.
    #[arg(long = "mmap-threshold", default_value_t = DEFAULT_MMAP_THRESHOLD_BYTES)]
    mmap_threshold: u64,

    /// Write rejected lines to this CSV file
    #[arg(long = "errors-out")]
    errors_out: Option<PathBuf>,

    /// Limit number of entries in "Top Reused Passwords"
    #[arg(long = "top", default_value_t = 10)]
    top_limit: usize,

    /// Control color output (auto, always, never)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Suppress summary output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn init_logger(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .try_init();
}

fn verify_inputs(args: &Args) -> Result<()> {
    if !args.leak_path.is_file() {
        bail!("leak file not found: {}", args.leak_path.display());
    }
    if args.leakers.iter().all(|l| l.trim().is_empty()) {
        bail!("at least one leaker is required (-l/--leakers)");
    }
    if args.chunk_size == 0 {
        bail!("--chunk-size must be at least 1");
    }
    Ok(())
}

/// Trimmed, non-empty values in first-seen order.
fn distinct(values: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty() && seen.insert(*v))
        .collect()
}

fn build_import(args: &Args) -> Result<Import> {
    let share_date = DateInSeconds::parse(&args.share_date).context("invalid --share-date")?;
    let leak = Leak::new(&args.context, share_date).context("invalid --context")?;
    let affected_platforms = distinct(&args.platforms)
        .into_iter()
        .map(Platform::new)
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --platforms")?;
    let leakers = distinct(&args.leakers)
        .into_iter()
        .map(BadActor::new)
        .collect::<Result<Vec<_>, _>>()
        .context("invalid --leakers")?;
    Ok(Import {
        leak,
        affected_users: Default::default(),
        affected_platforms,
        leakers,
    })
}

fn report_errors(errors: &[ParseError]) {
    if errors.len() > MAX_LOGGED_ERRORS {
        warn!(
            "{} lines were rejected (too many to list individually)",
            errors.len()
        );
        return;
    }
    for err in errors {
        warn!("{}", err);
    }
}

/// Ask on stdin whether to continue. Only `y` and `yes` count as consent.
fn confirm_proceed() -> Result<bool> {
    print!("Proceed with import? [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);
    // Configure color policy
    match args.color {
        ColorChoice::Always => {
            colored::control::set_override(true);
        }
        ColorChoice::Never => {
            colored::control::set_override(false);
        }
        ColorChoice::Auto => {}
    }
    if let Err(e) = verify_inputs(&args) {
        error!("{}", e);
        process::exit(2);
    }
    let mut import = match build_import(&args) {
        Ok(import) => import,
        Err(e) => {
            error!("{:#}", e);
            process::exit(2);
        }
    };

    let threshold = if args.mmap_threshold == 0 {
        u64::MAX
    } else {
        args.mmap_threshold
    };
    let lines = match read_lines_auto(&args.leak_path, threshold) {
        Ok(lines) => lines,
        Err(e) => {
            error!("failed to read {}: {:#}", args.leak_path.display(), e);
            process::exit(3);
        }
    };
    let outcome = DumpParser::new()
        .with_chunk_size(args.chunk_size)
        .parse(&lines);
    if outcome.is_fatal() {
        for err in &outcome.errors {
            error!("{}", err);
        }
        process::exit(3);
    }
    if !outcome.errors.is_empty() {
        report_errors(&outcome.errors);
        if let Some(path) = &args.errors_out {
            if let Err(e) = save_rejected_lines_csv(&outcome.errors, path) {
                error!("failed to write {}: {:#}", path.display(), e);
                process::exit(5);
            }
            info!("rejected lines written to {}", path.display());
        }
        if !args.skip_interactive {
            match confirm_proceed() {
                Ok(true) => {}
                Ok(false) => {
                    println!("Import cancelled.");
                    return;
                }
                Err(e) => {
                    error!("failed to read answer: {}", e);
                    process::exit(2);
                }
            }
        }
    }
    let rejected = outcome.errors.len();
    import.affected_users = outcome.affected_users;

    let leak_id = match Store::open(&args.database_path).and_then(|mut s| s.insert(&import)) {
        Ok(key) => key,
        Err(e) => {
            error!("import failed, nothing was stored: {}", e);
            process::exit(4);
        }
    };

    if !args.quiet {
        let stats = import_stats(&import, lines.len(), rejected);
        println!(
            "{}",
            render_summary_with_top(&import, leak_id, &stats, args.top_limit)
        );
    }

    if let Some(url) = &args.notify_url {
        let sent = Notifier::new(url.as_str()).and_then(|n| n.notify_new_leak(leak_id));
        if let Err(e) = sent {
            error!("leak {} was imported but {}", leak_id, e);
            process::exit(6);
        }
    }
}
