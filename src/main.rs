use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::Parser;
use log::info;

use crate::account::AccountTree;
use crate::error::{Kind, LedgerError};
use crate::misc::BetweenDate;
use crate::transaction::Transaction;

pub mod account;
pub mod amount;
pub mod balance;
pub mod classify;
pub mod error;
pub mod misc;
pub mod proportion;
pub mod query_sink;
pub mod reformat;
pub mod render;
pub mod report;
pub mod tokenizer;
pub mod transaction;

#[derive(Parser)]
#[command(author, about, long_about = None)]
struct Cli {
    /// Path to the plain-text ledger file.
    file: PathBuf,

    /// Only consider transactions on or after this date.
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Only consider transactions on or before this date.
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Shortcut for `--from` and `--to` both set to today.
    #[arg(long)]
    today: bool,

    /// Shortcut for `--from`/`--to` spanning the current calendar month.
    #[arg(long = "this-month")]
    this_month: bool,

    /// Suppress amounts in the tree report, showing only proportions.
    #[arg(long = "no-amount")]
    no_amount: bool,

    /// Route the parsed ledger into the query-view sink instead of
    /// printing a report.
    #[arg(long)]
    sql: bool,

    /// Show the date-ordered list of transactions touching item-kind
    /// accounts instead of the tree report.
    #[arg(long)]
    props: bool,

    /// Show per-month expense totals grouped by currency instead of the
    /// tree report.
    #[arg(long)]
    monthly: bool,

    /// Increase log verbosity (`-v` info, `-vv` debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Skip the background canonical-reformat pass.
    #[arg(long = "no-format")]
    no_format: bool,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{}", err.render_chain());
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();
}

fn run(cli: Cli) -> Result<(), LedgerError> {
    let original = fs::read_to_string(&cli.file)
        .map_err(|e| LedgerError::with_source(Kind::ReadInput, cli.file.display().to_string(), e))?;
    let original = Arc::new(original);

    let blocks = crate::tokenizer::tokenize(&original);
    info!("tokenized {} block(s)", blocks.len());
    let blocks = Arc::new(blocks);

    let format_handle = if cli.no_format {
        None
    } else {
        Some(crate::reformat::spawn(
            cli.file.clone(),
            Arc::clone(&original),
            Arc::clone(&blocks),
        ))
    };

    let mut tree = AccountTree::new();
    let transactions = crate::transaction::parse_transactions(&blocks, &mut tree)?;
    let synthesized = transactions
        .iter()
        .flat_map(|t| &t.entries)
        .filter(|e| e.synthetic)
        .count();
    info!(
        "parsed {} transaction(s), {} account(s), {} synthesized entry(ies)",
        transactions.len(),
        tree.len(),
        synthesized
    );

    let between = date_window(&cli);
    let filtered: Vec<Transaction> = transactions
        .into_iter()
        .filter(|t| between.check_padded(t.header_date))
        .collect();
    info!("{} transaction(s) within the date window", filtered.len());

    crate::balance::accumulate(&mut tree, &filtered)?;
    crate::proportion::compute(&mut tree);

    if cli.sql {
        let conn = crate::query_sink::load(&tree, &filtered)?;
        info!("loaded {} view(s) into the query sink", crate::query_sink::VIEWS.len());
        drop(conn);
    } else if cli.props {
        println!("{}", crate::report::props_report(&tree, &filtered));
    } else if cli.monthly {
        print!("{}", crate::report::monthly_report(&tree, &filtered));
    } else {
        print!("{}", crate::render::render(&tree, cli.no_amount));
    }

    if let Some(handle) = format_handle {
        if let Ok(Some(msg)) = handle.join() {
            info!("{msg}");
        }
    }

    Ok(())
}

fn date_window(cli: &Cli) -> BetweenDate {
    if cli.today {
        let t = crate::misc::today();
        return BetweenDate::new(Some(t), Some(t));
    }
    if cli.this_month {
        let (first, last) = crate::misc::month_bounds(crate::misc::today());
        return BetweenDate::new(Some(first), Some(last));
    }
    BetweenDate::new(cli.from, cli.to)
}

