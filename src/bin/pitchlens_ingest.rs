use std::path::PathBuf;

use anyhow::{Context, Result};

use pitchlens::config::AnalyticsConfig;
use pitchlens::event_store::{EventStore, default_db_path};
use pitchlens::open_data::OpenDataSource;
use pitchlens::source::Competition;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cfg = AnalyticsConfig::from_env()?;
    let competition = Competition::new(
        parse_id_arg("--competition").unwrap_or(Competition::EURO_2024.competition_id),
        parse_id_arg("--season").unwrap_or(Competition::EURO_2024.season_id),
    );
    let db_path = parse_db_path_arg()
        .or_else(default_db_path)
        .context("unable to resolve sqlite path")?;

    let store = EventStore::open(&db_path)?;
    let mut source = OpenDataSource::new(&cfg.open_data_url);
    if let Some(threads) = parse_id_arg("--threads") {
        source = source.with_parallelism(threads as usize);
    }
    let summary = store.ingest_competition(&source, competition)?;

    println!("Open-data ingest complete");
    println!("DB: {}", db_path.display());
    println!(
        "Competition: {} season {}",
        summary.competition.competition_id, summary.competition.season_id
    );
    println!(
        "Matches stored: {}/{}",
        summary.matches_stored, summary.matches_total
    );
    println!("Events stored: {}", summary.events_stored);
    if !summary.errors.is_empty() {
        println!("errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(6) {
            println!(" - {err}");
        }
    }
    Ok(())
}

fn parse_db_path_arg() -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix("--db=") {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == "--db"
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(PathBuf::from(next));
        }
    }
    None
}

fn parse_id_arg(flag: &str) -> Option<u32> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            return raw.trim().parse().ok();
        }
        if arg == flag {
            return args.get(idx + 1).and_then(|v| v.trim().parse().ok());
        }
    }
    None
}
