use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use log::{info, warn};
use rayon::prelude::*;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use crate::event::{Event, parse_events_json};
use crate::http_cache::app_cache_dir;
use crate::matches::{MatchInfo, parse_matches_json};
use crate::open_data::OpenDataSource;
use crate::source::{Competition, EventSource};

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: Option<PathBuf>,
    pub competition: Competition,
    pub matches_total: usize,
    pub matches_stored: usize,
    pub events_stored: usize,
    pub errors: Vec<String>,
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join("open_data.sqlite"))
}

/// Offline SQLite copy of the raw match listings and event logs.
pub struct EventStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl EventStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store every row of a raw match listing. Returns the match ids stored.
    pub fn store_match_listing(&self, competition: Competition, raw: &str) -> Result<Vec<u64>> {
        let root: Value = serde_json::from_str(raw.trim()).context("invalid matches json")?;
        let rows = root
            .as_array()
            .ok_or_else(|| anyhow!("matches json is not an array"))?;
        let parsed = parse_matches_json(raw)?;

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn();
        let tx = conn.transaction().context("begin match transaction")?;
        let mut ids = Vec::with_capacity(parsed.len());
        for row in rows {
            let Some(id) = row.get("match_id").and_then(|v| v.as_u64()) else {
                continue;
            };
            let Some(info) = parsed.iter().find(|m| m.match_id == id) else {
                continue;
            };
            tx.execute(
                r#"
                INSERT INTO matches (
                    match_id, competition_id, season_id, match_date,
                    home_team, away_team, raw_json, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(match_id) DO UPDATE SET
                    competition_id = excluded.competition_id,
                    season_id = excluded.season_id,
                    match_date = excluded.match_date,
                    home_team = excluded.home_team,
                    away_team = excluded.away_team,
                    raw_json = excluded.raw_json,
                    updated_at = excluded.updated_at
                "#,
                params![
                    id as i64,
                    competition.competition_id as i64,
                    competition.season_id as i64,
                    info.match_date,
                    info.home_team,
                    info.away_team,
                    row.to_string(),
                    now,
                ],
            )
            .context("upsert match")?;
            ids.push(id);
        }
        tx.commit().context("commit match transaction")?;
        Ok(ids)
    }

    /// Store one match's raw event log. Returns the number of parsed events.
    pub fn store_events(&self, match_id: u64, raw: &str) -> Result<usize> {
        let count = parse_events_json(raw)
            .with_context(|| format!("invalid events for match {match_id}"))?
            .len();
        self.conn()
            .execute(
                r#"
                INSERT INTO events (match_id, event_count, raw_json, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(match_id) DO UPDATE SET
                    event_count = excluded.event_count,
                    raw_json = excluded.raw_json,
                    updated_at = excluded.updated_at
                "#,
                params![match_id as i64, count as i64, raw, Utc::now().to_rfc3339()],
            )
            .context("upsert events")?;
        Ok(count)
    }

    pub fn has_events(&self, match_id: u64) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM events WHERE match_id = ?1",
                params![match_id as i64],
                |_| Ok(()),
            )
            .optional()
            .context("query events presence")?;
        Ok(found.is_some())
    }

    /// Ingest from any raw provider: the listing, then each match's events
    /// fetched in parallel and written in turn. Per-match failures are
    /// recorded, not fatal.
    pub fn ingest_with<F>(
        &self,
        competition: Competition,
        listing_raw: &str,
        fetch_events: F,
    ) -> Result<IngestSummary>
    where
        F: Fn(u64) -> Result<String> + Sync,
    {
        let started_at = Utc::now().to_rfc3339();
        let run_id = {
            let conn = self.conn();
            conn.execute(
                "INSERT INTO ingest_runs(started_at, finished_at, competition_id, season_id, matches_total, matches_stored, events_stored, errors_json)
                 VALUES (?1, NULL, ?2, ?3, 0, 0, 0, '[]')",
                params![
                    started_at,
                    competition.competition_id as i64,
                    competition.season_id as i64
                ],
            )
            .context("insert ingest run")?;
            conn.last_insert_rowid()
        };

        let ids = self.store_match_listing(competition, listing_raw)?;
        let fetched: Vec<(u64, Result<String>)> = ids
            .par_iter()
            .map(|id| (*id, fetch_events(*id)))
            .collect();

        let mut matches_stored = 0usize;
        let mut events_stored = 0usize;
        let mut errors = Vec::new();
        for (id, res) in fetched {
            match res.and_then(|raw| self.store_events(id, &raw)) {
                Ok(n) => {
                    matches_stored += 1;
                    events_stored += n;
                }
                Err(err) => {
                    warn!("match {id}: {err:#}");
                    errors.push(format!("match {id}: {err:#}"));
                }
            }
        }

        let errors_json = serde_json::to_string(&errors).unwrap_or_else(|_| "[]".to_string());
        self.conn()
            .execute(
                "UPDATE ingest_runs
                 SET finished_at = ?1, matches_total = ?2, matches_stored = ?3, events_stored = ?4, errors_json = ?5
                 WHERE run_id = ?6",
                params![
                    Utc::now().to_rfc3339(),
                    ids.len() as i64,
                    matches_stored as i64,
                    events_stored as i64,
                    errors_json,
                    run_id
                ],
            )
            .context("update ingest run")?;
        info!(
            "ingested {matches_stored}/{} match(es), {events_stored} event(s)",
            ids.len()
        );

        Ok(IngestSummary {
            db_path: self.path.clone(),
            competition,
            matches_total: ids.len(),
            matches_stored,
            events_stored,
            errors,
        })
    }

    pub fn ingest_competition(
        &self,
        source: &OpenDataSource,
        competition: Competition,
    ) -> Result<IngestSummary> {
        let listing = source.matches_raw(competition)?;
        self.ingest_with(competition, &listing, |id| source.events_raw(id))
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id INTEGER PRIMARY KEY,
            competition_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            match_date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            raw_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_competition ON matches(competition_id, season_id);

        CREATE TABLE IF NOT EXISTS events (
            match_id INTEGER PRIMARY KEY,
            event_count INTEGER NOT NULL,
            raw_json TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            finished_at TEXT NULL,
            competition_id INTEGER NOT NULL,
            season_id INTEGER NOT NULL,
            matches_total INTEGER NOT NULL,
            matches_stored INTEGER NOT NULL,
            events_stored INTEGER NOT NULL,
            errors_json TEXT NOT NULL
        );
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

impl EventSource for EventStore {
    fn matches(&self, competition: Competition) -> Result<Vec<MatchInfo>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT raw_json FROM matches
                 WHERE competition_id = ?1 AND season_id = ?2
                 ORDER BY match_date ASC, match_id ASC",
            )
            .context("prepare load matches query")?;
        let rows = stmt
            .query_map(
                params![
                    competition.competition_id as i64,
                    competition.season_id as i64
                ],
                |row| row.get::<_, String>(0),
            )
            .context("query load matches")?;
        let mut raw_rows = Vec::new();
        for row in rows {
            raw_rows.push(row.context("decode match row")?);
        }
        parse_matches_json(&format!("[{}]", raw_rows.join(",")))
    }

    fn events(&self, match_id: u64) -> Result<Vec<Event>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT raw_json FROM events WHERE match_id = ?1",
                params![match_id as i64],
                |row| row.get(0),
            )
            .optional()
            .context("query events")?;
        let raw = raw.ok_or_else(|| anyhow!("match {match_id} is not in the store"))?;
        parse_events_json(&raw)
    }
}
