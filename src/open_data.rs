use std::env;

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;

use crate::config::DEFAULT_OPEN_DATA_URL;
use crate::event::{Event, parse_events_json};
use crate::http_cache::HttpCache;
use crate::http_client::http_client;
use crate::matches::{MatchInfo, parse_matches_json};
use crate::source::{Competition, EventSource};

/// Public open-data repository over HTTP, behind the conditional-request
/// disk cache.
#[derive(Debug, Clone)]
pub struct OpenDataSource {
    base_url: String,
    cache: HttpCache,
    parallelism: usize,
}

impl Default for OpenDataSource {
    fn default() -> Self {
        Self::new(DEFAULT_OPEN_DATA_URL)
    }
}

impl OpenDataSource {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: HttpCache::default(),
            parallelism: fetch_parallelism(),
        }
    }

    pub fn with_cache(mut self, cache: HttpCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = threads.clamp(1, 32);
        self
    }

    pub fn matches_url(&self, competition: Competition) -> String {
        format!(
            "{}/matches/{}/{}.json",
            self.base_url, competition.competition_id, competition.season_id
        )
    }

    pub fn events_url(&self, match_id: u64) -> String {
        format!("{}/events/{match_id}.json", self.base_url)
    }

    /// Raw JSON body for `url`.
    pub fn fetch_raw(&self, url: &str) -> Result<String> {
        let client = http_client()?;
        self.cache.fetch(client, url)
    }

    pub fn matches_raw(&self, competition: Competition) -> Result<String> {
        self.fetch_raw(&self.matches_url(competition))
            .context("match listing request failed")
    }

    pub fn events_raw(&self, match_id: u64) -> Result<String> {
        self.fetch_raw(&self.events_url(match_id))
            .with_context(|| format!("events request failed for match {match_id}"))
    }

    fn with_fetch_pool<T: Send>(&self, action: impl FnOnce() -> T + Send) -> T {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
        {
            Ok(pool) => pool.install(action),
            Err(err) => {
                warn!("fetch pool unavailable ({err}); fetching on the global pool");
                action()
            }
        }
    }
}

impl EventSource for OpenDataSource {
    fn matches(&self, competition: Competition) -> Result<Vec<MatchInfo>> {
        parse_matches_json(&self.matches_raw(competition)?)
    }

    fn events(&self, match_id: u64) -> Result<Vec<Event>> {
        parse_events_json(&self.events_raw(match_id)?)
            .with_context(|| format!("invalid events for match {match_id}"))
    }

    fn competition_events(&self, competition: Competition) -> Result<Vec<Event>> {
        let matches = self.matches(competition)?;
        let results: Vec<(u64, Result<Vec<Event>>)> = self.with_fetch_pool(|| {
            matches
                .par_iter()
                .map(|m| (m.match_id, self.events(m.match_id)))
                .collect()
        });

        let mut out = Vec::new();
        let mut failed = 0usize;
        for (match_id, res) in results {
            match res {
                Ok(events) => out.extend(events),
                Err(err) => {
                    failed += 1;
                    warn!("skipping match {match_id}: {err:#}");
                }
            }
        }
        info!(
            "loaded {} event(s) from {} match(es), {failed} failed",
            out.len(),
            matches.len() - failed
        );
        Ok(out)
    }
}

fn fetch_parallelism() -> usize {
    env::var("PITCHLENS_FETCH_PARALLELISM")
        .ok()
        .and_then(|val| val.parse::<usize>().ok())
        .unwrap_or(6)
        .clamp(1, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_follow_repository_layout() {
        let src = OpenDataSource::new("https://example.org/data/").with_cache(HttpCache::disabled());
        assert_eq!(
            src.matches_url(Competition::EURO_2024),
            "https://example.org/data/matches/55/282.json"
        );
        assert_eq!(
            src.events_url(3942226),
            "https://example.org/data/events/3942226.json"
        );
    }
}
