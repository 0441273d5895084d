use std::collections::BTreeSet;

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::entity::Entity;

#[derive(Debug, Clone, Serialize)]
pub struct MatchInfo {
    pub match_id: u64,
    pub match_date: String,
    pub kick_off: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u8>,
    pub away_score: Option<u8>,
    pub competition: Option<String>,
    pub season: Option<String>,
    pub stage: Option<String>,
}

impl MatchInfo {
    pub fn involves(&self, team: &str) -> bool {
        self.home_team == team || self.away_team == team
    }

    pub fn goals(&self) -> Option<u32> {
        Some(self.home_score? as u32 + self.away_score? as u32)
    }

    pub fn label(&self) -> String {
        match (self.home_score, self.away_score) {
            (Some(h), Some(a)) => format!(
                "{} {} {h}-{a} {}",
                self.match_date, self.home_team, self.away_team
            ),
            _ => format!("{} {} v {}", self.match_date, self.home_team, self.away_team),
        }
    }
}

/// Parse a match listing. Accepts the nested open-data shape
/// (`home_team: {home_team_name}`) and flat rows (`home_team: "Spain"`).
pub fn parse_matches_json(raw: &str) -> Result<Vec<MatchInfo>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid matches json")?;
    let Some(rows) = root.as_array() else {
        return Err(anyhow::anyhow!("matches json is not an array"));
    };

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match parse_match(row) {
            Some(m) => out.push(m),
            None => warn!("skipping match row without id or teams"),
        }
    }
    out.sort_by_key(|m| m.match_id);
    out.dedup_by_key(|m| m.match_id);
    Ok(out)
}

fn parse_match(v: &Value) -> Option<MatchInfo> {
    let match_id = v.get("match_id")?.as_u64()?;
    let home_team = side_name(v.get("home_team")?, "home_team_name")?;
    let away_team = side_name(v.get("away_team")?, "away_team_name")?;
    let text = |key: &str| v.get(key).and_then(|x| x.as_str()).map(|s| s.to_string());
    let score = |key: &str| {
        v.get(key)
            .and_then(|x| x.as_u64())
            .and_then(|n| u8::try_from(n).ok())
    };
    let nested = |key: &str, inner: &str| {
        match v.get(key) {
            Some(Value::Object(map)) => map.get(inner).and_then(|x| x.as_str()).map(|s| s.to_string()),
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    };

    Some(MatchInfo {
        match_id,
        match_date: text("match_date").unwrap_or_default(),
        kick_off: text("kick_off"),
        home_team,
        away_team,
        home_score: score("home_score"),
        away_score: score("away_score"),
        competition: nested("competition", "competition_name"),
        season: nested("season", "season_name"),
        stage: nested("competition_stage", "name"),
    })
}

fn side_name(v: &Value, nested_key: &str) -> Option<String> {
    let name = match v {
        Value::Object(map) => Entity::resolve(map.get(nested_key).or_else(|| map.get("name"))),
        other => Entity::resolve(Some(other)),
    };
    (!name.is_unknown()).then_some(name.name)
}

pub fn team_matches<'a>(matches: &'a [MatchInfo], team: &str) -> Vec<&'a MatchInfo> {
    matches.iter().filter(|m| m.involves(team)).collect()
}

/// Most recent match for `team` by date, then kick-off.
pub fn latest_match_id(matches: &[MatchInfo], team: &str) -> Option<u64> {
    team_matches(matches, team)
        .into_iter()
        .max_by(|a, b| {
            (a.match_date.as_str(), a.kick_off.as_deref())
                .cmp(&(b.match_date.as_str(), b.kick_off.as_deref()))
        })
        .map(|m| m.match_id)
}

pub fn all_teams(matches: &[MatchInfo]) -> Vec<String> {
    let set: BTreeSet<&str> = matches
        .iter()
        .flat_map(|m| [m.home_team.as_str(), m.away_team.as_str()])
        .collect();
    set.into_iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TournamentStats {
    pub total_matches: usize,
    pub total_teams: usize,
    pub total_goals: u32,
    pub goals_per_match: f64,
}

/// Totals over played matches. Unplayed fixtures count as matches but add no
/// goals.
pub fn tournament_stats(matches: &[MatchInfo]) -> TournamentStats {
    let total_goals: u32 = matches.iter().filter_map(|m| m.goals()).sum();
    let goals_per_match = if matches.is_empty() {
        0.0
    } else {
        total_goals as f64 / matches.len() as f64
    };
    TournamentStats {
        total_matches: matches.len(),
        total_teams: all_teams(matches).len(),
        total_goals,
        goals_per_match,
    }
}
