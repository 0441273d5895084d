use std::collections::BTreeMap;

use serde::Serialize;

use crate::entity::UNKNOWN;
use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter, EventKind};
use crate::success_rate::{ActionSuccess, player_success_rates};
use crate::xg_timeline::{GoalKind, TimelineConfig, goal_markers, teams_in_order};

pub type KindCounts = BTreeMap<String, usize>;

#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub total_events: usize,
    pub event_types: KindCounts,
    pub teams: Vec<String>,
    pub players: Vec<String>,
    pub first_clock: (u16, u8),
    pub last_clock: (u16, u8),
}

impl MatchSummary {
    /// Elapsed match time between first and last event, in seconds.
    pub fn duration_secs(&self) -> u32 {
        let secs = |(m, s): (u16, u8)| m as u32 * 60 + s as u32;
        secs(self.last_clock).saturating_sub(secs(self.first_clock))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSummary {
    pub team: String,
    pub total_events: usize,
    pub event_types: KindCounts,
    pub players: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSummary {
    pub player: String,
    pub team: String,
    pub total_events: usize,
    pub event_types: KindCounts,
    pub positions: Vec<String>,
}

fn kind_counts(events: &[&Event]) -> KindCounts {
    let mut out = KindCounts::new();
    for e in events {
        *out.entry(e.kind.as_str().to_string()).or_insert(0) += 1;
    }
    out
}

fn known_players(events: &[&Event]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for e in events {
        if !e.player.is_unknown() && !out.contains(&e.player.name) {
            out.push(e.player.name.clone());
        }
    }
    out
}

pub fn match_summary(events: &[Event]) -> Aggregate<MatchSummary> {
    if events.is_empty() {
        return Unavailable::Empty.into();
    }
    let all: Vec<&Event> = events.iter().collect();
    let first_clock = events.iter().map(|e| e.clock()).min().unwrap_or((0, 0));
    let last_clock = events.iter().map(|e| e.clock()).max().unwrap_or((0, 0));
    Aggregate::Ready(MatchSummary {
        total_events: events.len(),
        event_types: kind_counts(&all),
        teams: teams_in_order(events),
        players: known_players(&all),
        first_clock,
        last_clock,
    })
}

pub fn team_summary(events: &[Event], team: &str) -> Aggregate<TeamSummary> {
    let selected = EventFilter::team(team).apply(events);
    if selected.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(TeamSummary {
        team: team.to_string(),
        total_events: selected.len(),
        event_types: kind_counts(&selected),
        players: known_players(&selected),
    })
}

pub fn player_summary(events: &[Event], player: &str) -> Aggregate<PlayerSummary> {
    let selected = EventFilter::player(player).apply(events);
    let Some(first) = selected.first() else {
        return Unavailable::Empty.into();
    };
    let mut positions: Vec<String> = Vec::new();
    for e in &selected {
        if let Some(pos) = e.position.as_ref()
            && !pos.is_unknown()
            && !positions.contains(&pos.name)
        {
            positions.push(pos.name.clone());
        }
    }
    Aggregate::Ready(PlayerSummary {
        player: player.to_string(),
        team: first.team.name.clone(),
        total_events: selected.len(),
        event_types: kind_counts(&selected),
        positions,
    })
}

/// Sorted unique known players in `events`.
fn sorted_players(events: &[&Event]) -> Vec<String> {
    let mut out = known_players(events);
    out.sort();
    out
}

/// Every known player who appears for `team`, sorted.
pub fn team_players(events: &[Event], team: &str) -> Aggregate<Vec<String>> {
    let players = sorted_players(&EventFilter::team(team).apply(events));
    if players.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(players)
}

/// Every known player in the event set, sorted. Pass a whole competition's
/// events to list the tournament.
pub fn all_players(events: &[Event]) -> Aggregate<Vec<String>> {
    let all: Vec<&Event> = events.iter().collect();
    let players = sorted_players(&all);
    if players.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(players)
}

/// Ceilings used to put volume metrics on a 0-100 scale, in display order.
pub const VOLUME_CEILINGS: [(&str, f64); 6] = [
    ("Goals", 3.0),
    ("Shots", 25.0),
    ("Passes", 562.0),
    ("Dribbles", 32.0),
    ("Duels", 31.0),
    ("Interceptions", 12.0),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeMetric {
    pub name: &'static str,
    pub value: u32,
    /// `value` against its ceiling, capped at 100.
    pub normalized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub player: String,
    pub team: String,
    pub goals: u32,
    pub shots: u32,
    pub passes: u32,
    pub successful_passes: u32,
    pub pass_accuracy: f64,
    /// Goals per shot, as a percentage.
    pub shot_accuracy: f64,
    pub total_actions: usize,
    pub volume: Vec<VolumeMetric>,
    pub success: Vec<ActionSuccess>,
}

impl PlayerProfile {
    pub fn metric(&self, name: &str) -> Option<&VolumeMetric> {
        self.volume.iter().find(|m| m.name == name)
    }
}

fn percent(n: u32, d: u32) -> f64 {
    if d == 0 { 0.0 } else { n as f64 / d as f64 * 100.0 }
}

/// Headline numbers, normalized volume metrics and success rates for one
/// player.
pub fn player_profile(events: &[Event], player: &str) -> Aggregate<PlayerProfile> {
    let selected = EventFilter::player(player).apply(events);
    let Some(first) = selected.first() else {
        return Unavailable::Empty.into();
    };
    let count = |kind: EventKind| selected.iter().filter(|e| e.kind == kind).count() as u32;
    let goals = selected.iter().filter(|e| e.is_goal()).count() as u32;
    let shots = count(EventKind::Shot);
    let passes = count(EventKind::Pass);
    let successful_passes = selected.iter().filter(|e| e.is_successful_pass()).count() as u32;

    let values = [
        goals,
        shots,
        passes,
        count(EventKind::Dribble),
        count(EventKind::Duel),
        count(EventKind::Interception),
    ];
    let volume = VOLUME_CEILINGS
        .iter()
        .zip(values)
        .map(|(&(name, ceiling), value)| VolumeMetric {
            name,
            value,
            normalized: (value as f64 / ceiling * 100.0).min(100.0),
        })
        .collect();

    Aggregate::Ready(PlayerProfile {
        player: player.to_string(),
        team: first.team.name.clone(),
        goals,
        shots,
        passes,
        successful_passes,
        pass_accuracy: percent(successful_passes, passes),
        shot_accuracy: percent(goals, shots),
        total_actions: selected.len(),
        volume,
        success: player_success_rates(events, player).ready().unwrap_or_default(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerComparison {
    pub primary: PlayerProfile,
    /// Absent when the second player is the primary one or has no events.
    pub other: Option<PlayerProfile>,
}

pub fn compare_players(events: &[Event], primary: &str, other: &str) -> Aggregate<PlayerComparison> {
    player_profile(events, primary).map(|primary_profile| PlayerComparison {
        other: (other != primary)
            .then(|| player_profile(events, other).ready())
            .flatten(),
        primary: primary_profile,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CardKind {
    Yellow,
    SecondYellow,
    Red,
}

impl CardKind {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("second") {
            CardKind::SecondYellow
        } else if lower.contains("red") {
            CardKind::Red
        } else {
            CardKind::Yellow
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CardKind::Yellow => "Yellow Card",
            CardKind::SecondYellow => "Second Yellow (Red)",
            CardKind::Red => "Red Card",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum KeyEventKind {
    Goal,
    OwnGoal,
    Card(CardKind),
    Substitution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyEvent {
    pub minute: u16,
    pub second: u8,
    pub kind: KeyEventKind,
    pub team: String,
    pub player: String,
    pub description: String,
}

/// Goals, own goals, cards and substitutions in match order.
pub fn key_events(events: &[Event]) -> Vec<KeyEvent> {
    let mut out: Vec<KeyEvent> = goal_markers(events)
        .into_iter()
        .map(|g| {
            let (kind, description) = match g.kind {
                GoalKind::Goal => (KeyEventKind::Goal, format!("Goal by {}", g.player)),
                GoalKind::OwnGoal => (
                    KeyEventKind::OwnGoal,
                    format!("Own goal by {} (for {})", g.player, g.benefiting_team),
                ),
            };
            KeyEvent {
                minute: g.minute,
                second: g.second,
                kind,
                team: g.team,
                player: g.player,
                description,
            }
        })
        .collect();

    for e in events {
        if let Some(card) = e.card.as_deref() {
            let kind = CardKind::from_name(card);
            out.push(KeyEvent {
                minute: e.minute,
                second: e.second,
                kind: KeyEventKind::Card(kind),
                team: e.team.name.clone(),
                player: e.player.name.clone(),
                description: format!("{} for {}", kind.label(), e.player),
            });
        }
        if e.kind == EventKind::Substitution {
            let on = e
                .substitution_replacement
                .as_ref()
                .map(|r| r.name.as_str())
                .unwrap_or(UNKNOWN);
            out.push(KeyEvent {
                minute: e.minute,
                second: e.second,
                kind: KeyEventKind::Substitution,
                team: e.team.name.clone(),
                player: on.to_string(),
                description: format!("{on} on for {}", e.player),
            });
        }
    }

    out.sort_by_key(|k| (k.minute, k.second));
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamComparison {
    pub team: String,
    pub shots: u32,
    pub shots_on_target: u32,
    pub passes: u32,
    pub successful_passes: u32,
    pub failed_passes: u32,
    pub pass_accuracy: f64,
    /// Share of all passes in the match, as a possession proxy.
    pub possession: f64,
    pub xg: f64,
    pub goals: u32,
    pub tackles: u32,
    pub dribbles: u32,
    pub fouls: u32,
}

const ON_TARGET: &[&str] = &["Goal", "Saved"];

pub fn team_comparison(events: &[Event], cfg: &TimelineConfig) -> Aggregate<Vec<TeamComparison>> {
    let teams = teams_in_order(events);
    if teams.is_empty() {
        return Unavailable::Empty.into();
    }
    let goals = goal_markers(events);
    let all_passes = events.iter().filter(|e| e.kind == EventKind::Pass).count();

    let rows = teams
        .into_iter()
        .map(|team| {
            let own: Vec<&Event> = events.iter().filter(|e| e.team.is(&team)).collect();
            let count = |kind: EventKind| own.iter().filter(|e| e.kind == kind).count() as u32;
            let shots: Vec<&&Event> = own.iter().filter(|e| e.kind == EventKind::Shot).collect();
            let passes = count(EventKind::Pass);
            let successful_passes = own.iter().filter(|e| e.is_successful_pass()).count() as u32;
            let pct = |n: u32, d: usize| if d == 0 { 0.0 } else { n as f64 / d as f64 * 100.0 };
            TeamComparison {
                shots: shots.len() as u32,
                shots_on_target: shots
                    .iter()
                    .filter(|s| s.shot_outcome.as_deref().is_some_and(|o| ON_TARGET.contains(&o)))
                    .count() as u32,
                passes,
                successful_passes,
                failed_passes: passes - successful_passes,
                pass_accuracy: pct(successful_passes, passes as usize),
                possession: pct(passes, all_passes),
                xg: shots.iter().map(|s| cfg.shot_xg(s)).sum(),
                goals: goals.iter().filter(|g| g.benefiting_team == team).count() as u32,
                tackles: count(EventKind::Tackle),
                dribbles: count(EventKind::Dribble),
                fouls: count(EventKind::FoulCommitted),
                team,
            }
        })
        .collect();
    Aggregate::Ready(rows)
}
