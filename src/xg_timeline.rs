use std::collections::HashSet;

use serde::Serialize;

use crate::entity::UNKNOWN;
use crate::error::{Aggregate, AnalyticsError, Unavailable};
use crate::event::{Event, EventKind};

#[derive(Debug, Clone, Serialize)]
pub struct TimelineConfig {
    /// xG assumed for shots the provider left unscored.
    pub default_xg: f64,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { default_xg: 0.05 }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.default_xg.is_finite() || !(0.0..=1.0).contains(&self.default_xg) {
            return Err(AnalyticsError::InvalidThreshold {
                name: "default xG",
                value: self.default_xg,
            });
        }
        Ok(())
    }

    pub fn shot_xg(&self, shot: &Event) -> f64 {
        match shot.shot_xg {
            Some(xg) if xg.is_finite() => xg.clamp(0.0, 1.0),
            _ => self.default_xg,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub minute: u16,
    pub cumulative_xg: f64,
}

/// Step series for one team, starting at `(0, 0.0)` and ending at the
/// match's final minute.
#[derive(Debug, Clone, Serialize)]
pub struct TeamSeries {
    pub team: String,
    pub points: Vec<TimelinePoint>,
    pub shots: usize,
}

impl TeamSeries {
    pub fn total(&self) -> f64 {
        self.points.last().map(|p| p.cumulative_xg).unwrap_or(0.0)
    }

    /// Value of the step function at `minute`.
    pub fn value_at(&self, minute: u16) -> f64 {
        self.points
            .iter()
            .take_while(|p| p.minute <= minute)
            .last()
            .map(|p| p.cumulative_xg)
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalKind {
    Goal,
    OwnGoal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalMarker {
    pub minute: u16,
    pub second: u8,
    /// Team of the player who put the ball in the net.
    pub team: String,
    pub player: String,
    pub kind: GoalKind,
    /// Team credited with the goal.
    pub benefiting_team: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct XgTimeline {
    pub series: Vec<TeamSeries>,
    pub goals: Vec<GoalMarker>,
    pub final_minute: u16,
}

impl XgTimeline {
    pub fn series_for(&self, team: &str) -> Option<&TeamSeries> {
        self.series.iter().find(|s| s.team == team)
    }
}

/// Known teams in the order they first appear.
pub fn teams_in_order(events: &[Event]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for e in events {
        if !e.team.is_unknown() && seen.insert(e.team.name.as_str()) {
            out.push(e.team.name.clone());
        }
    }
    out
}

fn opponent_of(teams: &[String], team: &str) -> String {
    teams
        .iter()
        .find(|t| t.as_str() != team)
        .cloned()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn linked(a: &Event, b: &Event) -> bool {
    a.related_event_ids.iter().any(|id| *id == b.id)
        || b.related_event_ids.iter().any(|id| *id == a.id)
}

/// Distinct rows of one kind, first occurrence of each id kept.
fn own_goal_rows(events: &[Event], kind: EventKind) -> Vec<&Event> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter(|e| e.kind == kind && seen.insert(e.id.as_str()))
        .collect()
}

/// One marker per own goal. Markers come from "Own Goal For" rows; the
/// "Own Goal Against" row only supplies the scorer. Rows pair through their
/// related-event links first, then unlinked rows pair by identical clock and
/// opposing teams. An "Against" row with no "For" partner still yields a
/// marker. Each row is consumed once.
pub fn own_goal_markers(events: &[Event]) -> Vec<GoalMarker> {
    let teams = teams_in_order(events);
    let fors = own_goal_rows(events, EventKind::OwnGoalFor);
    let againsts = own_goal_rows(events, EventKind::OwnGoalAgainst);

    let mut partner: Vec<Option<usize>> = vec![None; fors.len()];
    let mut taken = vec![false; againsts.len()];
    for (i, f) in fors.iter().enumerate() {
        if let Some(j) = (0..againsts.len()).find(|&j| !taken[j] && linked(f, againsts[j])) {
            taken[j] = true;
            partner[i] = Some(j);
        }
    }
    for (i, f) in fors.iter().enumerate() {
        if partner[i].is_some() {
            continue;
        }
        let same_goal = |a: &Event| a.clock() == f.clock() && a.team.name != f.team.name;
        if let Some(j) = (0..againsts.len()).find(|&j| !taken[j] && same_goal(againsts[j])) {
            taken[j] = true;
            partner[i] = Some(j);
        }
    }

    let mut out: Vec<GoalMarker> = fors
        .iter()
        .zip(&partner)
        .map(|(f, p)| {
            let against = p.map(|j| againsts[j]);
            let (team, player) = match against {
                Some(a) => (a.team.name.clone(), a.player.name.clone()),
                None => (UNKNOWN.to_string(), UNKNOWN.to_string()),
            };
            let (minute, second) = against.unwrap_or(*f).clock();
            GoalMarker {
                minute,
                second,
                team,
                player,
                kind: GoalKind::OwnGoal,
                benefiting_team: f.team.name.clone(),
            }
        })
        .collect();

    for (a, _) in againsts.iter().zip(&taken).filter(|(_, t)| !**t) {
        out.push(GoalMarker {
            minute: a.minute,
            second: a.second,
            team: a.team.name.clone(),
            player: a.player.name.clone(),
            kind: GoalKind::OwnGoal,
            benefiting_team: opponent_of(&teams, &a.team.name),
        });
    }
    out.sort_by_key(|m| (m.minute, m.second));
    out
}

/// Scored shots and own goals, ordered by minute then by the order teams
/// first appear in the input.
pub fn goal_markers(events: &[Event]) -> Vec<GoalMarker> {
    let teams = teams_in_order(events);
    let mut markers: Vec<GoalMarker> = events
        .iter()
        .filter(|e| e.is_goal())
        .map(|e| GoalMarker {
            minute: e.minute,
            second: e.second,
            team: e.team.name.clone(),
            player: e.player.name.clone(),
            kind: GoalKind::Goal,
            benefiting_team: e.team.name.clone(),
        })
        .collect();
    markers.extend(own_goal_markers(events));

    let rank = |team: &str| teams.iter().position(|t| t == team).unwrap_or(usize::MAX);
    markers.sort_by_key(|m| (m.minute, rank(&m.team)));
    markers
}

pub fn build_xg_timeline(events: &[Event], cfg: &TimelineConfig) -> Aggregate<XgTimeline> {
    let shots: Vec<&Event> = events.iter().filter(|e| e.kind == EventKind::Shot).collect();
    let goals = goal_markers(events);
    if shots.is_empty() && goals.is_empty() {
        return Unavailable::Empty.into();
    }

    let final_minute = events.iter().map(|e| e.minute).max().unwrap_or(0);
    let mut series = Vec::new();
    for team in teams_in_order(events) {
        let mut team_shots: Vec<&Event> =
            shots.iter().copied().filter(|s| s.team.is(&team)).collect();
        team_shots.sort_by_key(|s| s.clock());

        let mut points = vec![TimelinePoint {
            minute: 0,
            cumulative_xg: 0.0,
        }];
        let mut total = 0.0;
        for shot in &team_shots {
            total += cfg.shot_xg(shot);
            // The leading (0, 0) point is never merged into.
            let n = points.len();
            if n > 1 && points[n - 1].minute == shot.minute {
                points[n - 1].cumulative_xg = total;
            } else {
                points.push(TimelinePoint {
                    minute: shot.minute,
                    cumulative_xg: total,
                });
            }
        }
        if points.last().is_some_and(|p| p.minute < final_minute) {
            points.push(TimelinePoint {
                minute: final_minute,
                cumulative_xg: total,
            });
        }
        series.push(TeamSeries {
            team,
            points,
            shots: team_shots.len(),
        });
    }

    Aggregate::Ready(XgTimeline {
        series,
        goals,
        final_minute,
    })
}
