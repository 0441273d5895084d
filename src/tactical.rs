//! Formation, attacking and set-piece views for one team.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::coords::Point;
use crate::entity::UNKNOWN;
use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter, EventKind};
use crate::spatial::{ZoneSplit, located_points, zone_split_points};
use crate::xg_timeline::TimelineConfig;

/// Last minute (inclusive) used for the starting-shape view.
pub const STARTING_SHAPE_MINUTES: u16 = 15;
pub const FINAL_THIRD_X: f64 = 80.0;
pub const SET_PIECE_TYPES: &[&str] = &["Corner", "Free Kick", "Throw-in"];

const FINAL_THIRD_KINDS: &[EventKind] = &[EventKind::Shot, EventKind::Dribble, EventKind::Pass];
const SUMMARY_DEFENSIVE_KINDS: &[EventKind] = &[
    EventKind::Tackle,
    EventKind::Interception,
    EventKind::Block,
    EventKind::Clearance,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapePosition {
    pub player: String,
    pub position: String,
    pub average_x: f64,
    pub average_y: f64,
    pub samples: usize,
}

/// Average location per player over the opening minutes, labelled with the
/// first position recorded for them in that window.
pub fn starting_shape(events: &[Event], team: &str) -> Aggregate<Vec<ShapePosition>> {
    let window = EventFilter::team(team).with_minutes(0, STARTING_SHAPE_MINUTES);
    let selected = window.apply(events);
    if selected.is_empty() {
        return Unavailable::Empty.into();
    }

    let mut acc: BTreeMap<&str, (Option<&str>, Vec<Point>)> = BTreeMap::new();
    for e in selected.iter().filter(|e| !e.player.is_unknown()) {
        let slot = acc.entry(e.player.name.as_str()).or_insert((None, Vec::new()));
        if slot.0.is_none() {
            slot.0 = e.position.as_ref().map(|p| p.name.as_str());
        }
        if let Some(p) = e.location.point() {
            slot.1.push(p);
        }
    }

    let shape: Vec<ShapePosition> = acc
        .into_iter()
        .filter(|(_, (_, pts))| !pts.is_empty())
        .map(|(player, (position, pts))| {
            let n = pts.len() as f64;
            ShapePosition {
                player: player.to_string(),
                position: position.unwrap_or(UNKNOWN).to_string(),
                average_x: pts.iter().map(|p| p.x).sum::<f64>() / n,
                average_y: pts.iter().map(|p| p.y).sum::<f64>() / n,
                samples: pts.len(),
            }
        })
        .collect();
    if shape.is_empty() {
        return Unavailable::MissingField("location").into();
    }
    Aggregate::Ready(shape)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPoint {
    pub kind: EventKind,
    pub player: String,
    pub minute: u16,
    pub point: Point,
}

pub fn final_third_actions(events: &[Event], team: &str) -> Aggregate<Vec<ActionPoint>> {
    let filter = EventFilter::team(team).with_kinds(FINAL_THIRD_KINDS);
    let selected = filter.apply(events);
    if selected.is_empty() {
        return Unavailable::Empty.into();
    }
    let points: Vec<ActionPoint> = selected
        .into_iter()
        .filter_map(|e| {
            let point = e.location.point().filter(|p| p.x > FINAL_THIRD_X)?;
            Some(ActionPoint {
                kind: e.kind.clone(),
                player: e.player.name.clone(),
                minute: e.minute,
                point,
            })
        })
        .collect();
    if points.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(points)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetPieceCount {
    pub kind: String,
    pub count: usize,
}

/// Set-piece passes by type, most frequent first.
pub fn set_piece_counts(events: &[Event], team: &str) -> Aggregate<Vec<SetPieceCount>> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for e in events {
        if e.kind != EventKind::Pass || !e.team.is(team) {
            continue;
        }
        if let Some(t) = e.pass_type.as_deref()
            && SET_PIECE_TYPES.contains(&t)
        {
            *counts.entry(t).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return Unavailable::Empty.into();
    }
    let mut out: Vec<SetPieceCount> = counts
        .into_iter()
        .map(|(kind, count)| SetPieceCount {
            kind: kind.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    Aggregate::Ready(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TacticalSummary {
    pub team: String,
    pub total_passes: u32,
    pub successful_passes: u32,
    pub pass_accuracy: f64,
    pub zones: ZoneSplit,
    pub defensive_actions: u32,
}

pub fn tactical_summary(events: &[Event], team: &str) -> Aggregate<TacticalSummary> {
    let filter = EventFilter::team(team);
    let points = match located_points(events, &filter) {
        Ok(points) => points,
        Err(reason) => return reason.into(),
    };
    let own = filter.apply(events);
    let total_passes = own.iter().filter(|e| e.kind == EventKind::Pass).count() as u32;
    let successful_passes = own.iter().filter(|e| e.is_successful_pass()).count() as u32;
    let pass_accuracy = if total_passes == 0 {
        0.0
    } else {
        successful_passes as f64 / total_passes as f64 * 100.0
    };
    Aggregate::Ready(TacticalSummary {
        team: team.to_string(),
        total_passes,
        successful_passes,
        pass_accuracy,
        zones: zone_split_points(points),
        defensive_actions: own
            .iter()
            .filter(|e| SUMMARY_DEFENSIVE_KINDS.contains(&e.kind))
            .count() as u32,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShotPoint {
    pub player: String,
    pub minute: u16,
    pub point: Point,
    pub xg: f64,
    pub outcome: String,
    pub is_goal: bool,
}

pub fn shot_map(
    events: &[Event],
    team: &str,
    player: Option<&str>,
    cfg: &TimelineConfig,
) -> Aggregate<Vec<ShotPoint>> {
    let mut filter = EventFilter::team(team).with_kinds(&[EventKind::Shot]);
    if let Some(p) = player {
        filter = filter.with_player(p);
    }
    let shots = filter.apply(events);
    if shots.is_empty() {
        return Unavailable::Empty.into();
    }
    let mut malformed = 0usize;
    let mut out = Vec::with_capacity(shots.len());
    for s in shots {
        let Some(point) = s.location.point() else {
            malformed += usize::from(s.location.is_malformed());
            continue;
        };
        out.push(ShotPoint {
            player: s.player.name.clone(),
            minute: s.minute,
            point,
            xg: cfg.shot_xg(s),
            outcome: s.shot_outcome.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            is_goal: s.is_goal(),
        });
    }
    if out.is_empty() {
        return if malformed > 0 {
            Unavailable::MalformedCoordinates { count: malformed }.into()
        } else {
            Unavailable::MissingField("location").into()
        };
    }
    Aggregate::Ready(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_shape_uses_first_fifteen_minutes() {
        let mut early = Event::new("1", EventKind::Pass, "A", "a1").at(3, 0).located(30.0, 20.0);
        early.position = Some("Left Back".into());
        let early2 = Event::new("2", EventKind::Pass, "A", "a1").at(15, 59).located(50.0, 40.0);
        let late = Event::new("3", EventKind::Pass, "A", "a1").at(16, 0).located(110.0, 40.0);
        let shape = starting_shape(&[early, early2, late], "A").ready().unwrap();
        assert_eq!(shape.len(), 1);
        assert_eq!(shape[0].position, "Left Back");
        assert_eq!(shape[0].samples, 2);
        assert!((shape[0].average_x - 40.0).abs() < 1e-12);
    }

    #[test]
    fn final_third_is_strictly_past_eighty() {
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "a1").located(80.0, 40.0),
            Event::new("2", EventKind::Shot, "A", "a1").located(105.0, 40.0),
            Event::new("3", EventKind::Carry, "A", "a1").located(100.0, 40.0),
        ];
        let pts = final_third_actions(&events, "A").ready().unwrap();
        assert_eq!(pts.len(), 1);
        assert_eq!(pts[0].kind, EventKind::Shot);
    }

    #[test]
    fn set_pieces_counted_by_type() {
        let mk = |id: &str, t: &str| {
            let mut e = Event::new(id, EventKind::Pass, "A", "a1");
            e.pass_type = Some(t.to_string());
            e
        };
        let events = vec![mk("1", "Corner"), mk("2", "Corner"), mk("3", "Throw-in"), mk("4", "Kick Off")];
        let counts = set_piece_counts(&events, "A").ready().unwrap();
        assert_eq!(counts[0], SetPieceCount { kind: "Corner".into(), count: 2 });
        assert_eq!(counts.len(), 2);
        assert!(set_piece_counts(&events, "B").unavailable().is_some());
    }

    #[test]
    fn tactical_summary_zones_and_accuracy() {
        let mut failed = Event::new("2", EventKind::Pass, "A", "a1").located(90.0, 40.0);
        failed.pass_outcome = Some("Incomplete".into());
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "a1").located(20.0, 40.0),
            failed,
            Event::new("3", EventKind::Tackle, "A", "a2").located(60.0, 40.0),
        ];
        let s = tactical_summary(&events, "A").ready().unwrap();
        assert_eq!(s.total_passes, 2);
        assert!((s.pass_accuracy - 50.0).abs() < 1e-12);
        assert_eq!(s.zones, ZoneSplit { defensive: 1, middle: 1, attacking: 1 });
        assert_eq!(s.defensive_actions, 1);
    }

    #[test]
    fn shot_map_defaults_missing_xg() {
        let mut s = Event::new("1", EventKind::Shot, "A", "a1").located(110.0, 40.0);
        s.shot_outcome = Some("Goal".into());
        let pts = shot_map(&[s], "A", None, &TimelineConfig::default()).ready().unwrap();
        assert!(pts[0].is_goal);
        assert_eq!(pts[0].xg, 0.05);
        let none = shot_map(&[], "A", Some("a1"), &TimelineConfig::default());
        assert_eq!(none.unavailable(), Some(&Unavailable::Empty));
    }
}
