use std::fmt;

use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;
use serde_json::Value;

use crate::coords::{PitchCoord, Point, coord_from_columns, normalize_location};
use crate::entity::{Entity, EntityRef};

const CARD_EVENT_NAMES: &[&str] = &["Yellow Card", "Red Card", "Second Yellow"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Pass,
    Shot,
    Dribble,
    Duel,
    Interception,
    Carry,
    BallReceipt,
    BallRecovery,
    Clearance,
    Block,
    Tackle,
    Miscontrol,
    Pressure,
    FoulCommitted,
    FoulWon,
    BadBehaviour,
    Substitution,
    OwnGoalFor,
    OwnGoalAgainst,
    Other(String),
}

impl EventKind {
    pub fn from_name(raw: &str) -> Self {
        match raw.trim() {
            "Pass" => EventKind::Pass,
            "Shot" => EventKind::Shot,
            "Dribble" => EventKind::Dribble,
            "Duel" => EventKind::Duel,
            "Interception" => EventKind::Interception,
            "Carry" => EventKind::Carry,
            "Ball Receipt*" | "Ball Receipt" => EventKind::BallReceipt,
            "Ball Recovery" => EventKind::BallRecovery,
            "Clearance" => EventKind::Clearance,
            "Block" => EventKind::Block,
            "Tackle" => EventKind::Tackle,
            "Miscontrol" => EventKind::Miscontrol,
            "Pressure" => EventKind::Pressure,
            "Foul Committed" => EventKind::FoulCommitted,
            "Foul Won" => EventKind::FoulWon,
            "Bad Behaviour" => EventKind::BadBehaviour,
            "Substitution" => EventKind::Substitution,
            "Own Goal For" => EventKind::OwnGoalFor,
            "Own Goal Against" => EventKind::OwnGoalAgainst,
            other => EventKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Pass => "Pass",
            EventKind::Shot => "Shot",
            EventKind::Dribble => "Dribble",
            EventKind::Duel => "Duel",
            EventKind::Interception => "Interception",
            EventKind::Carry => "Carry",
            EventKind::BallReceipt => "Ball Receipt*",
            EventKind::BallRecovery => "Ball Recovery",
            EventKind::Clearance => "Clearance",
            EventKind::Block => "Block",
            EventKind::Tackle => "Tackle",
            EventKind::Miscontrol => "Miscontrol",
            EventKind::Pressure => "Pressure",
            EventKind::FoulCommitted => "Foul Committed",
            EventKind::FoulWon => "Foul Won",
            EventKind::BadBehaviour => "Bad Behaviour",
            EventKind::Substitution => "Substitution",
            EventKind::OwnGoalFor => "Own Goal For",
            EventKind::OwnGoalAgainst => "Own Goal Against",
            EventKind::Other(name) => name,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized on-pitch action. Built once at ingestion and never mutated
/// by the aggregators.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: String,
    pub index: Option<u32>,
    pub period: Option<u8>,
    pub kind: EventKind,
    pub team: Entity,
    pub player: Entity,
    pub position: Option<Entity>,
    pub minute: u16,
    pub second: u8,
    pub location: PitchCoord,
    pub pass_end_location: PitchCoord,
    pub carry_end_location: PitchCoord,
    pub pass_recipient: Option<Entity>,
    pub pass_outcome: Option<String>,
    pub pass_type: Option<String>,
    pub shot_outcome: Option<String>,
    pub shot_xg: Option<f64>,
    pub dribble_outcome: Option<String>,
    pub duel_outcome: Option<String>,
    pub interception_outcome: Option<String>,
    pub substitution_replacement: Option<Entity>,
    pub card: Option<String>,
    pub related_event_ids: Vec<String>,
}

impl Event {
    /// Blank event of a given kind; handy for building rows in code.
    pub fn new(id: impl Into<String>, kind: EventKind, team: &str, player: &str) -> Self {
        Self {
            id: id.into(),
            index: None,
            period: None,
            kind,
            team: Entity::named(team),
            player: Entity::named(player),
            position: None,
            minute: 0,
            second: 0,
            location: PitchCoord::Absent,
            pass_end_location: PitchCoord::Absent,
            carry_end_location: PitchCoord::Absent,
            pass_recipient: None,
            pass_outcome: None,
            pass_type: None,
            shot_outcome: None,
            shot_xg: None,
            dribble_outcome: None,
            duel_outcome: None,
            interception_outcome: None,
            substitution_replacement: None,
            card: None,
            related_event_ids: Vec::new(),
        }
    }

    pub fn at(mut self, minute: u16, second: u8) -> Self {
        self.minute = minute;
        self.second = second;
        self
    }

    pub fn located(mut self, x: f64, y: f64) -> Self {
        self.location = PitchCoord::At(Point::new(x, y));
        self
    }

    pub fn pass_to(mut self, recipient: &str, end_x: f64, end_y: f64) -> Self {
        self.pass_recipient = Some(Entity::named(recipient));
        self.pass_end_location = PitchCoord::At(Point::new(end_x, end_y));
        self
    }

    pub fn x(&self) -> Option<f64> {
        self.location.x()
    }

    pub fn y(&self) -> Option<f64> {
        self.location.y()
    }

    pub fn pass_end_x(&self) -> Option<f64> {
        self.pass_end_location.x()
    }

    pub fn pass_end_y(&self) -> Option<f64> {
        self.pass_end_location.y()
    }

    /// Successful passes carry no outcome.
    pub fn is_successful_pass(&self) -> bool {
        self.kind == EventKind::Pass && self.pass_outcome.is_none()
    }

    pub fn is_goal(&self) -> bool {
        self.kind == EventKind::Shot && self.shot_outcome.as_deref() == Some("Goal")
    }

    /// `(minute, second)` for ordering.
    pub fn clock(&self) -> (u16, u8) {
        (self.minute, self.second)
    }

    pub fn from_value(row: &Value, position: usize) -> Option<Self> {
        if !row.is_object() {
            return None;
        }

        let kind_name = EntityRef::from_value(row.get("type").unwrap_or(&Value::Null))
            .map(|r| r.name().to_string())
            .unwrap_or_default();
        let kind = EventKind::from_name(&kind_name);

        let id = row
            .get("id")
            .and_then(value_text)
            .unwrap_or_else(|| format!("row-{position}"));

        let location = match row.get("location").filter(|v| !v.is_null()) {
            Some(v) => normalize_location(Some(v)),
            None => coord_from_columns(row.get("x"), row.get("y")),
        };
        let pass_end_location = match field(row, &["pass_end_location"], &[("pass", "end_location")]) {
            Some(v) => normalize_location(Some(v)),
            None => coord_from_columns(row.get("pass_end_x"), row.get("pass_end_y")),
        };
        let carry_end_location =
            match field(row, &["carry_end_location"], &[("carry", "end_location")]) {
                Some(v) => normalize_location(Some(v)),
                None => coord_from_columns(row.get("carry_end_x"), row.get("carry_end_y")),
            };

        let card = opt_name(field(
            row,
            &["bad_behaviour_card", "foul_committed_card"],
            &[("bad_behaviour", "card"), ("foul_committed", "card")],
        ))
        .or_else(|| {
            CARD_EVENT_NAMES
                .contains(&kind_name.as_str())
                .then(|| kind_name.clone())
        });

        Some(Self {
            id,
            index: row.get("index").and_then(as_u64_any).and_then(|v| u32::try_from(v).ok()),
            period: row.get("period").and_then(as_u64_any).and_then(|v| u8::try_from(v).ok()),
            kind,
            team: Entity::resolve(row.get("team")),
            player: Entity::resolve(row.get("player")),
            position: row
                .get("position")
                .and_then(EntityRef::from_value)
                .map(|r| Entity {
                    id: r.id(),
                    name: r.name().to_string(),
                }),
            minute: row
                .get("minute")
                .and_then(as_u64_any)
                .and_then(|v| u16::try_from(v).ok())
                .unwrap_or(0),
            second: row
                .get("second")
                .and_then(as_u64_any)
                .and_then(|v| u8::try_from(v).ok())
                .unwrap_or(0),
            location,
            pass_end_location,
            carry_end_location,
            pass_recipient: opt_entity(field(row, &["pass_recipient"], &[("pass", "recipient")])),
            pass_outcome: opt_name(field(row, &["pass_outcome"], &[("pass", "outcome")])),
            pass_type: opt_name(field(row, &["pass_type"], &[("pass", "type")])),
            shot_outcome: opt_name(field(row, &["shot_outcome"], &[("shot", "outcome")])),
            shot_xg: field(
                row,
                &["shot_xg", "shot_statsbomb_xg"],
                &[("shot", "statsbomb_xg")],
            )
            .and_then(as_f64_any),
            dribble_outcome: opt_name(field(row, &["dribble_outcome"], &[("dribble", "outcome")])),
            duel_outcome: opt_name(field(row, &["duel_outcome"], &[("duel", "outcome")])),
            interception_outcome: opt_name(field(
                row,
                &["interception_outcome"],
                &[("interception", "outcome")],
            )),
            substitution_replacement: opt_entity(field(
                row,
                &["substitution_replacement"],
                &[("substitution", "replacement")],
            )),
            card,
            related_event_ids: field(row, &["related_event_ids", "related_events"], &[])
                .and_then(|v| v.as_array())
                .map(|ids| ids.iter().filter_map(value_text).collect())
                .unwrap_or_default(),
        })
    }
}

/// Parse a provider event log (a JSON array of rows, nested or flattened).
pub fn parse_events_json(raw: &str) -> Result<Vec<Event>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let root: Value = serde_json::from_str(trimmed).context("invalid events json")?;
    let Some(rows) = root.as_array() else {
        return Err(anyhow::anyhow!("events json is not an array"));
    };

    let mut out = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;
    for (pos, row) in rows.iter().enumerate() {
        match Event::from_value(row, pos) {
            Some(event) => out.push(event),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("skipped {skipped} event row(s) that were not objects");
    }
    Ok(out)
}

/// Explicit team / player / kind / time-window selection.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub team: Option<String>,
    pub player: Option<String>,
    pub kinds: Vec<EventKind>,
    pub minutes: Option<(u16, u16)>,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn team(name: impl Into<String>) -> Self {
        Self {
            team: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn player(name: impl Into<String>) -> Self {
        Self {
            player: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_player(mut self, name: impl Into<String>) -> Self {
        self.player = Some(name.into());
        self
    }

    pub fn with_kinds(mut self, kinds: &[EventKind]) -> Self {
        self.kinds = kinds.to_vec();
        self
    }

    /// Inclusive minute window.
    pub fn with_minutes(mut self, from: u16, to: u16) -> Self {
        self.minutes = Some((from.min(to), from.max(to)));
        self
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(team) = self.team.as_deref()
            && !event.team.is(team)
        {
            return false;
        }
        if let Some(player) = self.player.as_deref()
            && !event.player.is(player)
        {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&event.kind) {
            return false;
        }
        if let Some((from, to)) = self.minutes
            && (event.minute < from || event.minute > to)
        {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, events: &'a [Event]) -> Vec<&'a Event> {
        events.iter().filter(|e| self.matches(e)).collect()
    }
}

/// First non-null value among flat column names, then `(parent, child)` paths.
fn field<'a>(row: &'a Value, flat: &[&str], nested: &[(&str, &str)]) -> Option<&'a Value> {
    for key in flat {
        if let Some(v) = row.get(*key).filter(|v| !v.is_null()) {
            return Some(v);
        }
    }
    for (parent, child) in nested {
        if let Some(v) = row
            .get(*parent)
            .and_then(|p| p.get(*child))
            .filter(|v| !v.is_null())
        {
            return Some(v);
        }
    }
    None
}

fn opt_entity(value: Option<&Value>) -> Option<Entity> {
    let r = EntityRef::from_value(value?)?;
    Some(Entity {
        id: r.id(),
        name: r.name().to_string(),
    })
}

fn opt_name(value: Option<&Value>) -> Option<String> {
    EntityRef::from_value(value?).map(|r| r.name().to_string())
}

fn value_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u64_any(v: &Value) -> Option<u64> {
    if let Some(n) = v.as_u64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64() {
        return (f.is_finite() && f >= 0.0).then_some(f as u64);
    }
    v.as_str()?.trim().parse::<u64>().ok()
}

fn as_f64_any(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
