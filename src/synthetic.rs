//! Seeded synthetic match for demos and benchmarks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::coords::{PITCH_LENGTH, PITCH_WIDTH, PitchCoord, Point};
use crate::entity::{Entity, UNKNOWN};
use crate::event::{Event, EventKind};

pub const HOME: &str = "Northbridge";
pub const AWAY: &str = "Southport";

const SHAPE: [(&str, f64, f64); 11] = [
    ("Goalkeeper", 6.0, 40.0),
    ("Right Back", 28.0, 70.0),
    ("Right Center Back", 22.0, 52.0),
    ("Left Center Back", 22.0, 28.0),
    ("Left Back", 28.0, 10.0),
    ("Right Defensive Midfield", 45.0, 50.0),
    ("Left Defensive Midfield", 45.0, 30.0),
    ("Right Wing", 72.0, 68.0),
    ("Center Attacking Midfield", 68.0, 40.0),
    ("Left Wing", 72.0, 12.0),
    ("Center Forward", 88.0, 40.0),
];

struct Side {
    team: &'static str,
    players: Vec<String>,
    /// Index into `players` of whoever is on for each slot.
    on_pitch: Vec<usize>,
}

impl Side {
    fn new(team: &'static str, prefix: &str) -> Self {
        // Eleven starters plus two substitutes.
        let players = (1..=13).map(|n| format!("{prefix} {n}")).collect();
        Self {
            team,
            players,
            on_pitch: (0..11).collect(),
        }
    }

    fn name(&self, slot: usize) -> &str {
        &self.players[self.on_pitch[slot]]
    }
}

fn jitter(rng: &mut StdRng, base: Point, spread: f64) -> Point {
    Point::new(
        (base.x + rng.gen_range(-spread..spread)).clamp(0.0, PITCH_LENGTH),
        (base.y + rng.gen_range(-spread..spread)).clamp(0.0, PITCH_WIDTH),
    )
}

fn slot_point(slot: usize) -> Point {
    let (_, x, y) = SHAPE[slot];
    Point::new(x, y)
}

/// A full 90-minute event log. Same seed, same match.
pub fn synthetic_match(seed: u64, events_per_minute: usize) -> Vec<Event> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sides = [Side::new(HOME, "North"), Side::new(AWAY, "South")];
    let mut out: Vec<Event> = Vec::new();
    let mut next_id = 0u64;
    let mut id = || {
        next_id += 1;
        format!("syn-{next_id}")
    };

    for minute in 0..=90u16 {
        if minute == 60 || minute == 75 {
            for (k, side) in sides.iter_mut().enumerate() {
                let slot = if minute == 60 { 8 } else { 10 - k };
                let off = side.name(slot).to_string();
                side.on_pitch[slot] = if minute == 60 { 11 } else { 12 };
                let mut sub = Event::new(id(), EventKind::Substitution, side.team, &off).at(minute, 0);
                sub.substitution_replacement = Some(Entity::named(side.name(slot)));
                out.push(sub);
            }
        }

        for _ in 0..events_per_minute {
            let k = rng.gen_range(0..2usize);
            let side = &sides[k];
            let slot = rng.gen_range(0..11usize);
            let player = side.name(slot).to_string();
            // Attackers play left to right for both teams.
            let start = jitter(&mut rng, slot_point(slot), 12.0);
            let second = rng.gen_range(0..60u8);
            let roll = rng.gen_range(0..100u32);
            let mut e = match roll {
                0..=64 => {
                    let to = (slot + rng.gen_range(1..11usize)) % 11;
                    let end = jitter(&mut rng, slot_point(to), 10.0);
                    let mut e = Event::new(id(), EventKind::Pass, side.team, &player)
                        .pass_to(side.name(to), end.x, end.y);
                    if rng.gen_bool(0.18) {
                        e.pass_outcome = Some("Incomplete".to_string());
                    }
                    if rng.gen_bool(0.04) {
                        let kind = ["Corner", "Free Kick", "Throw-in"][rng.gen_range(0..3usize)];
                        e.pass_type = Some(kind.to_string());
                    }
                    e
                }
                65..=71 => {
                    let mut e = Event::new(id(), EventKind::Dribble, side.team, &player);
                    e.dribble_outcome =
                        Some(if rng.gen_bool(0.6) { "Complete" } else { "Incomplete" }.to_string());
                    e
                }
                72..=79 => {
                    let mut e = Event::new(id(), EventKind::Duel, side.team, &player);
                    e.duel_outcome = Some(
                        ["Won", "Lost In Play", "Success In Play", "Lost Out"][rng.gen_range(0..4usize)]
                            .to_string(),
                    );
                    e
                }
                80..=84 => {
                    let mut e = Event::new(id(), EventKind::Interception, side.team, &player);
                    e.interception_outcome =
                        Some(if rng.gen_bool(0.5) { "Won" } else { "Lost Out" }.to_string());
                    e
                }
                85..=89 => Event::new(id(), EventKind::Tackle, side.team, &player),
                90..=92 => Event::new(id(), EventKind::Clearance, side.team, &player),
                _ => {
                    let mut e = Event::new(id(), EventKind::Shot, side.team, &player);
                    let xg: f64 = rng.gen_range(0.01..0.45);
                    e.location = PitchCoord::At(Point::new(
                        rng.gen_range(96.0..116.0),
                        rng.gen_range(25.0..55.0),
                    ));
                    // Some providers leave weak chances unscored.
                    e.shot_xg = (!rng.gen_bool(0.05)).then_some(xg);
                    let outcome = if rng.gen_bool(xg) {
                        "Goal"
                    } else {
                        ["Saved", "Off T", "Blocked"][rng.gen_range(0..3usize)]
                    };
                    e.shot_outcome = Some(outcome.to_string());
                    e
                }
            };
            if e.location.is_absent() {
                e.location = PitchCoord::At(start);
            }
            e.position = Some(Entity::named(SHAPE[slot].0));
            out.push(e.at(minute, second));
        }

        if minute == 38 {
            let against_id = id();
            let for_id = id();
            let mut against = Event::new(against_id.clone(), EventKind::OwnGoalAgainst, AWAY, sides[1].name(2))
                .at(minute, 30)
                .located(4.0, 41.0);
            against.related_event_ids = vec![for_id.clone()];
            let mut for_event = Event::new(for_id, EventKind::OwnGoalFor, HOME, UNKNOWN).at(minute, 30);
            for_event.related_event_ids = vec![against_id];
            out.push(for_event);
            out.push(against);
        }
        if minute == 52 {
            let mut foul = Event::new(id(), EventKind::FoulCommitted, HOME, sides[0].name(5))
                .at(minute, 12)
                .located(50.0, 44.0);
            foul.card = Some("Yellow Card".to_string());
            out.push(foul);
        }
    }

    out.sort_by_key(|e| e.clock());
    for (i, e) in out.iter_mut().enumerate() {
        e.index = u32::try_from(i + 1).ok();
        e.period = Some(if e.minute < 45 { 1 } else { 2 });
    }
    out
}
