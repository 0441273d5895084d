use std::collections::BTreeMap;

use serde::Serialize;

use crate::coords::Point;
use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter, EventKind};
use crate::pass_network::SubstitutionMap;

/// Zone-dependent forward-movement rule for passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressiveRule {
    /// Start `x` at which the final-quarter distance applies.
    pub final_quarter_x: f64,
    pub min_forward: f64,
    pub min_forward_final_quarter: f64,
    /// Passes ending at or beyond this `x` from outside it always count.
    pub box_x: f64,
}

impl Default for ProgressiveRule {
    fn default() -> Self {
        Self {
            final_quarter_x: 80.0,
            min_forward: 10.0,
            min_forward_final_quarter: 10.0,
            box_x: 102.0,
        }
    }
}

impl ProgressiveRule {
    pub fn is_progressive(&self, start: Point, end: Point) -> bool {
        let forward = end.x - start.x;
        if start.x < self.final_quarter_x && forward >= self.min_forward {
            return true;
        }
        if start.x >= self.final_quarter_x && forward >= self.min_forward_final_quarter {
            return true;
        }
        end.x >= self.box_x && start.x < self.box_x
    }

    /// Successful pass with both ends located that satisfies the rule.
    pub fn classify(&self, event: &Event) -> bool {
        if !event.is_successful_pass() {
            return false;
        }
        match (event.location.point(), event.pass_end_location.point()) {
            (Some(start), Some(end)) => self.is_progressive(start, end),
            _ => false,
        }
    }
}

pub fn is_progressive(start: Point, end: Point) -> bool {
    ProgressiveRule::default().is_progressive(start, end)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RankOrder {
    Ascending,
    #[default]
    Descending,
}

#[derive(Debug, Clone, Default)]
pub struct RankingOptions {
    pub order: RankOrder,
    pub fold_substitutions: bool,
    pub rule: ProgressiveRule,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressiveCount {
    pub player: String,
    pub progressive: u32,
    pub completed: u32,
}

impl ProgressiveCount {
    pub fn share(&self) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.progressive as f64 / self.completed as f64 * 100.0
        }
    }
}

/// Progressive passes among the events `filter` selects.
pub fn progressive_passes<'a>(
    events: &'a [Event],
    filter: &EventFilter,
    rule: &ProgressiveRule,
) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| e.kind == EventKind::Pass && filter.matches(e))
        .filter(|e| rule.classify(e))
        .collect()
}

/// Progressive pass counts per player. Pass `EventFilter::team(..)` for the
/// whole team; add a player or minute window only when the caller asks for it.
pub fn rank_progressive_passers(
    events: &[Event],
    filter: &EventFilter,
    opts: &RankingOptions,
) -> Aggregate<Vec<ProgressiveCount>> {
    let passes: Vec<&Event> = events
        .iter()
        .filter(|e| e.is_successful_pass() && filter.matches(e))
        .collect();
    if passes.is_empty() {
        return Unavailable::Empty.into();
    }
    if passes.iter().all(|e| e.pass_end_location.point().is_none()) {
        return Unavailable::MissingField("pass_end_location").into();
    }

    let subs = match (&filter.team, opts.fold_substitutions) {
        (Some(team), true) => SubstitutionMap::from_events(events, team),
        _ => SubstitutionMap::default(),
    };

    let mut counts: BTreeMap<String, (u32, u32)> = BTreeMap::new();
    for e in &passes {
        let entry = counts
            .entry(subs.resolve(&e.player.name).to_string())
            .or_insert((0, 0));
        entry.1 += 1;
        if opts.rule.classify(e) {
            entry.0 += 1;
        }
    }

    let mut ranked: Vec<ProgressiveCount> = counts
        .into_iter()
        .filter(|(_, (progressive, _))| *progressive > 0)
        .map(|(player, (progressive, completed))| ProgressiveCount {
            player,
            progressive,
            completed,
        })
        .collect();
    if ranked.is_empty() {
        return Unavailable::Empty.into();
    }
    // BTreeMap order gives the name tie-break; sort is stable.
    match opts.order {
        RankOrder::Ascending => ranked.sort_by_key(|c| c.progressive),
        RankOrder::Descending => ranked.sort_by(|a, b| b.progressive.cmp(&a.progressive)),
    }
    Aggregate::Ready(ranked)
}
