//! Event-explorer views: per-minute activity and per-team type distribution.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter};
use crate::xg_timeline::teams_in_order;

/// Types shown individually before the remainder is folded together.
pub const DISTRIBUTION_TOP: usize = 7;
pub const OTHER_EVENTS: &str = "Other Events";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MinuteCount {
    pub minute: u16,
    pub event_type: String,
    pub count: usize,
}

/// Events per `(minute, type)` under `filter`, ordered by minute then type.
pub fn event_timeline(events: &[Event], filter: &EventFilter) -> Aggregate<Vec<MinuteCount>> {
    let mut counts: BTreeMap<(u16, &str), usize> = BTreeMap::new();
    for e in filter.apply(events) {
        *counts.entry((e.minute, e.kind.as_str())).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(
        counts
            .into_iter()
            .map(|((minute, kind), count)| MinuteCount {
                minute,
                event_type: kind.to_string(),
                count,
            })
            .collect(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub event_type: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamDistribution {
    pub team: String,
    /// Most frequent first; ties by name.
    pub counts: Vec<TypeCount>,
}

impl TeamDistribution {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|c| c.count).sum()
    }
}

fn fold_tail(mut counts: Vec<TypeCount>) -> Vec<TypeCount> {
    if counts.len() <= DISTRIBUTION_TOP + 1 {
        return counts;
    }
    let other: usize = counts.drain(DISTRIBUTION_TOP..).map(|c| c.count).sum();
    counts.push(TypeCount {
        event_type: OTHER_EVENTS.to_string(),
        count: other,
    });
    counts
}

/// Event types per team, optionally within an inclusive minute window. Beyond
/// eight types, everything after the top seven becomes "Other Events".
pub fn event_distribution(
    events: &[Event],
    minutes: Option<(u16, u16)>,
) -> Aggregate<Vec<TeamDistribution>> {
    let mut out = Vec::new();
    for team in teams_in_order(events) {
        let mut filter = EventFilter::team(team.as_str());
        if let Some((from, to)) = minutes {
            filter = filter.with_minutes(from, to);
        }
        let mut by_type: BTreeMap<&str, usize> = BTreeMap::new();
        for e in filter.apply(events) {
            *by_type.entry(e.kind.as_str()).or_insert(0) += 1;
        }
        if by_type.is_empty() {
            continue;
        }
        let mut counts: Vec<TypeCount> = by_type
            .into_iter()
            .map(|(kind, count)| TypeCount {
                event_type: kind.to_string(),
                count,
            })
            .collect();
        counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.event_type.cmp(&b.event_type)));
        out.push(TeamDistribution {
            team,
            counts: fold_tail(counts),
        });
    }
    if out.is_empty() {
        return Unavailable::Empty.into();
    }
    Aggregate::Ready(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn timeline_groups_by_minute_and_type() {
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "a1").at(3, 0),
            Event::new("2", EventKind::Pass, "A", "a2").at(3, 40),
            Event::new("3", EventKind::Shot, "A", "a2").at(3, 50),
            Event::new("4", EventKind::Pass, "B", "b1").at(1, 0),
            Event::new("5", EventKind::Pass, "A", "a1").at(70, 0),
        ];
        let rows = event_timeline(&events, &EventFilter::team("A").with_minutes(0, 45))
            .ready()
            .unwrap();
        assert_eq!(
            rows,
            vec![
                MinuteCount { minute: 3, event_type: "Pass".into(), count: 2 },
                MinuteCount { minute: 3, event_type: "Shot".into(), count: 1 },
            ]
        );
        let none = event_timeline(&events, &EventFilter::player("nobody"));
        assert_eq!(none.unavailable(), Some(&Unavailable::Empty));
    }

    #[test]
    fn distribution_folds_beyond_top_seven() {
        let kinds = [
            EventKind::Pass,
            EventKind::Carry,
            EventKind::Pressure,
            EventKind::BallReceipt,
            EventKind::Duel,
            EventKind::Shot,
            EventKind::Dribble,
            EventKind::Clearance,
            EventKind::Interception,
        ];
        let mut events = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            // Pass appears 9 times, Interception once.
            for n in 0..(kinds.len() - i) {
                events.push(Event::new(format!("{i}-{n}"), kind.clone(), "A", "a1"));
            }
        }
        events.push(Event::new("b", EventKind::Pass, "B", "b1"));

        let dist = event_distribution(&events, None).ready().unwrap();
        let a = &dist[0];
        assert_eq!(a.counts.len(), DISTRIBUTION_TOP + 1);
        assert_eq!(a.counts[0], TypeCount { event_type: "Pass".into(), count: 9 });
        let other = a.counts.last().unwrap();
        assert_eq!((other.event_type.as_str(), other.count), (OTHER_EVENTS, 3));
        assert_eq!(a.total(), events.len() - 1);

        assert_eq!(dist[1].counts, vec![TypeCount { event_type: "Pass".into(), count: 1 }]);
    }

    #[test]
    fn distribution_respects_the_minute_window() {
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "a1").at(10, 0),
            Event::new("2", EventKind::Pass, "B", "b1").at(80, 0),
        ];
        let dist = event_distribution(&events, Some((0, 45))).ready().unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist[0].team, "A");
        assert!(event_distribution(&events, Some((50, 60))).unavailable().is_some());
    }
}
