use serde::Serialize;

use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter, EventKind};

pub const DRIBBLE_SUCCESS: &[&str] = &["Complete"];
pub const DUEL_SUCCESS: &[&str] = &["Success In Play", "Won", "Success Out"];
pub const INTERCEPTION_SUCCESS: &[&str] = &["Success In Play", "Won", "Success Out"];

/// Action types reported, in output order.
pub const RATED_KINDS: [EventKind; 5] = [
    EventKind::Pass,
    EventKind::Dribble,
    EventKind::Shot,
    EventKind::Duel,
    EventKind::Interception,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionSuccess {
    pub action: EventKind,
    pub attempts: u32,
    pub successes: u32,
    /// Percentage; 0 when there were no attempts.
    pub rate: f64,
}

impl ActionSuccess {
    pub fn has_attempts(&self) -> bool {
        self.attempts > 0
    }
}

/// Whether an event of a rated kind succeeded. `None` for unrated kinds.
pub fn is_success(event: &Event) -> Option<bool> {
    let tagged = |outcome: &Option<String>, tags: &[&str]| {
        outcome.as_deref().is_some_and(|o| tags.contains(&o))
    };
    match event.kind {
        EventKind::Pass => Some(event.pass_outcome.is_none()),
        EventKind::Dribble => Some(tagged(&event.dribble_outcome, DRIBBLE_SUCCESS)),
        EventKind::Shot => Some(event.is_goal()),
        EventKind::Duel => Some(tagged(&event.duel_outcome, DUEL_SUCCESS)),
        EventKind::Interception => Some(tagged(&event.interception_outcome, INTERCEPTION_SUCCESS)),
        _ => None,
    }
}

pub fn success_rates(events: &[Event], filter: &EventFilter) -> Aggregate<Vec<ActionSuccess>> {
    let selected = filter.apply(events);
    if selected.is_empty() {
        return Unavailable::Empty.into();
    }

    let rows = RATED_KINDS
        .iter()
        .map(|kind| {
            let (attempts, successes) = selected
                .iter()
                .filter(|e| e.kind == *kind)
                .fold((0u32, 0u32), |(a, s), e| {
                    (a + 1, s + u32::from(is_success(e) == Some(true)))
                });
            let rate = if attempts == 0 {
                0.0
            } else {
                successes as f64 / attempts as f64 * 100.0
            };
            ActionSuccess {
                action: kind.clone(),
                attempts,
                successes,
                rate,
            }
        })
        .collect();
    Aggregate::Ready(rows)
}

pub fn player_success_rates(events: &[Event], player: &str) -> Aggregate<Vec<ActionSuccess>> {
    success_rates(events, &EventFilter::player(player))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(rows: &'a [ActionSuccess], kind: EventKind) -> &'a ActionSuccess {
        rows.iter().find(|r| r.action == kind).unwrap()
    }

    #[test]
    fn rates_per_action_type() {
        let mut failed = Event::new("2", EventKind::Pass, "A", "P");
        failed.pass_outcome = Some("Incomplete".into());
        let mut dribble = Event::new("3", EventKind::Dribble, "A", "P");
        dribble.dribble_outcome = Some("Complete".into());
        let mut duel = Event::new("4", EventKind::Duel, "A", "P");
        duel.duel_outcome = Some("Lost In Play".into());
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "P"),
            failed,
            dribble,
            duel,
        ];
        let rows = player_success_rates(&events, "P").ready().unwrap();
        assert_eq!(rows.len(), RATED_KINDS.len());
        let pass = row(&rows, EventKind::Pass);
        assert_eq!((pass.attempts, pass.successes), (2, 1));
        assert!((pass.rate - 50.0).abs() < 1e-12);
        assert_eq!(row(&rows, EventKind::Dribble).rate, 100.0);
        let d = row(&rows, EventKind::Duel);
        assert_eq!((d.attempts, d.rate), (1, 0.0));
    }

    #[test]
    fn zero_attempts_is_zero_rate_with_zero_count() {
        let events = vec![Event::new("1", EventKind::Pass, "A", "P")];
        let rows = player_success_rates(&events, "P").ready().unwrap();
        let shot = row(&rows, EventKind::Shot);
        assert_eq!(shot.rate, 0.0);
        assert!(!shot.has_attempts());
    }

    #[test]
    fn unknown_player_is_empty() {
        let events = vec![Event::new("1", EventKind::Pass, "A", "P")];
        assert_eq!(
            player_success_rates(&events, "Nobody").unavailable(),
            Some(&Unavailable::Empty)
        );
    }
}
