use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::Serialize;

use crate::coords::Point;
use crate::error::{Aggregate, AnalyticsError, Unavailable};
use crate::event::{Event, EventKind};

/// Inclusive output range for a visual channel (width, opacity, node size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisualBounds {
    pub min: f64,
    pub max: f64,
}

impl VisualBounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn check(&self, name: &'static str) -> Result<(), AnalyticsError> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min > self.max {
            return Err(AnalyticsError::InvalidBounds {
                name,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    /// Linear map of `value` from `[lo, hi]` onto the bounds. A degenerate
    /// domain maps to `min`.
    pub fn interpolate(&self, value: f64, lo: f64, hi: f64) -> f64 {
        if hi - lo <= f64::EPSILON {
            return self.min;
        }
        let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
        self.min + t * (self.max - self.min)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkConfig {
    /// Connections below `floor(quantile(counts, edge_quantile))` (at least 1)
    /// are dropped.
    pub edge_quantile: f64,
    pub edge_width: VisualBounds,
    pub edge_opacity: VisualBounds,
    pub node_size: VisualBounds,
    pub min_players: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            edge_quantile: 0.6,
            edge_width: VisualBounds::new(1.0, 10.0),
            edge_opacity: VisualBounds::new(0.2, 0.9),
            node_size: VisualBounds::new(200.0, 1200.0),
            min_players: 2,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !(0.0..=1.0).contains(&self.edge_quantile) {
            return Err(AnalyticsError::InvalidQuantile(self.edge_quantile));
        }
        self.edge_width.check("edge width")?;
        self.edge_opacity.check("edge opacity")?;
        self.node_size.check("node size")?;
        Ok(())
    }
}

/// Replacement player name → the player they came on for.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionMap {
    replaced: HashMap<String, String>,
}

impl SubstitutionMap {
    pub fn from_events(events: &[Event], team: &str) -> Self {
        let mut map = Self::default();
        for e in events {
            if e.kind != EventKind::Substitution || !e.team.is(team) {
                continue;
            }
            let Some(replacement) = e.substitution_replacement.as_ref() else {
                continue;
            };
            if replacement.is_unknown() || e.player.is_unknown() {
                continue;
            }
            map.insert(&replacement.name, &e.player.name);
        }
        map
    }

    pub fn insert(&mut self, replacement: &str, replaced: &str) {
        if replacement != replaced {
            self.replaced
                .insert(replacement.to_string(), replaced.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.replaced.is_empty()
    }

    /// Identity a name folds into. Follows chains (C on for B, B on for A
    /// folds C into A); stops on cycles.
    pub fn resolve<'a>(&'a self, name: &'a str) -> &'a str {
        let mut current = name;
        for _ in 0..self.replaced.len() {
            match self.replaced.get(current) {
                Some(next) if next != name => current = next,
                _ => break,
            }
        }
        current
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerSpatialProfile {
    pub player: String,
    pub average_x: f64,
    pub average_y: f64,
    pub samples: Vec<Point>,
    pub passes_made: u32,
    pub passes_received: u32,
    pub total_involvement: u32,
    /// Substitutes whose passes were folded into this node.
    pub substitutes: Vec<String>,
    pub node_size: f64,
}

impl PlayerSpatialProfile {
    pub fn was_substituted(&self) -> bool {
        !self.substitutes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassConnection {
    pub passer: String,
    pub recipient: String,
    pub count: u32,
    pub width: f64,
    pub opacity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassNetwork {
    pub team: String,
    pub profiles: Vec<PlayerSpatialProfile>,
    pub connections: Vec<PassConnection>,
    /// Minimum count a connection needed to be kept.
    pub threshold: u32,
    /// Completed passes with a known recipient, before thresholding.
    pub total_passes: u32,
}

impl PassNetwork {
    pub fn profile(&self, player: &str) -> Option<&PlayerSpatialProfile> {
        self.profiles.iter().find(|p| p.player == player)
    }

    pub fn connection(&self, passer: &str, recipient: &str) -> Option<&PassConnection> {
        self.connections
            .iter()
            .find(|c| c.passer == passer && c.recipient == recipient)
    }
}

/// Completed passes of one team.
pub fn successful_team_passes<'a>(events: &'a [Event], team: &str) -> Vec<&'a Event> {
    events
        .iter()
        .filter(|e| e.is_successful_pass() && e.team.is(team))
        .collect()
}

/// Directed passer → recipient counts over folded names, strongest first.
/// Visual fields are left at zero.
pub fn pass_connections(passes: &[&Event], subs: &SubstitutionMap) -> Vec<PassConnection> {
    let mut counts: BTreeMap<(String, String), u32> = BTreeMap::new();
    for e in passes {
        let Some(recipient) = e.pass_recipient.as_ref() else {
            continue;
        };
        let passer = subs.resolve(&e.player.name).to_string();
        let recipient = subs.resolve(&recipient.name).to_string();
        *counts.entry((passer, recipient)).or_insert(0) += 1;
    }
    let mut out: Vec<PassConnection> = counts
        .into_iter()
        .map(|((passer, recipient), count)| PassConnection {
            passer,
            recipient,
            count,
            width: 0.0,
            opacity: 0.0,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out
}

/// Linear-interpolated quantile (`q` in `[0, 1]`) of a non-empty sample.
pub fn quantile(values: &[u32], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo] as f64, sorted[hi] as f64);
    Some(a + (b - a) * (pos - lo as f64))
}

pub fn dynamic_threshold(counts: &[u32], q: f64) -> u32 {
    quantile(counts, q)
        .map(|v| v.floor().max(1.0) as u32)
        .unwrap_or(1)
}

pub fn build_pass_network(events: &[Event], team: &str, cfg: &NetworkConfig) -> Aggregate<PassNetwork> {
    let passes = successful_team_passes(events, team);
    if passes.is_empty() {
        return Unavailable::Empty.into();
    }
    let subs = SubstitutionMap::from_events(events, team);

    struct Acc {
        samples: Vec<Point>,
        made: u32,
        received: u32,
        substitutes: Vec<String>,
    }
    let mut players: BTreeMap<String, Acc> = BTreeMap::new();
    let mut malformed = 0usize;
    let new_acc = || Acc {
        samples: Vec::new(),
        made: 0,
        received: 0,
        substitutes: Vec::new(),
    };

    for e in &passes {
        let raw = e.player.name.as_str();
        let folded = subs.resolve(raw);
        let acc = players.entry(folded.to_string()).or_insert_with(new_acc);
        acc.made += 1;
        if folded != raw && !acc.substitutes.iter().any(|s| s == raw) {
            acc.substitutes.push(raw.to_string());
        }
        match e.location.point() {
            Some(p) => acc.samples.push(p),
            None if e.location.is_malformed() => malformed += 1,
            None => {}
        }
        if let Some(recipient) = e.pass_recipient.as_ref() {
            let raw_r = recipient.name.as_str();
            let folded_r = subs.resolve(raw_r);
            let acc_r = players.entry(folded_r.to_string()).or_insert_with(new_acc);
            acc_r.received += 1;
            if folded_r != raw_r && !acc_r.substitutes.iter().any(|s| s == raw_r) {
                acc_r.substitutes.push(raw_r.to_string());
            }
        }
    }

    let mut profiles: Vec<PlayerSpatialProfile> = players
        .into_iter()
        .filter(|(_, acc)| !acc.samples.is_empty())
        .map(|(player, acc)| {
            let n = acc.samples.len() as f64;
            let average_x = acc.samples.iter().map(|p| p.x).sum::<f64>() / n;
            let average_y = acc.samples.iter().map(|p| p.y).sum::<f64>() / n;
            PlayerSpatialProfile {
                player,
                average_x,
                average_y,
                samples: acc.samples,
                passes_made: acc.made,
                passes_received: acc.received,
                total_involvement: acc.made + acc.received,
                substitutes: acc.substitutes,
                node_size: 0.0,
            }
        })
        .collect();

    if profiles.is_empty() {
        return if malformed > 0 {
            Unavailable::MalformedCoordinates { count: malformed }.into()
        } else {
            Unavailable::MissingField("location").into()
        };
    }
    if profiles.len() < cfg.min_players {
        return Unavailable::Insufficient {
            needed: cfg.min_players,
            found: profiles.len(),
        }
        .into();
    }

    let all = pass_connections(&passes, &subs);
    if all.is_empty() {
        return Unavailable::MissingField("pass_recipient").into();
    }
    let total_passes = all.iter().map(|c| c.count).sum();
    let counts: Vec<u32> = all.iter().map(|c| c.count).collect();
    let threshold = dynamic_threshold(&counts, cfg.edge_quantile);
    debug!(
        "pass network {team}: {} connection(s), threshold {threshold}",
        all.len()
    );

    let has_node = |name: &str| profiles.iter().any(|p| p.player == name);
    let mut connections: Vec<PassConnection> = all
        .into_iter()
        .filter(|c| c.count >= threshold)
        .filter(|c| c.passer != c.recipient)
        .filter(|c| has_node(&c.passer) && has_node(&c.recipient))
        .collect();

    let lo = connections.iter().map(|c| c.count).min().unwrap_or(0) as f64;
    let hi = connections.iter().map(|c| c.count).max().unwrap_or(0) as f64;
    for c in &mut connections {
        c.width = cfg.edge_width.interpolate(c.count as f64, lo, hi);
        c.opacity = cfg.edge_opacity.interpolate(c.count as f64, lo, hi);
    }

    let lo = profiles.iter().map(|p| p.total_involvement).min().unwrap_or(0) as f64;
    let hi = profiles.iter().map(|p| p.total_involvement).max().unwrap_or(0) as f64;
    for p in &mut profiles {
        p.node_size = cfg.node_size.interpolate(p.total_involvement as f64, lo, hi);
    }
    profiles.sort_by(|a, b| b.total_involvement.cmp(&a.total_involvement));

    Aggregate::Ready(PassNetwork {
        team: team.to_string(),
        profiles,
        connections,
        threshold,
        total_passes,
    })
}
