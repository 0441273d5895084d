use std::fs;
use std::path::PathBuf;

use pitchlens::error::Unavailable;
use pitchlens::event::{Event, EventFilter, EventKind, parse_events_json};
use pitchlens::explorer::{event_distribution, event_timeline};
use pitchlens::pass_network::{
    NetworkConfig, SubstitutionMap, build_pass_network, pass_connections, successful_team_passes,
};
use pitchlens::progressive::{RankingOptions, progressive_passes, rank_progressive_passers};
use pitchlens::spatial::{GridSpec, Normalization, build_heatmap, build_zone_split};
use pitchlens::success_rate::success_rates;
use pitchlens::summary::{
    KeyEventKind, all_players, compare_players, key_events, team_comparison, team_players,
};
use pitchlens::tactical::{set_piece_counts, starting_shape};
use pitchlens::xg_timeline::{GoalKind, TimelineConfig, build_xg_timeline};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn nested() -> Vec<Event> {
    parse_events_json(&read_fixture("events_nested.json")).expect("fixture should parse")
}

fn flat() -> Vec<Event> {
    parse_events_json(&read_fixture("events_flat.json")).expect("fixture should parse")
}

#[test]
fn pass_network_folds_the_substitute_into_the_starter() {
    let events = nested();
    let net = build_pass_network(&events, "Spain", &NetworkConfig::default())
        .ready()
        .expect("network should build");

    assert_eq!(net.total_passes, 8);
    assert_eq!(net.profiles.len(), 2);
    assert!(net.profile("Mikel Merino").is_none());

    let rodri = net.profile("Rodri").expect("Rodri node");
    assert_eq!(rodri.passes_made, 3);
    assert_eq!(rodri.passes_received, 5);
    assert_eq!(rodri.substitutes, vec!["Mikel Merino".to_string()]);
    assert_eq!(rodri.samples.len(), 3);
    assert!(rodri.was_substituted());

    let pedri = net.profile("Pedri").expect("Pedri node");
    assert_eq!(pedri.passes_made, 5);
    assert!((pedri.average_x - 46.0).abs() < 1e-9);

    // Counts are [5, 3]; the 0.6 quantile is 4.2, so only the 5 is drawn.
    assert_eq!(net.threshold, 4);
    assert_eq!(net.connections.len(), 1);
    let edge = net.connection("Pedri", "Rodri").expect("Pedri -> Rodri");
    assert_eq!(edge.count, 5);
    assert!(net.connection("Rodri", "Pedri").is_none());
}

#[test]
fn folding_substitutes_keeps_pass_volume() {
    let events = nested();
    let passes = successful_team_passes(&events, "Spain");
    let volume = |subs: &SubstitutionMap| -> u32 {
        pass_connections(&passes, subs).iter().map(|c| c.count).sum()
    };
    let subs = SubstitutionMap::from_events(&events, "Spain");
    assert!(!subs.is_empty());
    assert_eq!(volume(&SubstitutionMap::default()), 8);
    assert_eq!(volume(&subs), 8);
}

#[test]
fn pass_network_for_a_team_without_passes_is_empty() {
    let events = nested();
    let res = build_pass_network(&events, "Scotland", &NetworkConfig::default());
    assert_eq!(res.unavailable(), Some(&Unavailable::Empty));

    // Germany completed a single pass: one located passer is not a network.
    let res = build_pass_network(&events, "Germany", &NetworkConfig::default());
    assert_eq!(
        res.unavailable(),
        Some(&Unavailable::Insufficient { needed: 2, found: 1 })
    );
}

#[test]
fn xg_timeline_tracks_shots_and_own_goals() {
    let events = nested();
    let timeline = build_xg_timeline(&events, &TimelineConfig::default())
        .ready()
        .expect("timeline should build");
    assert_eq!(timeline.final_minute, 80);
    assert_eq!(timeline.series[0].team, "Germany");

    let spain = timeline.series_for("Spain").expect("Spain series");
    let minutes: Vec<u16> = spain.points.iter().map(|p| p.minute).collect();
    assert_eq!(minutes, vec![0, 20, 44, 80]);
    assert!((spain.total() - 0.9).abs() < 1e-9);
    assert!((spain.value_at(30) - 0.3).abs() < 1e-9);
    assert_eq!(spain.shots, 2);

    let germany = timeline.series_for("Germany").expect("Germany series");
    assert!((germany.total() - 0.1).abs() < 1e-9);

    assert_eq!(timeline.goals.len(), 2);
    assert_eq!(timeline.goals[0].kind, GoalKind::Goal);
    assert_eq!(timeline.goals[0].player, "Álvaro Morata");
    let og = &timeline.goals[1];
    assert_eq!(og.kind, GoalKind::OwnGoal);
    assert_eq!(og.minute, 80);
    assert_eq!(og.player, "Antonio Rüdiger");
    assert_eq!(og.team, "Germany");
    assert_eq!(og.benefiting_team, "Spain");
}

#[test]
fn progressive_passes_end_to_end() {
    let events = flat();
    let rule = RankingOptions::default().rule;
    let ids: Vec<&str> = progressive_passes(&events, &EventFilter::team("Italy"), &rule)
        .into_iter()
        .map(|e| e.id.as_str())
        .collect();
    // (50,40)->(65,40) and (85,40)->(97,40) progress; (40,40)->(48,40) does not.
    assert_eq!(ids, vec!["f1", "f3"]);

    let ranked = rank_progressive_passers(&events, &EventFilter::team("Italy"), &RankingOptions::default())
        .ready()
        .expect("ranking should build");
    let names: Vec<&str> = ranked.iter().map(|c| c.player.as_str()).collect();
    assert_eq!(names, vec!["Barella", "Chiesa"]);
    assert!(ranked.iter().all(|c| c.progressive == 1));
}

#[test]
fn progressive_ranking_can_fold_substitutes() {
    let events = nested();
    let opts = RankingOptions {
        fold_substitutions: true,
        ..RankingOptions::default()
    };
    let ranked = rank_progressive_passers(&events, &EventFilter::team("Spain"), &opts)
        .ready()
        .expect("ranking should build");
    assert_eq!(ranked[0].player, "Pedri");
    assert_eq!(ranked[0].progressive, 3);
    assert_eq!(ranked[0].completed, 5);
    let rodri = ranked.iter().find(|c| c.player == "Rodri").expect("Rodri");
    assert_eq!((rodri.progressive, rodri.completed), (2, 3));
}

#[test]
fn success_rates_per_action() {
    let events = nested();
    let rows = success_rates(&events, &EventFilter::team("Germany"))
        .ready()
        .expect("rates should build");
    let rate = |kind: EventKind| {
        rows.iter()
            .find(|r| r.action == kind)
            .map(|r| (r.attempts, r.successes, r.rate))
            .expect("rated kind")
    };
    assert_eq!(rate(EventKind::Pass), (1, 1, 100.0));
    assert_eq!(rate(EventKind::Dribble), (1, 1, 100.0));
    assert_eq!(rate(EventKind::Duel), (1, 0, 0.0));
    assert_eq!(rate(EventKind::Interception), (1, 1, 100.0));
    assert_eq!(rate(EventKind::Shot), (1, 0, 0.0));

    let spain_passes = success_rates(&events, &EventFilter::team("Spain").with_kinds(&[EventKind::Pass]))
        .ready()
        .expect("rates should build");
    let pass = spain_passes.iter().find(|r| r.action == EventKind::Pass).expect("pass row");
    assert_eq!((pass.attempts, pass.successes), (9, 8));
}

#[test]
fn heatmap_counts_only_located_events() {
    let events = flat();
    let map = build_heatmap(
        &events,
        &EventFilter::team("Italy"),
        GridSpec::TOUCH,
        Normalization::Total,
    )
    .ready()
    .expect("heatmap should build");
    assert_eq!(map.total, 4);
    assert_eq!(map.counts.iter().sum::<u32>(), 4);
    let density: f64 = map.bins().iter().map(|b| b.density).sum();
    assert!((density - 1.0).abs() < 1e-9);

    let albania = build_heatmap(
        &events,
        &EventFilter::team("Albania"),
        GridSpec::TOUCH,
        Normalization::Total,
    );
    assert_eq!(
        albania.unavailable(),
        Some(&Unavailable::MalformedCoordinates { count: 1 })
    );
}

#[test]
fn zone_split_percentages_sum_to_hundred() {
    let events = nested();
    let split = build_zone_split(&events, &EventFilter::team("Spain"))
        .ready()
        .expect("zones should build");
    assert_eq!(split.total(), 11);
    assert!((split.percentages().sum() - 100.0).abs() < 1e-9);
}

#[test]
fn key_events_in_match_order() {
    let events = nested();
    let keys = key_events(&events);
    let descriptions: Vec<&str> = keys.iter().map(|k| k.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec![
            "Goal by Álvaro Morata",
            "Yellow Card for Antonio Rüdiger",
            "Mikel Merino on for Rodri",
            "Own goal by Antonio Rüdiger (for Spain)",
        ]
    );
    assert_eq!(keys[2].kind, KeyEventKind::Substitution);
}

#[test]
fn team_comparison_credits_own_goals() {
    let events = nested();
    let rows = team_comparison(&events, &TimelineConfig::default())
        .ready()
        .expect("comparison should build");
    let spain = rows.iter().find(|r| r.team == "Spain").expect("Spain row");
    assert_eq!(spain.goals, 2);
    assert_eq!(spain.shots, 2);
    assert_eq!(spain.shots_on_target, 2);
    assert_eq!((spain.passes, spain.successful_passes, spain.failed_passes), (9, 8, 1));
    assert!((spain.possession - 90.0).abs() < 1e-9);
    let germany = rows.iter().find(|r| r.team == "Germany").expect("Germany row");
    assert_eq!(germany.goals, 0);
    assert_eq!(germany.fouls, 1);
}

#[test]
fn tactical_views_over_fixture() {
    let events = nested();
    let shape = starting_shape(&events, "Spain").ready().expect("shape should build");
    // Only Pedri is on the ball in the opening quarter hour.
    assert_eq!(shape.len(), 1);
    assert_eq!(shape[0].player, "Pedri");
    assert_eq!(shape[0].position, "Right Center Midfield");
    assert_eq!(shape[0].samples, 3);
    assert!(set_piece_counts(&events, "Spain").unavailable().is_some());
}

#[test]
fn player_lists_from_fixture() {
    let events = nested();
    assert_eq!(
        team_players(&events, "Spain").ready().expect("Spain players"),
        vec!["Mikel Merino", "Pedri", "Rodri", "Álvaro Morata"]
    );
    // The own-goal-for row has no player and is left out.
    assert_eq!(all_players(&events).ready().expect("players").len(), 8);
}

#[test]
fn player_comparison_over_fixture() {
    let events = nested();
    let cmp = compare_players(&events, "Álvaro Morata", "Pedri")
        .ready()
        .expect("comparison should build");
    let morata = &cmp.primary;
    assert_eq!((morata.goals, morata.shots, morata.total_actions), (1, 2, 2));
    assert!((morata.shot_accuracy - 50.0).abs() < 1e-9);
    assert_eq!(morata.pass_accuracy, 0.0);

    let pedri = cmp.other.as_ref().expect("Pedri profile");
    assert_eq!((pedri.passes, pedri.successful_passes), (6, 5));
    let passes = pedri.metric("Passes").expect("passes metric");
    assert!((passes.normalized - 6.0 / 562.0 * 100.0).abs() < 1e-9);
}

#[test]
fn explorer_views_over_fixture() {
    let events = nested();
    let minute_20 = event_timeline(&events, &EventFilter::team("Spain").with_minutes(20, 20))
        .ready()
        .expect("timeline should build");
    let types: Vec<(&str, usize)> = minute_20
        .iter()
        .map(|r| (r.event_type.as_str(), r.count))
        .collect();
    assert_eq!(types, vec![("Pass", 1), ("Shot", 1)]);

    let dist = event_distribution(&events, None).ready().expect("distribution");
    assert_eq!(dist[0].team, "Germany");
    assert_eq!(dist[0].counts.len(), 7);
    assert_eq!(dist[0].total(), 7);
    assert_eq!(dist[1].team, "Spain");
    assert_eq!((dist[1].counts[0].event_type.as_str(), dist[1].counts[0].count), ("Pass", 9));
    assert_eq!(dist[1].total(), 13);
}
