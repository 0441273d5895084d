use std::fs;
use std::path::PathBuf;

use pitchlens::coords::PitchCoord;
use pitchlens::event::{EventKind, parse_events_json};
use pitchlens::matches::{all_teams, latest_match_id, parse_matches_json, tournament_stats};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_nested_event_fixture() {
    let events = parse_events_json(&read_fixture("events_nested.json")).expect("fixture should parse");
    assert_eq!(events.len(), 20);

    let first = &events[0];
    assert_eq!(first.kind, EventKind::Pass);
    assert_eq!(first.team.name, "Germany");
    assert_eq!(first.team.id, Some(770));
    assert_eq!(first.player.name, "Toni Kroos");
    assert_eq!(first.pass_recipient.as_ref().map(|r| r.name.as_str()), Some("Jamal Musiala"));
    assert_eq!(first.pass_end_x(), Some(45.0));

    let sub = events
        .iter()
        .find(|e| e.kind == EventKind::Substitution)
        .expect("substitution row");
    assert_eq!(sub.player.name, "Rodri");
    assert_eq!(
        sub.substitution_replacement.as_ref().map(|r| r.name.as_str()),
        Some("Mikel Merino")
    );
    assert!(sub.location.is_absent());

    let shot = events.iter().find(|e| e.id == "esp-s1").expect("shot row");
    assert_eq!(shot.shot_xg, Some(0.3));
    assert_eq!(shot.shot_outcome.as_deref(), Some("Saved"));

    let foul = events.iter().find(|e| e.kind == EventKind::FoulCommitted).expect("foul row");
    assert_eq!(foul.card.as_deref(), Some("Yellow Card"));

    let og_for = events.iter().find(|e| e.id == "og-f").expect("own goal row");
    assert!(og_for.player.is_unknown());
    assert_eq!(og_for.related_event_ids, vec!["og-a".to_string()]);
}

#[test]
fn parses_flat_event_fixture() {
    let events = parse_events_json(&read_fixture("events_flat.json")).expect("fixture should parse");
    // The trailing string row is skipped.
    assert_eq!(events.len(), 6);

    assert_eq!(events[0].x(), Some(50.0));
    assert_eq!(events[0].pass_end_x(), Some(65.0));
    assert_eq!(events[0].pass_recipient.as_ref().map(|r| r.name.as_str()), Some("Chiesa"));
    assert_eq!(events[0].clock(), (12, 3));

    assert_eq!(events[3].location, PitchCoord::Malformed);
    assert!(events[3].pass_end_location.is_absent());
    assert!(events[4].is_goal());
    assert_eq!(events[5].team.name, "Albania");
    assert_eq!(events[5].kind, EventKind::Pressure);
    assert!(events[5].location.is_malformed());
}

#[test]
fn parses_match_listing_fixture() {
    let matches = parse_matches_json(&read_fixture("matches.json")).expect("fixture should parse");
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].match_id, 3930158);
    assert_eq!(matches[0].home_team, "Germany");
    assert_eq!(matches[0].stage.as_deref(), Some("Group Stage"));
    assert_eq!(matches[0].competition.as_deref(), Some("UEFA Euro"));

    let flat = matches.iter().find(|m| m.match_id == 3942226).expect("flat row");
    assert_eq!(flat.away_team, "Germany");
    assert_eq!(flat.goals(), Some(3));

    assert_eq!(latest_match_id(&matches, "Spain"), Some(3943043));
    assert_eq!(all_teams(&matches), vec!["England", "Germany", "Scotland", "Spain"]);

    let stats = tournament_stats(&matches);
    assert_eq!(stats.total_matches, 3);
    assert_eq!(stats.total_teams, 4);
    assert_eq!(stats.total_goals, 12);
    assert!((stats.goals_per_match - 4.0).abs() < 1e-9);
}

#[test]
fn rejects_non_array_payloads() {
    assert!(parse_events_json(r#"{"events": []}"#).is_err());
    assert!(parse_events_json("").expect("empty body is no events").is_empty());
    assert!(parse_matches_json("not json").is_err());
}
