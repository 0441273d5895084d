use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use log::info;

use pitchlens::config::AnalyticsConfig;
use pitchlens::error::Aggregate;
use pitchlens::event::{Event, EventFilter};
use pitchlens::event_store::{EventStore, default_db_path};
use pitchlens::explorer::event_distribution;
use pitchlens::matches::{MatchInfo, latest_match_id};
use pitchlens::open_data::OpenDataSource;
use pitchlens::pass_network::build_pass_network;
use pitchlens::progressive::{RankingOptions, rank_progressive_passers};
use pitchlens::report_export::export_match_report;
use pitchlens::source::{CachedSource, Competition, EventSource};
use pitchlens::spatial::{build_zone_split, player_touch_heatmap};
use pitchlens::success_rate::success_rates;
use pitchlens::summary::{compare_players, key_events, match_summary, team_comparison, team_players};
use pitchlens::synthetic::synthetic_match;
use pitchlens::tactical::{set_piece_counts, tactical_summary};
use pitchlens::xg_timeline::{GoalKind, build_xg_timeline, teams_in_order};

const DEMO_EVENTS_PER_MINUTE: usize = 12;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }
    let cfg = AnalyticsConfig::from_env().context("invalid PITCHLENS_* configuration")?;

    let (label, events) = if let Some(seed) = demo_seed(&args) {
        info!("using synthetic match (seed {seed})");
        (format!("synthetic match #{seed}"), synthetic_match(seed, DEMO_EVENTS_PER_MINUTE))
    } else if flag_present(&args, "--db") {
        let path = arg_value(&args, "--db")
            .map(PathBuf::from)
            .or_else(default_db_path)
            .context("unable to resolve sqlite path")?;
        let store = EventStore::open(&path)?;
        load_match(&CachedSource::new(store, cfg.cache_capacity), &args)?
    } else {
        let source = OpenDataSource::new(&cfg.open_data_url);
        load_match(&CachedSource::new(source, cfg.cache_capacity), &args)?
    };

    let teams = teams_in_order(&events);
    let team = arg_value(&args, "--team")
        .or_else(|| teams.first().cloned())
        .ok_or_else(|| anyhow!("no team found in the event log"))?;

    print_report(&label, &events, &team, &cfg);

    if let Some(player) = arg_value(&args, "--player") {
        let other = arg_value(&args, "--compare").unwrap_or_else(|| player.clone());
        print_player(&events, &player, &other, &cfg);
    }

    if let Some(path) = arg_value(&args, "--export") {
        let report = export_match_report(path.as_ref(), &events, &team, &cfg)?;
        println!();
        println!("Workbook written: {path}");
        for (sheet, rows) in &report.sheets {
            println!("  {sheet}: {rows} row(s)");
        }
        for (sheet, reason) in &report.unavailable {
            println!("  {sheet}: {reason}");
        }
    }

    Ok(())
}

fn print_usage() {
    println!("pitchlens [--demo[=SEED]] [--db[=PATH]] [--competition ID --season ID]");
    println!("          [--match ID] [--team NAME] [--player NAME [--compare NAME]]");
    println!("          [--export PATH.xlsx]");
}

fn load_match<S: EventSource>(source: &S, args: &[String]) -> Result<(String, Vec<Event>)> {
    let competition = competition_arg(args);
    let matches = source.matches(competition)?;
    let match_id = match parse_u64(arg_value(args, "--match")) {
        Some(id) => id,
        None => pick_match(&matches, arg_value(args, "--team").as_deref())
            .ok_or_else(|| anyhow!("no matches listed for {competition:?}"))?,
    };
    let label = matches
        .iter()
        .find(|m| m.match_id == match_id)
        .map(MatchInfo::label)
        .unwrap_or_else(|| format!("match {match_id}"));
    info!("loading events for {label}");
    Ok((label, source.events(match_id)?))
}

fn pick_match(matches: &[MatchInfo], team: Option<&str>) -> Option<u64> {
    match team {
        Some(team) => latest_match_id(matches, team),
        None => matches.last().map(|m| m.match_id),
    }
}

fn print_report(label: &str, events: &[Event], team: &str, cfg: &AnalyticsConfig) {
    println!("== {label} ==");
    if let Some(summary) = show("Summary", match_summary(events)) {
        let (m, s) = summary.last_clock;
        println!(
            "{} events, {} teams, {} players, last event {m}:{s:02}",
            summary.total_events,
            summary.teams.len(),
            summary.players.len()
        );
    }

    println!();
    println!("-- Key events --");
    for ke in key_events(events) {
        println!("{:>3}:{:02}  {}", ke.minute, ke.second, ke.description);
    }

    if let Some(rows) = show("Team comparison", team_comparison(events, &cfg.timeline)) {
        for t in rows {
            println!(
                "{:<20} shots {:>2} ({:>2} on target)  xG {:.2}  goals {}  passes {:>3} ({:.1}%)  possession {:.1}%",
                t.team, t.shots, t.shots_on_target, t.xg, t.goals, t.passes, t.pass_accuracy, t.possession
            );
        }
    }

    if let Some(timeline) = show("xG timeline", build_xg_timeline(events, &cfg.timeline)) {
        for s in &timeline.series {
            println!("{:<20} {:.2} xG from {} shot(s)", s.team, s.total(), s.shots);
        }
        for g in &timeline.goals {
            let tag = match g.kind {
                GoalKind::Goal => "goal",
                GoalKind::OwnGoal => "own goal",
            };
            println!("  {}' {tag}: {} ({})", g.minute, g.player, g.benefiting_team);
        }
    }

    if let Some(net) = show(
        &format!("Pass network: {team}"),
        build_pass_network(events, team, &cfg.network),
    ) {
        println!(
            "{} completed passes, {} players, edges drawn at >= {} passes",
            net.total_passes,
            net.profiles.len(),
            net.threshold
        );
        for c in net.connections.iter().take(8) {
            println!("  {:<24} -> {:<24} {:>3}", c.passer, c.recipient, c.count);
        }
    }

    if let Some(ranked) = show(
        &format!("Progressive passers: {team}"),
        rank_progressive_passers(events, &EventFilter::team(team), &RankingOptions::default()),
    ) {
        for c in ranked.iter().take(5) {
            println!("  {:<24} {:>3} ({:.1}% of completed)", c.player, c.progressive, c.share());
        }
    }

    if let Some(split) = show(
        &format!("Zones: {team}"),
        build_zone_split(events, &EventFilter::team(team)),
    ) {
        let pct = split.percentages();
        println!(
            "defensive {:.1}%  middle {:.1}%  attacking {:.1}%",
            pct.defensive, pct.middle, pct.attacking
        );
    }

    if let Some(tac) = show(&format!("Tactics: {team}"), tactical_summary(events, team)) {
        println!(
            "pass accuracy {:.1}%  defensive actions {}",
            tac.pass_accuracy, tac.defensive_actions
        );
    }
    if let Aggregate::Ready(set_pieces) = set_piece_counts(events, team) {
        for sp in set_pieces {
            println!("  {}: {}", sp.kind, sp.count);
        }
    }

    if let Some(rates) = show(
        &format!("Success rates: {team}"),
        success_rates(events, &EventFilter::team(team)),
    ) {
        print_rates(&rates);
    }

    if let Some(dist) = show("Event distribution", event_distribution(events, None)) {
        for d in dist {
            let top: Vec<String> = d
                .counts
                .iter()
                .map(|c| format!("{} {}", c.event_type, c.count))
                .collect();
            println!("{:<20} {}", d.team, top.join(", "));
        }
    }

    if let Some(players) = show(&format!("Squad used: {team}"), team_players(events, team)) {
        println!("{}", players.join(", "));
    }
}

fn print_player(events: &[Event], player: &str, other: &str, cfg: &AnalyticsConfig) {
    if let Some(cmp) = show(&format!("Player: {player}"), compare_players(events, player, other)) {
        for p in std::iter::once(&cmp.primary).chain(cmp.other.as_ref()) {
            println!(
                "{} ({}): {} goals, {} shots, {} passes ({:.1}%), {} actions",
                p.player, p.team, p.goals, p.shots, p.passes, p.pass_accuracy, p.total_actions
            );
            for m in &p.volume {
                println!("  {:<14} {:>4}  {:>5.1}", m.name, m.value, m.normalized);
            }
            print_rates(&p.success);
        }
    }
    if let Some(map) = player_touch_heatmap(events, player, cfg.heatmap_grid).ready() {
        let busiest = map.bins().into_iter().max_by_key(|b| b.count);
        if let Some(bin) = busiest {
            println!(
                "  {} touches; busiest cell ({}, {}) with {}",
                map.total, bin.col, bin.row, bin.count
            );
        }
    }
}

fn print_rates(rates: &[pitchlens::success_rate::ActionSuccess]) {
    for r in rates.iter().filter(|r| r.has_attempts()) {
        println!(
            "  {:<14} {:>3}/{:<3} {:.1}%",
            r.action.as_str(),
            r.successes,
            r.attempts,
            r.rate
        );
    }
}

fn show<T>(title: &str, agg: Aggregate<T>) -> Option<T> {
    println!();
    println!("-- {title} --");
    match agg {
        Aggregate::Ready(value) => Some(value),
        Aggregate::Unavailable(reason) => {
            println!("{reason}");
            None
        }
    }
}

fn competition_arg(args: &[String]) -> Competition {
    let default = Competition::default();
    Competition::new(
        parse_u64(arg_value(args, "--competition"))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default.competition_id),
        parse_u64(arg_value(args, "--season"))
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(default.season_id),
    )
}

fn demo_seed(args: &[String]) -> Option<u64> {
    for arg in args {
        if arg == "--demo" {
            return Some(1);
        }
        if let Some(raw) = arg.strip_prefix("--demo=") {
            return Some(raw.trim().parse().unwrap_or(1));
        }
    }
    None
}

fn flag_present(args: &[String], flag: &str) -> bool {
    let prefix = format!("{flag}=");
    args.iter().any(|a| a == flag || a.starts_with(&prefix))
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.starts_with("--")
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_u64(raw: Option<String>) -> Option<u64> {
    raw.and_then(|v| v.parse::<u64>().ok())
}
