use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::config::AnalyticsConfig;
use crate::error::{Aggregate, Unavailable};
use crate::event::{Event, EventFilter};
use crate::pass_network::build_pass_network;
use crate::progressive::{RankingOptions, rank_progressive_passers};
use crate::spatial::build_zone_split;
use crate::success_rate::player_success_rates;
use crate::summary::team_summary;
use crate::xg_timeline::{GoalKind, build_xg_timeline};

pub struct ExportReport {
    /// `(sheet name, data rows)` in workbook order.
    pub sheets: Vec<(String, usize)>,
    /// Sheets that only hold a placeholder, with the reason.
    pub unavailable: Vec<(String, String)>,
}

struct Sheet {
    name: &'static str,
    rows: Vec<Vec<String>>,
    placeholder: Option<String>,
}

impl Sheet {
    fn new(name: &'static str, header: &[&str]) -> Self {
        Self {
            name,
            rows: vec![header.iter().map(|h| h.to_string()).collect()],
            placeholder: None,
        }
    }

    /// Fill from an aggregate, or leave a placeholder row with the reason.
    fn fill<T>(mut self, agg: Aggregate<T>, rows: impl FnOnce(T) -> Vec<Vec<String>>) -> Self {
        match agg {
            Aggregate::Ready(value) => self.rows.extend(rows(value)),
            Aggregate::Unavailable(reason) => {
                let msg = reason.to_string();
                self.rows.push(vec![msg.clone()]);
                self.placeholder = Some(msg);
            }
        }
        self
    }
}

/// Write one team's match report as an xlsx workbook.
pub fn export_match_report(
    path: &Path,
    events: &[Event],
    team: &str,
    config: &AnalyticsConfig,
) -> Result<ExportReport> {
    let timeline = build_xg_timeline(events, &config.timeline);
    let goals = timeline.as_ready().map(|t| t.goals.clone());

    let sheets = vec![
        Sheet::new("Timeline", &["Team", "Minute", "Cumulative xG"]).fill(timeline, |t| {
            t.series
                .iter()
                .flat_map(|s| {
                    s.points.iter().map(|p| {
                        vec![
                            s.team.clone(),
                            p.minute.to_string(),
                            format!("{:.3}", p.cumulative_xg),
                        ]
                    })
                })
                .collect()
        }),
        Sheet::new("Goals", &["Minute", "Kind", "Team", "Player", "Credited To"]).fill(
            match goals {
                Some(g) => Aggregate::Ready(g),
                None => Unavailable::Empty.into(),
            },
            |goals| {
                goals
                    .into_iter()
                    .map(|g| {
                        let kind = match g.kind {
                            GoalKind::Goal => "Goal",
                            GoalKind::OwnGoal => "Own Goal",
                        };
                        vec![
                            format!("{}:{:02}", g.minute, g.second),
                            kind.to_string(),
                            g.team,
                            g.player,
                            g.benefiting_team,
                        ]
                    })
                    .collect()
            },
        ),
        network_nodes_sheet(events, team, config),
        connections_sheet(events, team, config),
        Sheet::new("Progressive", &["Player", "Progressive", "Completed", "Share %"]).fill(
            rank_progressive_passers(events, &EventFilter::team(team), &RankingOptions::default()),
            |ranked| {
                ranked
                    .into_iter()
                    .map(|c| {
                        vec![
                            c.player.clone(),
                            c.progressive.to_string(),
                            c.completed.to_string(),
                            format!("{:.1}", c.share()),
                        ]
                    })
                    .collect()
            },
        ),
        Sheet::new("Zones", &["Zone", "Events", "Share %"]).fill(
            build_zone_split(events, &EventFilter::team(team)),
            |split| {
                let pct = split.percentages();
                vec![
                    zone_row("Defensive", split.defensive, pct.defensive),
                    zone_row("Middle", split.middle, pct.middle),
                    zone_row("Attacking", split.attacking, pct.attacking),
                ]
            },
        ),
        success_sheet(events, team),
    ];

    let mut workbook = Workbook::new();
    for sheet in &sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.name)?;
        write_rows(ws, &sheet.rows)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        sheets: sheets
            .iter()
            .map(|s| {
                let data = if s.placeholder.is_some() { 0 } else { s.rows.len() - 1 };
                (s.name.to_string(), data)
            })
            .collect(),
        unavailable: sheets
            .iter()
            .filter_map(|s| Some((s.name.to_string(), s.placeholder.clone()?)))
            .collect(),
    })
}

fn network_nodes_sheet(events: &[Event], team: &str, config: &AnalyticsConfig) -> Sheet {
    Sheet::new(
        "NetworkNodes",
        &["Player", "Avg X", "Avg Y", "Made", "Received", "Node Size", "Substitutes"],
    )
    .fill(build_pass_network(events, team, &config.network), |net| {
        net.profiles
            .iter()
            .map(|p| {
                vec![
                    p.player.clone(),
                    format!("{:.1}", p.average_x),
                    format!("{:.1}", p.average_y),
                    p.passes_made.to_string(),
                    p.passes_received.to_string(),
                    format!("{:.0}", p.node_size),
                    p.substitutes.join(", "),
                ]
            })
            .collect()
    })
}

fn connections_sheet(events: &[Event], team: &str, config: &AnalyticsConfig) -> Sheet {
    Sheet::new("Connections", &["Passer", "Recipient", "Passes", "Width", "Opacity"]).fill(
        build_pass_network(events, team, &config.network),
        |net| {
            net.connections
                .iter()
                .map(|c| {
                    vec![
                        c.passer.clone(),
                        c.recipient.clone(),
                        c.count.to_string(),
                        format!("{:.2}", c.width),
                        format!("{:.2}", c.opacity),
                    ]
                })
                .collect()
        },
    )
}

fn success_sheet(events: &[Event], team: &str) -> Sheet {
    Sheet::new(
        "SuccessRates",
        &["Player", "Action", "Attempts", "Successes", "Rate %"],
    )
    .fill(team_summary(events, team), |summary| {
        let mut rows = Vec::new();
        for player in &summary.players {
            let Some(rates) = player_success_rates(events, player).ready() else {
                continue;
            };
            for r in rates.iter().filter(|r| r.has_attempts()) {
                rows.push(vec![
                    player.clone(),
                    r.action.to_string(),
                    r.attempts.to_string(),
                    r.successes.to_string(),
                    format!("{:.1}", r.rate),
                ]);
            }
        }
        rows
    })
}

fn zone_row(name: &str, count: u32, pct: f64) -> Vec<String> {
    vec![name.to_string(), count.to_string(), format!("{pct:.1}")]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;

    #[test]
    fn empty_match_writes_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let report = export_match_report(&path, &[], "Spain", &AnalyticsConfig::default()).unwrap();
        assert!(path.exists());
        assert_eq!(report.sheets.len(), 7);
        assert_eq!(report.unavailable.len(), 7);
        assert!(report.sheets.iter().all(|(_, rows)| *rows == 0));
    }

    #[test]
    fn passes_fill_network_sheets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        let events = vec![
            Event::new("1", EventKind::Pass, "A", "a1").located(30.0, 40.0).pass_to("a2", 50.0, 40.0),
            Event::new("2", EventKind::Pass, "A", "a2").located(50.0, 40.0).pass_to("a1", 30.0, 40.0),
        ];
        let report = export_match_report(&path, &events, "A", &AnalyticsConfig::default()).unwrap();
        let rows = |name: &str| report.sheets.iter().find(|(n, _)| n == name).map(|(_, r)| *r);
        assert_eq!(rows("NetworkNodes"), Some(2));
        assert_eq!(rows("Connections"), Some(2));
        assert_eq!(rows("Zones"), Some(3));
        assert!(report.unavailable.iter().any(|(n, _)| n == "Timeline"));
    }
}
