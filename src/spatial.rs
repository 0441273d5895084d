use serde::Serialize;

use crate::coords::{PITCH_LENGTH, PITCH_WIDTH, Point};
use crate::error::{Aggregate, AnalyticsError, Unavailable};
use crate::event::{Event, EventFilter, EventKind};

/// Event types counted as a "touch" on a player heatmap.
pub const TOUCH_KINDS: &[EventKind] = &[
    EventKind::Pass,
    EventKind::BallReceipt,
    EventKind::Carry,
    EventKind::Clearance,
    EventKind::FoulWon,
    EventKind::Block,
    EventKind::BallRecovery,
    EventKind::Duel,
    EventKind::Dribble,
    EventKind::Interception,
    EventKind::Miscontrol,
    EventKind::Shot,
];

pub const DEFENSIVE_KINDS: &[EventKind] = &[
    EventKind::Tackle,
    EventKind::Interception,
    EventKind::Block,
    EventKind::Clearance,
    EventKind::FoulCommitted,
];

const DEFENSIVE_THIRD_END: f64 = 40.0;
const ATTACKING_THIRD_START: f64 = 80.0;

/// Fixed-resolution pitch grid: `cols` cells along the length, `rows` across
/// the width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridSpec {
    pub cols: usize,
    pub rows: usize,
}

impl GridSpec {
    pub const TOUCH: GridSpec = GridSpec { cols: 16, rows: 11 };
    pub const DEFENSIVE: GridSpec = GridSpec { cols: 12, rows: 8 };

    pub fn new(cols: usize, rows: usize) -> Result<Self, AnalyticsError> {
        if cols == 0 || rows == 0 {
            return Err(AnalyticsError::InvalidGrid { cols, rows });
        }
        Ok(Self { cols, rows })
    }

    pub fn cell_width(&self) -> f64 {
        PITCH_LENGTH / self.cols as f64
    }

    pub fn cell_height(&self) -> f64 {
        PITCH_WIDTH / self.rows as f64
    }

    /// Cells are closed on the left and open on the right, except the last one.
    /// Points off the pitch are clamped into the border cells.
    pub fn cell_for(&self, p: Point) -> (usize, usize) {
        let col = axis_cell(p.x, PITCH_LENGTH, self.cols);
        let row = axis_cell(p.y, PITCH_WIDTH, self.rows);
        (col, row)
    }
}

fn axis_cell(v: f64, extent: f64, cells: usize) -> usize {
    let v = v.clamp(0.0, extent);
    let idx = (v / extent * cells as f64).floor() as usize;
    idx.min(cells - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Normalization {
    /// Busiest cell becomes 1.0.
    Max,
    /// Densities sum to 1.0.
    Total,
}

#[derive(Debug, Clone, Serialize)]
pub struct PitchBin {
    pub col: usize,
    pub row: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
    pub count: u32,
    pub density: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Heatmap {
    pub grid: GridSpec,
    pub normalization: Normalization,
    /// Row-major: `counts[row * cols + col]`.
    pub counts: Vec<u32>,
    pub total: u32,
}

impl Heatmap {
    pub fn count(&self, col: usize, row: usize) -> u32 {
        if col >= self.grid.cols || row >= self.grid.rows {
            return 0;
        }
        self.counts[row * self.grid.cols + col]
    }

    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn density(&self, col: usize, row: usize) -> f64 {
        let denom = match self.normalization {
            Normalization::Max => self.max_count(),
            Normalization::Total => self.total,
        };
        if denom == 0 {
            return 0.0;
        }
        self.count(col, row) as f64 / denom as f64
    }

    pub fn bins(&self) -> Vec<PitchBin> {
        let (w, h) = (self.grid.cell_width(), self.grid.cell_height());
        let mut out = Vec::with_capacity(self.counts.len());
        for row in 0..self.grid.rows {
            for col in 0..self.grid.cols {
                out.push(PitchBin {
                    col,
                    row,
                    x_min: col as f64 * w,
                    x_max: (col + 1) as f64 * w,
                    y_min: row as f64 * h,
                    y_max: (row + 1) as f64 * h,
                    count: self.count(col, row),
                    density: self.density(col, row),
                });
            }
        }
        out
    }
}

pub fn bin_points<I>(points: I, grid: GridSpec, normalization: Normalization) -> Heatmap
where
    I: IntoIterator<Item = Point>,
{
    let mut counts = vec![0u32; grid.cols * grid.rows];
    let mut total = 0u32;
    for p in points {
        let (col, row) = grid.cell_for(p);
        counts[row * grid.cols + col] += 1;
        total += 1;
    }
    Heatmap {
        grid,
        normalization,
        counts,
        total,
    }
}

/// Grid heatmap over the events selected by `filter`. Events without a valid
/// location are excluded from both the cells and the denominator.
pub fn build_heatmap(
    events: &[Event],
    filter: &EventFilter,
    grid: GridSpec,
    normalization: Normalization,
) -> Aggregate<Heatmap> {
    match located_points(events, filter) {
        Ok(points) => Aggregate::Ready(bin_points(points, grid, normalization)),
        Err(reason) => Aggregate::Unavailable(reason),
    }
}

pub fn player_touch_heatmap(events: &[Event], player: &str, grid: GridSpec) -> Aggregate<Heatmap> {
    let filter = EventFilter::player(player).with_kinds(TOUCH_KINDS);
    build_heatmap(events, &filter, grid, Normalization::Total)
}

pub fn defensive_heatmap(events: &[Event], team: &str) -> Aggregate<Heatmap> {
    let filter = EventFilter::team(team).with_kinds(DEFENSIVE_KINDS);
    build_heatmap(events, &filter, GridSpec::DEFENSIVE, Normalization::Max)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ZoneSplit {
    pub defensive: u32,
    pub middle: u32,
    pub attacking: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ZonePercentages {
    pub defensive: f64,
    pub middle: f64,
    pub attacking: f64,
}

impl ZoneSplit {
    pub fn total(&self) -> u32 {
        self.defensive + self.middle + self.attacking
    }

    pub fn add(&mut self, x: f64) {
        if x < DEFENSIVE_THIRD_END {
            self.defensive += 1;
        } else if x <= ATTACKING_THIRD_START {
            self.middle += 1;
        } else {
            self.attacking += 1;
        }
    }

    /// All zeros for an empty split.
    pub fn percentages(&self) -> ZonePercentages {
        let total = self.total();
        if total == 0 {
            return ZonePercentages::default();
        }
        let pct = |n: u32| n as f64 / total as f64 * 100.0;
        ZonePercentages {
            defensive: pct(self.defensive),
            middle: pct(self.middle),
            attacking: pct(self.attacking),
        }
    }
}

impl ZonePercentages {
    pub fn sum(&self) -> f64 {
        self.defensive + self.middle + self.attacking
    }
}

pub fn zone_split_points<I>(points: I) -> ZoneSplit
where
    I: IntoIterator<Item = Point>,
{
    let mut split = ZoneSplit::default();
    for p in points {
        split.add(p.x);
    }
    split
}

pub fn build_zone_split(events: &[Event], filter: &EventFilter) -> Aggregate<ZoneSplit> {
    match located_points(events, filter) {
        Ok(points) => Aggregate::Ready(zone_split_points(points)),
        Err(reason) => Aggregate::Unavailable(reason),
    }
}

pub(crate) fn located_points(events: &[Event], filter: &EventFilter) -> Result<Vec<Point>, Unavailable> {
    let selected = filter.apply(events);
    if selected.is_empty() {
        return Err(Unavailable::Empty);
    }
    let mut malformed = 0usize;
    let mut points = Vec::with_capacity(selected.len());
    for e in selected {
        match e.location.point() {
            Some(p) => points.push(p),
            None if e.location.is_malformed() => malformed += 1,
            None => {}
        }
    }
    if points.is_empty() {
        return Err(if malformed > 0 {
            Unavailable::MalformedCoordinates { count: malformed }
        } else {
            Unavailable::MissingField("location")
        });
    }
    Ok(points)
}
