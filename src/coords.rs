use serde::Serialize;
use serde_json::Value;

pub const PITCH_LENGTH: f64 = 120.0;
pub const PITCH_WIDTH: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Normalized location field. Missing stays missing; it is never `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub enum PitchCoord {
    #[default]
    Absent,
    Malformed,
    At(Point),
}

impl PitchCoord {
    pub fn point(&self) -> Option<Point> {
        match self {
            PitchCoord::At(p) => Some(*p),
            _ => None,
        }
    }

    pub fn x(&self) -> Option<f64> {
        self.point().map(|p| p.x)
    }

    pub fn y(&self) -> Option<f64> {
        self.point().map(|p| p.y)
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, PitchCoord::Malformed)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, PitchCoord::Absent)
    }
}

impl From<Point> for PitchCoord {
    fn from(p: Point) -> Self {
        PitchCoord::At(p)
    }
}

/// Expand a `[x, y]` (or `[x, y, z]`) location into a coordinate.
pub fn normalize_location(value: Option<&Value>) -> PitchCoord {
    let Some(value) = value else {
        return PitchCoord::Absent;
    };
    match value {
        Value::Null => PitchCoord::Absent,
        Value::Array(items) => {
            if items.len() < 2 {
                return PitchCoord::Malformed;
            }
            match (finite(&items[0]), finite(&items[1])) {
                (Some(x), Some(y)) => PitchCoord::At(Point { x, y }),
                _ => PitchCoord::Malformed,
            }
        }
        _ => PitchCoord::Malformed,
    }
}

/// Build a coordinate from already-split `x`/`y` columns. Both missing is
/// `Absent`; one missing or non-finite is `Malformed`.
pub fn coord_from_columns(x: Option<&Value>, y: Option<&Value>) -> PitchCoord {
    let x = x.filter(|v| !v.is_null());
    let y = y.filter(|v| !v.is_null());
    match (x, y) {
        (None, None) => PitchCoord::Absent,
        (Some(x), Some(y)) => match (finite(x), finite(y)) {
            (Some(x), Some(y)) => PitchCoord::At(Point { x, y }),
            _ => PitchCoord::Malformed,
        },
        _ => PitchCoord::Malformed,
    }
}

fn finite(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
