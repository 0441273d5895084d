use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Parameter contract violations. Raised only while building configuration,
/// never while aggregating event data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyticsError {
    #[error("grid must have at least one column and one row (got {cols}x{rows})")]
    InvalidGrid { cols: usize, rows: usize },
    #[error("quantile must be within [0, 1] (got {0})")]
    InvalidQuantile(f64),
    #[error("{name} bounds are inverted or non-finite ({min}..{max})")]
    InvalidBounds {
        name: &'static str,
        min: f64,
        max: f64,
    },
    #[error("{name} must be finite and non-negative (got {value})")]
    InvalidThreshold { name: &'static str, value: f64 },
}

/// Why an aggregator produced no data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Unavailable {
    /// A field every candidate row needs is absent from the whole input set.
    MissingField(&'static str),
    /// Filters matched nothing.
    Empty,
    /// Locations were present but none formed a usable `(x, y)` pair.
    MalformedCoordinates { count: usize },
    /// Not enough distinct data points to build the structure.
    Insufficient { needed: usize, found: usize },
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::MissingField(field) => write!(f, "No data: missing field `{field}`"),
            Unavailable::Empty => write!(f, "No data available"),
            Unavailable::MalformedCoordinates { count } => {
                write!(f, "No data: {count} event(s) with malformed coordinates")
            }
            Unavailable::Insufficient { needed, found } => {
                write!(f, "Insufficient data (need {needed}, found {found})")
            }
        }
    }
}

/// Result value returned by every aggregator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Aggregate<T> {
    Ready(T),
    Unavailable(Unavailable),
}

impl<T> Aggregate<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Aggregate::Ready(value) => Some(value),
            Aggregate::Unavailable(_) => None,
        }
    }

    pub fn as_ready(&self) -> Option<&T> {
        match self {
            Aggregate::Ready(value) => Some(value),
            Aggregate::Unavailable(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Aggregate::Ready(_))
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            Aggregate::Ready(_) => None,
            Aggregate::Unavailable(reason) => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Aggregate<U> {
        match self {
            Aggregate::Ready(value) => Aggregate::Ready(f(value)),
            Aggregate::Unavailable(reason) => Aggregate::Unavailable(reason),
        }
    }
}

impl<T> From<Unavailable> for Aggregate<T> {
    fn from(reason: Unavailable) -> Self {
        Aggregate::Unavailable(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_renders_placeholder_text() {
        assert_eq!(Unavailable::Empty.to_string(), "No data available");
        assert_eq!(
            Unavailable::Insufficient { needed: 2, found: 1 }.to_string(),
            "Insufficient data (need 2, found 1)"
        );
        assert!(
            Unavailable::MissingField("location")
                .to_string()
                .contains("location")
        );
    }

    #[test]
    fn map_keeps_unavailable_reason() {
        let agg: Aggregate<u32> = Unavailable::Empty.into();
        let mapped = agg.map(|v| v + 1);
        assert_eq!(mapped.unavailable(), Some(&Unavailable::Empty));
        assert_eq!(Aggregate::Ready(2).map(|v| v * 2).ready(), Some(4));
    }
}
