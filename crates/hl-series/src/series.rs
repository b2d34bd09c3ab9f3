use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{SeriesError, SeriesResult};
use crate::source::TimeUnit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimePoint {
    /// Elapsed time in the series' `time_unit`.
    pub time: f64,
    pub value: f64,
    /// Calendar time (RFC 3339) when the container stores date stamps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Statistics {
    /// `None` for an empty slice.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            0.5 * (sorted[mid - 1] + sorted[mid])
        } else {
            sorted[mid]
        };

        Some(Self {
            count: values.len(),
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// An ordered series with strictly increasing times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    pub source_name: String,
    pub variable: String,
    pub time_unit: TimeUnit,
    pub points: Vec<TimePoint>,
    pub statistics: Statistics,
}

impl TimeSeries {
    /// Validate and summarise `points`.
    ///
    /// Fails when empty or when a time is non-finite or does not strictly
    /// exceed its predecessor; the series is never reordered.
    pub fn new(
        source_name: impl Into<String>,
        variable: impl Into<String>,
        time_unit: TimeUnit,
        points: Vec<TimePoint>,
    ) -> SeriesResult<Self> {
        let source_name = source_name.into();
        for (index, pair) in points.windows(2).enumerate() {
            let (previous, current) = (pair[0].time, pair[1].time);
            if !(current > previous) || !current.is_finite() {
                return Err(SeriesError::NonMonotonic {
                    source_name,
                    index: index + 1,
                    previous,
                    current,
                });
            }
        }
        if let Some(first) = points.first() {
            if !first.time.is_finite() {
                return Err(SeriesError::NonMonotonic {
                    source_name,
                    index: 0,
                    previous: first.time,
                    current: first.time,
                });
            }
        }
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let statistics = Statistics::of(&values).ok_or_else(|| SeriesError::Empty {
            source_name: source_name.clone(),
        })?;
        Ok(Self {
            source_name,
            variable: variable.into(),
            time_unit,
            points,
            statistics,
        })
    }

    /// Build from parallel columns, dropping rows whose value is not finite.
    pub fn from_columns(
        source_name: impl Into<String>,
        variable: impl Into<String>,
        time_unit: TimeUnit,
        times: &[f64],
        values: &[f64],
        timestamps: Option<&[Option<String>]>,
    ) -> SeriesResult<Self> {
        let source_name = source_name.into();
        hl_core::ensure_same_len("series values", times.len(), values.len())?;
        let mut dropped = 0usize;
        let points: Vec<TimePoint> = times
            .iter()
            .zip(values)
            .enumerate()
            .filter_map(|(i, (&time, &value))| {
                if !value.is_finite() {
                    dropped += 1;
                    return None;
                }
                Some(TimePoint {
                    time,
                    value,
                    timestamp: timestamps.and_then(|t| t.get(i).cloned().flatten()),
                })
            })
            .collect();
        if dropped > 0 {
            warn!(source = %source_name, dropped, "skipped non-finite series values");
        }
        Self::new(source_name, variable, time_unit, points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.time)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.value)
    }

    pub fn duration_hours(&self) -> f64 {
        match (self.points.first(), self.points.last()) {
            (Some(a), Some(b)) => (b.time - a.time) * self.time_unit.hours(),
            _ => 0.0,
        }
    }
}
