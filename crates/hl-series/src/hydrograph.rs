use serde::{Deserialize, Serialize};

use crate::error::{SeriesError, SeriesResult};
use crate::series::TimeSeries;
use crate::source::TimeUnit;

/// How the base flow of a hydrograph is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BaseFlowPolicy {
    /// Value at the first timestamp.
    #[default]
    FirstSample,
    /// Smallest value of the series.
    Minimum,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hydrograph {
    pub source_name: String,
    pub variable: String,
    pub time_unit: TimeUnit,
    pub peak_value: f64,
    pub peak_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_timestamp: Option<String>,
    pub base_flow: f64,
    pub base_flow_policy: BaseFlowPolicy,
    /// Trapezoidal integral of value over time, in value x `time_unit`.
    pub total_volume: f64,
    pub duration_hours: f64,
}

impl Hydrograph {
    pub fn from_series(series: &TimeSeries, policy: BaseFlowPolicy) -> SeriesResult<Self> {
        let Some((first, rest)) = series.points.split_first() else {
            return Err(SeriesError::Empty {
                source_name: series.source_name.clone(),
            });
        };
        let mut peak = first;
        for p in rest {
            // Strict comparison keeps the first occurrence on ties.
            if p.value > peak.value {
                peak = p;
            }
        }
        let total_volume: f64 = series
            .points
            .windows(2)
            .map(|w| 0.5 * (w[0].value + w[1].value) * (w[1].time - w[0].time))
            .sum();
        let base_flow = match policy {
            BaseFlowPolicy::FirstSample => first.value,
            BaseFlowPolicy::Minimum => series.values().fold(f64::INFINITY, f64::min),
        };
        Ok(Self {
            source_name: series.source_name.clone(),
            variable: series.variable.clone(),
            time_unit: series.time_unit,
            peak_value: peak.value,
            peak_time: peak.time,
            peak_timestamp: peak.timestamp.clone(),
            base_flow,
            base_flow_policy: policy,
            total_volume,
            duration_hours: series.duration_hours(),
        })
    }

    /// Peak above base flow.
    pub fn peak_excess(&self) -> f64 {
        self.peak_value - self.base_flow
    }
}

pub fn to_hydrograph(series: &TimeSeries, policy: BaseFlowPolicy) -> SeriesResult<Hydrograph> {
    Hydrograph::from_series(series, policy)
}
