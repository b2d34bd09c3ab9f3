//! Uniform-flow analysis of a prismatic channel.

use hl_core::{CancelToken, Real};
use hl_sections::{
    ChannelFlow, EnergyHead, FlowRegime, RegimeMethod, TrapezoidalChannel, critical_depth, energy_head,
    froude_number, normal_depth, scour_depth, stable_width,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AppResult;
use crate::pipeline::{Pipeline, invalid};
use crate::request::ChannelRequest;

/// Relative depth difference below which flow counts as uniform.
const UNIFORM_TOLERANCE: Real = 1e-3;

/// Observed depth against normal depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileKind {
    Backwater,
    Uniform,
    Drawdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAnalysis {
    pub channel: TrapezoidalChannel,
    pub normal: ChannelFlow,
    pub critical: ChannelFlow,
    /// Depth and velocity analysed: observed values, else normal flow.
    pub depth: Real,
    pub velocity: Real,
    pub froude: Real,
    pub regime: FlowRegime,
    pub profile: ProfileKind,
    pub energy: EnergyHead,
    pub method: RegimeMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scour_depth: Option<Real>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stable_width: Option<Real>,
}

impl Pipeline {
    pub(crate) fn channel_analysis(&self, req: &ChannelRequest, cancel: &CancelToken) -> AppResult<ChannelAnalysis> {
        cancel.check()?;
        let channel = TrapezoidalChannel::new(req.bottom_width, req.side_slope)?;
        let normal = normal_depth(&channel, req.discharge, req.slope, req.manning_n)?;
        let critical = critical_depth(&channel, req.discharge)?;

        let depth = match req.depth {
            Some(d) if d > 0.0 && d.is_finite() => d,
            Some(d) => return Err(invalid(format!("depth {d} is not positive"))),
            None => normal.depth,
        };
        let at_depth = channel.state(req.discharge, depth);
        let velocity = req.velocity.unwrap_or(at_depth.velocity);
        let froude = froude_number(velocity, at_depth.area / at_depth.top_width)?;

        let profile = if (depth - normal.depth).abs() <= UNIFORM_TOLERANCE * normal.depth {
            ProfileKind::Uniform
        } else if depth > normal.depth {
            ProfileKind::Backwater
        } else {
            ProfileKind::Drawdown
        };

        let (scour, width) = match req.d50 {
            Some(d50) => (
                Some(scour_depth(velocity, depth, d50, req.method)?),
                Some(stable_width(req.discharge, d50, req.method)?),
            ),
            None => (None, None),
        };
        debug!(depth, froude, ?profile, "channel analysed");

        Ok(ChannelAnalysis {
            channel,
            normal,
            critical,
            depth,
            velocity,
            froude,
            regime: FlowRegime::from_froude(froude),
            profile,
            energy: energy_head(velocity, depth, req.bed_elevation)?,
            method: req.method,
            scour_depth: scour,
            stable_width: width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use hl_core::ErrorKind;
    use hl_sections::GRAVITY;

    fn request() -> ChannelRequest {
        ChannelRequest {
            discharge: 20.0,
            slope: 0.001,
            manning_n: 0.03,
            bottom_width: 5.0,
            side_slope: 0.0,
            depth: None,
            velocity: None,
            bed_elevation: 100.0,
            d50: None,
            method: RegimeMethod::Lacey,
        }
    }

    #[test]
    fn normal_flow_is_uniform() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let a = pipeline.channel_analysis(&request(), &CancelToken::new()).unwrap();
        assert_eq!(a.profile, ProfileKind::Uniform);
        assert_eq!(a.depth, a.normal.depth);
        assert!((a.velocity - 20.0 / (5.0 * a.depth)).abs() < 1e-9);
        assert!((a.energy.total - (100.0 + a.depth + a.velocity.powi(2) / (2.0 * GRAVITY))).abs() < 1e-9);
        let expected_critical = (4.0f64 * 4.0 / GRAVITY).cbrt();
        assert!((a.critical.depth - expected_critical).abs() < 1e-8);
        assert!(a.scour_depth.is_none() && a.stable_width.is_none());
    }

    #[test]
    fn observed_depth_and_grain_size() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let mut req = request();
        req.depth = Some(10.0);
        req.d50 = Some(1.0);
        let a = pipeline.channel_analysis(&req, &CancelToken::new()).unwrap();
        assert_eq!(a.profile, ProfileKind::Backwater);
        assert_eq!(a.regime, FlowRegime::Subcritical);
        assert!((a.velocity - 0.4).abs() < 1e-12);
        assert!((a.stable_width.unwrap() - 4.75 * (20.0f64 / 1.76).sqrt()).abs() < 1e-12);
        assert!(a.scour_depth.unwrap() > 0.0);

        req.depth = Some(0.05);
        let a = pipeline.channel_analysis(&req, &CancelToken::new()).unwrap();
        assert_eq!(a.profile, ProfileKind::Drawdown);
        assert_eq!(a.regime, FlowRegime::Supercritical);
    }

    #[test]
    fn invalid_channel() {
        let pipeline = Pipeline::new(PipelineConfig::default());
        let mut req = request();
        req.bottom_width = 0.0;
        let err = pipeline.channel_analysis(&req, &CancelToken::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComputationError);

        let mut req = request();
        req.depth = Some(-1.0);
        assert!(pipeline.channel_analysis(&req, &CancelToken::new()).is_err());
    }
}
