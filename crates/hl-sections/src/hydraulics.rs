//! Open-channel hydraulics for sampled sections and prismatic channels.

use hl_core::Real;
use serde::{Deserialize, Serialize};

use crate::error::{SectionError, SectionResult};
use crate::section::CrossSection;

pub const GRAVITY: Real = 9.81;

const BRACKET_DOUBLINGS: usize = 64;
const BISECTION_STEPS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionHydraulics {
    pub water_level: Real,
    pub wetted_area: Real,
    pub wetted_perimeter: Real,
    pub hydraulic_radius: Real,
    pub top_width: Real,
    pub max_depth: Real,
}

/// Wetted geometry of a section profile below `water_level`.
///
/// Segments crossing the water line are split at the interpolated crossing;
/// samples without elevation are skipped.
pub fn section_hydraulics(section: &CrossSection, water_level: Real) -> SectionResult<SectionHydraulics> {
    if !water_level.is_finite() {
        return Err(SectionError::InvalidParameter {
            what: "water level",
            value: water_level,
        });
    }
    let profile = section.profile();
    if profile.is_empty() {
        return Err(SectionError::NoElevations { section: section.id });
    }

    let mut area = 0.0;
    let mut perimeter = 0.0;
    let mut top_width = 0.0;
    let max_depth = profile
        .iter()
        .map(|&(_, z)| water_level - z)
        .fold(0.0, Real::max);

    for pair in profile.windows(2) {
        let (x0, z0) = pair[0];
        let (x1, z1) = pair[1];
        let dx = x1 - x0;
        let (d0, d1) = (water_level - z0, water_level - z1);
        if d0 >= 0.0 && d1 >= 0.0 {
            area += 0.5 * (d0 + d1) * dx;
            perimeter += dx.hypot(z1 - z0);
            top_width += dx;
        } else if d0 >= 0.0 || d1 >= 0.0 {
            let (wet, dry) = if d0 >= 0.0 { (d0, d1) } else { (d1, d0) };
            let len = dx * wet / (wet - dry);
            area += 0.5 * wet * len;
            perimeter += len.hypot(wet);
            top_width += len;
        }
    }

    Ok(SectionHydraulics {
        water_level,
        wetted_area: area,
        wetted_perimeter: perimeter,
        hydraulic_radius: if perimeter > 0.0 { area / perimeter } else { 0.0 },
        top_width,
        max_depth,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowRegime {
    Subcritical,
    Critical,
    Supercritical,
}

impl FlowRegime {
    pub fn from_froude(fr: Real) -> Self {
        if (fr - 1.0).abs() < 1e-3 {
            FlowRegime::Critical
        } else if fr < 1.0 {
            FlowRegime::Subcritical
        } else {
            FlowRegime::Supercritical
        }
    }
}

pub fn froude_number(velocity: Real, hydraulic_depth: Real) -> SectionResult<Real> {
    let depth = SectionError::positive("hydraulic depth", hydraulic_depth)?;
    if !velocity.is_finite() {
        return Err(SectionError::InvalidParameter {
            what: "velocity",
            value: velocity,
        });
    }
    Ok(velocity.abs() / (GRAVITY * depth).sqrt())
}

/// Trapezoidal channel: bottom width `b`, side slope `z` (horizontal per
/// vertical). `z == 0` is rectangular, `b == 0` triangular.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapezoidalChannel {
    pub bottom_width: Real,
    pub side_slope: Real,
}

impl TrapezoidalChannel {
    pub fn new(bottom_width: Real, side_slope: Real) -> SectionResult<Self> {
        for (what, value) in [("bottom width", bottom_width), ("side slope", side_slope)] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(SectionError::InvalidParameter { what, value });
            }
        }
        if bottom_width == 0.0 && side_slope == 0.0 {
            return Err(SectionError::InvalidParameter {
                what: "bottom width",
                value: 0.0,
            });
        }
        Ok(Self {
            bottom_width,
            side_slope,
        })
    }

    pub fn area(&self, y: Real) -> Real {
        (self.bottom_width + self.side_slope * y) * y
    }

    pub fn wetted_perimeter(&self, y: Real) -> Real {
        self.bottom_width + 2.0 * y * (1.0 + self.side_slope * self.side_slope).sqrt()
    }

    pub fn top_width(&self, y: Real) -> Real {
        self.bottom_width + 2.0 * self.side_slope * y
    }

    /// Flow state at depth `y` for `discharge`.
    pub fn state(&self, discharge: Real, y: Real) -> ChannelFlow {
        let area = self.area(y);
        let perimeter = self.wetted_perimeter(y);
        let top = self.top_width(y);
        let velocity = discharge / area;
        let froude = velocity / (GRAVITY * area / top).sqrt();
        ChannelFlow {
            depth: y,
            area,
            wetted_perimeter: perimeter,
            hydraulic_radius: area / perimeter,
            top_width: top,
            velocity,
            velocity_head: velocity * velocity / (2.0 * GRAVITY),
            froude,
            regime: FlowRegime::from_froude(froude),
        }
    }

    fn manning_discharge(&self, y: Real, slope: Real, n: Real) -> Real {
        let area = self.area(y);
        let radius = area / self.wetted_perimeter(y);
        area * radius.powf(2.0 / 3.0) * slope.sqrt() / n
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelFlow {
    pub depth: Real,
    pub area: Real,
    pub wetted_perimeter: Real,
    pub hydraulic_radius: Real,
    pub top_width: Real,
    pub velocity: Real,
    pub velocity_head: Real,
    pub froude: Real,
    pub regime: FlowRegime,
}

/// Root of `f` on (0, inf) for a function that changes sign once. `f` must
/// be positive near zero when `rising` is false and negative when true.
fn bisect_depth(what: &'static str, rising: bool, f: impl Fn(Real) -> Real) -> SectionResult<Real> {
    let below = |v: Real| if rising { v < 0.0 } else { v > 0.0 };
    let mut lo = 1e-9;
    let mut hi = 1.0;
    let mut doublings = 0;
    while below(f(hi)) {
        lo = hi;
        hi *= 2.0;
        doublings += 1;
        if doublings > BRACKET_DOUBLINGS {
            return Err(SectionError::NoConvergence { what });
        }
    }
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if below(f(mid)) {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-12 * hi {
            break;
        }
    }
    Ok(0.5 * (lo + hi))
}

/// Normal depth from Manning's equation `Q = A R^(2/3) S^(1/2) / n`.
pub fn normal_depth(
    channel: &TrapezoidalChannel,
    discharge: Real,
    slope: Real,
    manning_n: Real,
) -> SectionResult<ChannelFlow> {
    let q = SectionError::positive("discharge", discharge)?;
    let s = SectionError::positive("slope", slope)?;
    let n = SectionError::positive("manning n", manning_n)?;
    let y = bisect_depth("normal depth", true, |y| channel.manning_discharge(y, s, n) - q)?;
    Ok(channel.state(q, y))
}

/// Critical depth where `Q^2 T / (g A^3) = 1`.
pub fn critical_depth(channel: &TrapezoidalChannel, discharge: Real) -> SectionResult<ChannelFlow> {
    let q = SectionError::positive("discharge", discharge)?;
    let y = bisect_depth("critical depth", false, |y| {
        let a = channel.area(y);
        q * q * channel.top_width(y) / (GRAVITY * a * a * a) - 1.0
    })?;
    Ok(channel.state(q, y))
}

/// Energy components in metres of head.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyHead {
    pub elevation_head: Real,
    pub pressure_head: Real,
    pub velocity_head: Real,
    /// `z + y + v^2 / 2g`.
    pub total: Real,
}

pub fn energy_head(velocity: Real, depth: Real, bed_elevation: Real) -> SectionResult<EnergyHead> {
    for (what, value) in [("velocity", velocity), ("bed elevation", bed_elevation)] {
        if !value.is_finite() {
            return Err(SectionError::InvalidParameter { what, value });
        }
    }
    if !(depth >= 0.0 && depth.is_finite()) {
        return Err(SectionError::InvalidParameter {
            what: "depth",
            value: depth,
        });
    }
    let velocity_head = velocity * velocity / (2.0 * GRAVITY);
    Ok(EnergyHead {
        elevation_head: bed_elevation,
        pressure_head: depth,
        velocity_head,
        total: bed_elevation + depth + velocity_head,
    })
}

/// Empirical family for scour and regime-width estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RegimeMethod {
    #[default]
    Lacey,
    Blench,
    /// Scour from excess over a grain critical velocity; width as `2.3 Q^0.5`.
    Empirical,
}

/// Scour depth below the bed, in metres. `d50_mm` is the median grain
/// size and only enters the empirical method.
pub fn scour_depth(velocity: Real, depth: Real, d50_mm: Real, method: RegimeMethod) -> SectionResult<Real> {
    let v = velocity.abs();
    if !v.is_finite() {
        return Err(SectionError::InvalidParameter {
            what: "velocity",
            value: velocity,
        });
    }
    let y = SectionError::positive("depth", depth)?;
    let scour = match method {
        RegimeMethod::Lacey => 0.473 * (v * v / GRAVITY).cbrt() * y.powf(2.0 / 3.0),
        RegimeMethod::Blench => 0.5 * y * (v / (GRAVITY * y).sqrt()).powf(1.5),
        RegimeMethod::Empirical => {
            let d50 = SectionError::positive("d50", d50_mm)?;
            let critical = 0.6 * (d50 / 1000.0).sqrt();
            if v > critical { 0.3 * y * (v / critical - 1.0) } else { 0.0 }
        }
    };
    Ok(scour)
}

/// Regime (stable) channel width for `discharge`, in metres.
pub fn stable_width(discharge: Real, d50_mm: Real, method: RegimeMethod) -> SectionResult<Real> {
    let q = SectionError::positive("discharge", discharge)?;
    let width = match method {
        RegimeMethod::Lacey => {
            let silt_factor = 1.76 * SectionError::positive("d50", d50_mm)?.sqrt();
            4.75 * (q / silt_factor).sqrt()
        }
        RegimeMethod::Blench => {
            let bed_factor = 1.9 * SectionError::positive("d50", d50_mm)?.sqrt();
            1.81 * (q / bed_factor).sqrt()
        }
        RegimeMethod::Empirical => 2.3 * q.sqrt(),
    };
    Ok(width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionSample;

    fn section(profile: &[(Real, Real)]) -> CrossSection {
        CrossSection {
            id: 1,
            station: 0.0,
            center: hl_core::Point2::new(0.0, 0.0),
            bearing: 0.0,
            left: hl_core::Point2::new(0.0, 0.0),
            right: hl_core::Point2::new(0.0, 0.0),
            samples: profile
                .iter()
                .map(|&(offset, z)| SectionSample {
                    offset,
                    x: offset,
                    y: 0.0,
                    elevation: Some(z),
                    depth: None,
                    velocity: None,
                })
                .collect(),
        }
    }

    #[test]
    fn v_channel_partially_wet() {
        // V from (−10, 10) to (0, 0) to (10, 10); water at 5.
        let s = section(&[(-10.0, 10.0), (0.0, 0.0), (10.0, 10.0)]);
        let h = section_hydraulics(&s, 5.0).unwrap();
        assert!((h.top_width - 10.0).abs() < 1e-12);
        assert!((h.wetted_area - 25.0).abs() < 1e-12);
        assert!((h.wetted_perimeter - 2.0 * 50f64.sqrt()).abs() < 1e-12);
        assert!((h.max_depth - 5.0).abs() < 1e-12);
    }

    #[test]
    fn dry_section() {
        let s = section(&[(-1.0, 3.0), (1.0, 3.0)]);
        let h = section_hydraulics(&s, 1.0).unwrap();
        assert_eq!(h.wetted_area, 0.0);
        assert_eq!(h.hydraulic_radius, 0.0);
        assert_eq!(h.max_depth, 0.0);
    }

    #[test]
    fn rectangular_critical_depth() {
        let ch = TrapezoidalChannel::new(5.0, 0.0).unwrap();
        let flow = critical_depth(&ch, 20.0).unwrap();
        let expected = (4.0f64 * 4.0 / GRAVITY).cbrt();
        assert!((flow.depth - expected).abs() < 1e-8);
        assert!((flow.froude - 1.0).abs() < 1e-6);
        assert_eq!(flow.regime, FlowRegime::Critical);
    }

    #[test]
    fn normal_depth_satisfies_manning() {
        let ch = TrapezoidalChannel::new(3.0, 2.0).unwrap();
        let flow = normal_depth(&ch, 15.0, 0.001, 0.035).unwrap();
        let q = ch.manning_discharge(flow.depth, 0.001, 0.035);
        assert!((q - 15.0).abs() < 1e-6);
        assert!(flow.depth > 0.0);
    }

    #[test]
    fn energy_components() {
        let e = energy_head(2.0 * GRAVITY.sqrt(), 1.5, 100.0).unwrap();
        assert!((e.velocity_head - 2.0).abs() < 1e-12);
        assert!((e.total - 103.5).abs() < 1e-12);
        assert_eq!(e.pressure_head, 1.5);
        assert!(energy_head(1.0, -0.1, 0.0).is_err());
        assert!(energy_head(f64::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn scour_by_method() {
        // v^2 / g = 1, y = 8: Lacey gives 0.473 * 4.
        let v = GRAVITY.sqrt();
        let lacey = scour_depth(v, 8.0, 1.0, RegimeMethod::Lacey).unwrap();
        assert!((lacey - 0.473 * 4.0).abs() < 1e-12);
        // Froude 1: Blench gives y / 2.
        let blench = scour_depth((GRAVITY * 2.0).sqrt(), 2.0, 1.0, RegimeMethod::Blench).unwrap();
        assert!((blench - 1.0).abs() < 1e-12);
        // d50 = 1000 mm: critical velocity 0.6.
        let slow = scour_depth(0.5, 2.0, 1000.0, RegimeMethod::Empirical).unwrap();
        assert_eq!(slow, 0.0);
        let fast = scour_depth(1.2, 2.0, 1000.0, RegimeMethod::Empirical).unwrap();
        assert!((fast - 0.6).abs() < 1e-12);
        assert!(scour_depth(1.0, 0.0, 1.0, RegimeMethod::Lacey).is_err());
        assert!(scour_depth(1.0, 1.0, 0.0, RegimeMethod::Empirical).is_err());
    }

    #[test]
    fn regime_widths() {
        let q = 100.0;
        let lacey = stable_width(q, 1.0, RegimeMethod::Lacey).unwrap();
        assert!((lacey - 4.75 * (q / 1.76).sqrt()).abs() < 1e-12);
        let blench = stable_width(q, 4.0, RegimeMethod::Blench).unwrap();
        assert!((blench - 1.81 * (q / 3.8).sqrt()).abs() < 1e-12);
        assert!((stable_width(q, 0.0, RegimeMethod::Empirical).unwrap() - 23.0).abs() < 1e-12);
        assert!(stable_width(q, 0.0, RegimeMethod::Lacey).is_err());
        assert!(stable_width(-1.0, 1.0, RegimeMethod::Empirical).is_err());
    }

    #[test]
    fn invalid_inputs() {
        assert!(TrapezoidalChannel::new(0.0, 0.0).is_err());
        assert!(froude_number(1.0, 0.0).is_err());
        let f = froude_number(2.0, 4.0 / GRAVITY).unwrap();
        assert!((f - 1.0).abs() < 1e-12);
    }
}
