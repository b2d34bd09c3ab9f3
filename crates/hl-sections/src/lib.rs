//! hl-sections: cross-sections along a user alignment.
//!
//! - `AlignmentCurve`: Catmull-Rom centreline parametrized by arc length
//! - `generate` places stations and samples perpendicular profiles
//! - `hydraulics` computes wetted geometry, channel depths, energy head,
//!   scour and regime widths

pub mod curve;
pub mod error;
pub mod generate;
pub mod hydraulics;
pub mod sample;
pub mod section;

pub use curve::{AlignmentCurve, MAX_STATIONS, stations};
pub use error::{SectionError, SectionResult};
pub use generate::{DEFAULT_INTERVALS, SectionParams, generate, generate_on_mesh};
pub use hydraulics::{
    ChannelFlow, EnergyHead, FlowRegime, GRAVITY, RegimeMethod, SectionHydraulics, TrapezoidalChannel,
    critical_depth, energy_head, froude_number, normal_depth, scour_depth, section_hydraulics,
    stable_width,
};
pub use sample::{CellFields, MeshSampler, PointSample, SampleSource, TerrainSampler};
pub use section::{CrossSection, SectionSample};
