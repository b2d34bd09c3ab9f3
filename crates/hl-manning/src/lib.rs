//! hl-manning: roughness-zone resolution and calibration.
//!
//! - `resolve` turns a per-cell zone assignment plus a base table into
//!   calibrated zones with area coverage, reporting unknown zones separately
//! - `zones_from_cell_values` derives zones from a per-cell roughness array
//! - `read_cell_roughness` locates that array in a container

pub mod classify;
pub mod error;
pub mod resolve;
pub mod source;

pub use classify::{DerivedZones, PlausibleRange, roughness_class, roughness_description, zones_from_cell_values};
pub use error::{ManningError, ManningResult};
pub use resolve::{
    BaseEntry, BaseTable, CalibrationOverride, CalibrationOverrides, ManningResolution, ManningZone,
    UNASSIGNED, UnresolvedZone, resolve,
};
pub use source::{RoughnessArray, landcover_sidecars, read_cell_roughness, read_landcover_roughness};
