//! hl-series: time series and hydrographs from model containers.
//!
//! - `extract_series` reads boundary hydrographs, per-cell result columns
//!   or plain datasets into a validated `TimeSeries`
//! - `Hydrograph` summarises a series (peak, base flow, volume, duration)
//! - `list_boundary_conditions` enumerates stored boundary hydrographs

pub mod boundary;
pub mod error;
pub mod extract;
pub mod hydrograph;
pub mod layout;
pub mod series;
pub mod source;
pub mod stamp;

pub use boundary::{BoundaryCondition, BoundaryKind, list_boundary_conditions};
pub use error::{SeriesError, SeriesResult};
pub use extract::extract_series;
pub use hydrograph::{BaseFlowPolicy, Hydrograph, to_hydrograph};
pub use series::{Statistics, TimePoint, TimeSeries};
pub use source::{SeriesSource, TimeUnit};
pub use stamp::parse_date_stamp;
