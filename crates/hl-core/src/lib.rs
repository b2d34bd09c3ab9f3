//! hl-core: stable foundation for hydrolens.
//!
//! Contains:
//! - error (failure taxonomy shared by every pipeline stage)
//! - numeric (Real + tolerances + float helpers)
//! - geometry (2D points, bounding boxes, polygon helpers)
//! - ids (compact IDs for mesh cells and roughness zones)
//! - cancel (cooperative cancellation with optional deadline)

pub mod cancel;
pub mod error;
pub mod geometry;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use cancel::CancelToken;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use geometry::*;
pub use ids::*;
pub use numeric::*;
