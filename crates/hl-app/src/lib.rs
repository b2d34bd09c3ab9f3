//! hl-app: the request boundary of the hydrolens pipeline.
//!
//! Turns tagged requests into stage calls and folds every outcome into a
//! [`ResultEnvelope`]. Shared by the CLI and any other shell.
//!
//! - `Request` / `Pipeline::dispatch`: one synchronous call per request
//! - `ComputeService` / `InProcessCompute`: timeout and cancellation options
//! - `PipelineConfig`: YAML/JSON tunables
//! - `ProgressEvent`: stage notifications for long requests

pub mod compute;
pub mod config;
pub mod envelope;
pub mod error;
mod channel_service;
mod export_service;
mod manning_service;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod request;
mod section_service;

pub use compute::{ComputeOptions, ComputeService, InProcessCompute};
pub use config::PipelineConfig;
pub use envelope::ResultEnvelope;
pub use error::{AppError, AppResult};
pub use pipeline::Pipeline;
pub use progress::{PipelineStage, ProgressEvent};
pub use query::ModelSummary;
pub use channel_service::{ChannelAnalysis, ProfileKind};
pub use request::{
    ChannelRequest, DEFAULT_DEPTH_VARIABLE, HydrographRequest, ManningRequest, MeshFieldExportRequest,
    RasterExportRequest, Request, SectionRequest, SectionsGeoJsonRequest, SeriesRequest, TabularExportRequest,
    ZoneDefinition, ZoneInput,
};
