//! Container paths of boundary hydrographs and unsteady result blocks.

pub const BOUNDARY_CONDITIONS: &str = "/Event Conditions/Unsteady/Boundary Conditions";
pub const FLOW_HYDROGRAPHS: &str = "/Event Conditions/Unsteady/Boundary Conditions/Flow Hydrographs";
pub const STAGE_HYDROGRAPHS: &str = "/Event Conditions/Unsteady/Boundary Conditions/Stage Hydrographs";

pub const UNSTEADY_TIME_SERIES: &str =
    "/Results/Unsteady/Output/Output Blocks/Base Output/Unsteady Time Series";
pub const RESULTS_ROOT: &str = "/Results";

/// Name of the time axis dataset next to result arrays.
pub const TIME: &str = "Time";
pub const TIME_DATE_STAMP: &str = "Time Date Stamp";
pub const TIME_UNIT_ATTRS: &[&str] = &["Time Units", "Units", "Time Unit"];

pub fn cell_results(area: &str, variable: &str) -> String {
    format!("{UNSTEADY_TIME_SERIES}/2D Flow Areas/{area}/{variable}")
}

pub fn sibling(dataset_path: &str, name: &str) -> String {
    match dataset_path.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/{name}"),
        None => name.to_string(),
    }
}
