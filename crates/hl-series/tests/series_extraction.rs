use hl_catalog::{CatalogHandle, MemoryContainer};
use hl_core::{CancelToken, ErrorKind};
use hl_series::layout::{FLOW_HYDROGRAPHS, STAGE_HYDROGRAPHS, UNSTEADY_TIME_SERIES};
use hl_series::*;
use proptest::prelude::*;

fn model() -> CatalogHandle {
    let uts = UNSTEADY_TIME_SERIES;
    let container = MemoryContainer::new()
        .dataset(
            &format!("{FLOW_HYDROGRAPHS}/Upstream"),
            &[3, 2],
            vec![0.0, 10.0, 1.0, 30.0, 2.0, 10.0],
        )
        .dataset(
            &format!("{FLOW_HYDROGRAPHS}/Broken"),
            &[3, 2],
            vec![0.0, 1.0, 2.0, 1.0, 1.0, 1.0],
        )
        .dataset(
            &format!("{STAGE_HYDROGRAPHS}/Downstream"),
            &[2, 2],
            vec![0.0, 1.5, 1.0, 1.7],
        )
        .attr(&format!("{STAGE_HYDROGRAPHS}/Downstream"), "Time Units", "minutes")
        .dataset(&format!("{uts}/Time"), &[3], vec![0.0, 0.5, 1.0])
        .strings(
            &format!("{uts}/Time Date Stamp"),
            ["01JAN2020 00:00:00", "01JAN2020 12:00:00", "02JAN2020 00:00:00"],
        )
        .dataset(
            &format!("{uts}/2D Flow Areas/Perimeter 1/Depth"),
            &[3, 2],
            vec![0.0, 1.0, 0.5, 2.0, 0.2, 1.5],
        )
        .dataset("/Results/Summary/Volume", &[3], vec![5.0, 7.0, 6.0])
        .dataset("/Results/Summary/Time", &[3], vec![0.0, 1.0, 2.0]);
    CatalogHandle::from_source(container, &CancelToken::new()).unwrap()
}

#[test]
fn boundary_hydrograph_summary() {
    let h = model();
    let series = extract_series(&h, "bc:Upstream", "", &CancelToken::new()).unwrap();
    assert_eq!(series.variable, "Flow");
    assert_eq!(series.time_unit, TimeUnit::Hours);
    assert_eq!(series.statistics.max, 30.0);

    let hydro = to_hydrograph(&series, BaseFlowPolicy::default()).unwrap();
    assert_eq!(hydro.peak_value, 30.0);
    assert_eq!(hydro.peak_time, 1.0);
    assert_eq!(hydro.base_flow, 10.0);
    assert_eq!(hydro.total_volume, 40.0);
    assert_eq!(hydro.duration_hours, 2.0);

    let json = serde_json::to_value(&hydro).unwrap();
    assert_eq!(json["peakValue"], 30.0);
    assert_eq!(json["baseFlowPolicy"], "firstSample");
    assert!(json.get("peakTimestamp").is_none());
}

#[test]
fn stage_hydrograph_uses_time_unit_attribute() {
    let h = model();
    let series = extract_series(&h, "bc:Downstream", "Stage", &CancelToken::new()).unwrap();
    assert_eq!(series.time_unit, TimeUnit::Minutes);
    assert!((series.duration_hours() - 1.0 / 60.0).abs() < 1e-12);
}

#[test]
fn cell_column_with_date_stamps() {
    let h = model();
    let series = extract_series(&h, "cell:Perimeter 1:1", "Depth", &CancelToken::new()).unwrap();
    assert_eq!(series.values().collect::<Vec<_>>(), vec![1.0, 2.0, 1.5]);
    assert_eq!(series.time_unit, TimeUnit::Days);
    assert_eq!(series.duration_hours(), 24.0);
    assert_eq!(
        series.points[1].timestamp.as_deref(),
        Some("2020-01-01T12:00:00Z")
    );

    let hydro = to_hydrograph(&series, BaseFlowPolicy::Minimum).unwrap();
    assert_eq!(hydro.base_flow, 1.0);
    assert_eq!(hydro.peak_timestamp.as_deref(), Some("2020-01-01T12:00:00Z"));
}

#[test]
fn plain_dataset_with_sibling_time() {
    let h = model();
    let series = extract_series(&h, "/Results/Summary/Volume", "", &CancelToken::new()).unwrap();
    assert_eq!(series.variable, "Volume");
    assert_eq!(series.time_unit, TimeUnit::Days);
    assert_eq!(series.statistics.median, 6.0);
}

#[test]
fn failures_carry_kinds() {
    let h = model();
    let cancel = CancelToken::new();
    let kind = |source: &str, variable: &str| {
        extract_series(&h, source, variable, &cancel).unwrap_err().kind()
    };
    assert_eq!(kind("bc:Broken", ""), ErrorKind::ComputationError);
    assert_eq!(kind("bc:Nowhere", ""), ErrorKind::DatasetMissing);
    assert_eq!(kind("cell:Perimeter 1:2", "Depth"), ErrorKind::DatasetMissing);
    assert_eq!(kind("cell:Perimeter 1:0", "Velocity"), ErrorKind::DatasetMissing);
    assert_eq!(kind("cell:Perimeter 1:x", "Depth"), ErrorKind::ComputationError);
    assert_eq!(kind("/Results/Nothing", ""), ErrorKind::DatasetMissing);
}

#[test]
fn cancelled_read() {
    let h = model();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = extract_series(&h, "bc:Upstream", "", &cancel).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn lists_boundary_conditions() {
    let bcs = list_boundary_conditions(&model());
    let names: Vec<&str> = bcs.iter().map(|b| b.name.as_str()).collect();
    // The in-memory container lists children by name.
    assert_eq!(names, ["Broken", "Upstream", "Downstream"]);
    assert_eq!(bcs[2].kind, BoundaryKind::StageHydrograph);
    assert_eq!(bcs[2].time_unit, TimeUnit::Minutes);
    assert_eq!(bcs[1].kind, BoundaryKind::FlowHydrograph);
    assert_eq!(bcs[1].time_steps, 3);
    assert_eq!(bcs[1].source_name, "bc:Upstream");
}

proptest! {
    #[test]
    fn peak_is_first_maximum(
        rows in prop::collection::vec((0.01f64..10.0, -100i32..100), 1..60),
    ) {
        let mut t = 0.0;
        let mut times = Vec::new();
        let mut values = Vec::new();
        for (dt, v) in rows {
            t += dt;
            times.push(t);
            values.push(v as f64);
        }
        let series = TimeSeries::from_columns("p", "Flow", TimeUnit::Hours, &times, &values, None).unwrap();
        let hydro = to_hydrograph(&series, BaseFlowPolicy::FirstSample).unwrap();

        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let first = values.iter().position(|&v| v == max).unwrap();
        prop_assert_eq!(hydro.peak_value, max);
        prop_assert_eq!(hydro.peak_time, times[first]);
        prop_assert_eq!(hydro.base_flow, values[0]);
    }
}
