use hl_catalog::{CatalogHandle, DEFAULT_CHUNK_ROWS};
use hl_core::CancelToken;
use tracing::{debug, info};

use crate::error::{SeriesError, SeriesResult};
use crate::layout;
use crate::series::TimeSeries;
use crate::source::{SeriesSource, TimeUnit};
use crate::stamp::parse_date_stamp;

/// Read the series named by `source_name` (see [`SeriesSource`]).
///
/// Bulk reads stream in chunks and honour `cancel`.
pub fn extract_series(
    handle: &CatalogHandle,
    source_name: &str,
    variable: &str,
    cancel: &CancelToken,
) -> SeriesResult<TimeSeries> {
    let source: SeriesSource = source_name.parse()?;
    let series = match &source {
        SeriesSource::Boundary { name } => boundary_series(handle, &source, name, variable, cancel)?,
        SeriesSource::Cell { area, index } => {
            cell_series(handle, &source, area, *index, variable, cancel)?
        }
        SeriesSource::Dataset { path } => dataset_series(handle, &source, path, variable, cancel)?,
    };
    info!(
        source = %source,
        variable = %series.variable,
        points = series.len(),
        "time series extracted"
    );
    Ok(series)
}

fn time_unit(handle: &CatalogHandle, paths: &[&str], default: TimeUnit) -> TimeUnit {
    paths
        .iter()
        .filter_map(|p| handle.attr_text(p, layout::TIME_UNIT_ATTRS))
        .find_map(|text| TimeUnit::parse(&text))
        .unwrap_or(default)
}

/// Parsed date stamps when a stamp dataset parallel to the time axis exists.
fn date_stamps(handle: &CatalogHandle, path: &str, rows: usize) -> Option<Vec<Option<String>>> {
    if !handle.exists(path) {
        return None;
    }
    match handle.read_strings(path, None) {
        Ok(raw) if raw.len() == rows => Some(raw.iter().map(|s| parse_date_stamp(s)).collect()),
        Ok(raw) => {
            debug!(path, stamps = raw.len(), rows, "ignoring date stamps of other length");
            None
        }
        Err(e) => {
            debug!(path, error = %e, "date stamps unreadable");
            None
        }
    }
}

/// `[n, >=2]` dataset read as time in column 0 and value in column 1.
fn two_column(
    handle: &CatalogHandle,
    path: &str,
    cancel: &CancelToken,
) -> SeriesResult<(Vec<f64>, Vec<f64>)> {
    let node = handle.dataset(path)?;
    if node.shape.len() != 2 || node.shape[1] < 2 {
        return Err(SeriesError::BadShape {
            path: node.path.clone(),
            expected: "[n, 2] time/value",
            actual: node.shape.clone(),
        });
    }
    let block = handle
        .chunks(&node.path, DEFAULT_CHUNK_ROWS, cancel)?
        .columns(0..2)
        .collect_all()?;
    Ok((block.column(0), block.column(1)))
}

fn boundary_series(
    handle: &CatalogHandle,
    source: &SeriesSource,
    name: &str,
    variable: &str,
    cancel: &CancelToken,
) -> SeriesResult<TimeSeries> {
    let (path, default_variable) = [
        (layout::FLOW_HYDROGRAPHS, "Flow"),
        (layout::STAGE_HYDROGRAPHS, "Stage"),
    ]
    .into_iter()
    .map(|(group, var)| (format!("{group}/{name}"), var))
    .find(|(path, _)| handle.catalog().get(path).is_some_and(|n| n.is_dataset()))
    .ok_or_else(|| SeriesError::SourceNotFound {
        source_name: source.to_string(),
    })?;

    let (times, values) = two_column(handle, &path, cancel)?;
    let unit = time_unit(handle, &[&path], TimeUnit::Hours);
    let variable = if variable.trim().is_empty() {
        default_variable
    } else {
        variable
    };
    TimeSeries::from_columns(source.to_string(), variable, unit, &times, &values, None)
}

fn cell_series(
    handle: &CatalogHandle,
    source: &SeriesSource,
    area: &str,
    index: usize,
    variable: &str,
    cancel: &CancelToken,
) -> SeriesResult<TimeSeries> {
    let path = layout::cell_results(area, variable);
    let node = handle
        .dataset(&path)
        .map_err(|_| SeriesError::SourceNotFound {
            source_name: format!("{source} ({variable})"),
        })?;
    if node.shape.len() != 2 {
        return Err(SeriesError::BadShape {
            path: node.path.clone(),
            expected: "[time, cell]",
            actual: node.shape.clone(),
        });
    }
    let (steps, cells) = (node.shape[0], node.shape[1]);
    if index >= cells {
        return Err(SeriesError::CellOutOfRange {
            area: area.to_string(),
            index,
            cells,
        });
    }

    let time_path = format!("{}/{}", layout::UNSTEADY_TIME_SERIES, layout::TIME);
    let times = handle.chunks(&time_path, DEFAULT_CHUNK_ROWS, cancel)?.collect_all()?.data;
    hl_core::ensure_same_len("time steps", steps, times.len())?;
    let values = handle
        .chunks(&node.path, DEFAULT_CHUNK_ROWS, cancel)?
        .columns(index..index + 1)
        .collect_all()?
        .data;

    let stamp_path = format!("{}/{}", layout::UNSTEADY_TIME_SERIES, layout::TIME_DATE_STAMP);
    let stamps = date_stamps(handle, &stamp_path, steps);
    let unit = time_unit(handle, &[&time_path], TimeUnit::Days);
    TimeSeries::from_columns(
        source.to_string(),
        variable,
        unit,
        &times,
        &values,
        stamps.as_deref(),
    )
}

fn dataset_series(
    handle: &CatalogHandle,
    source: &SeriesSource,
    path: &str,
    variable: &str,
    cancel: &CancelToken,
) -> SeriesResult<TimeSeries> {
    let node = handle.dataset(path)?;
    let default_unit = if node.path.starts_with(layout::RESULTS_ROOT) {
        TimeUnit::Days
    } else {
        TimeUnit::Hours
    };
    let variable = if variable.trim().is_empty() {
        node.name().to_string()
    } else {
        variable.to_string()
    };

    match node.shape.len() {
        2 => {
            let (times, values) = two_column(handle, &node.path, cancel)?;
            let unit = time_unit(handle, &[&node.path], default_unit);
            TimeSeries::from_columns(source.to_string(), variable, unit, &times, &values, None)
        }
        1 => {
            let time_path = layout::sibling(&node.path, layout::TIME);
            if !handle.catalog().get(&time_path).is_some_and(|n| n.is_dataset()) {
                return Err(SeriesError::SourceNotFound {
                    source_name: format!("{source} (no sibling {} axis)", layout::TIME),
                });
            }
            let values = handle.chunks(&node.path, DEFAULT_CHUNK_ROWS, cancel)?.collect_all()?.data;
            let times = handle.chunks(&time_path, DEFAULT_CHUNK_ROWS, cancel)?.collect_all()?.data;
            let stamp_path = layout::sibling(&node.path, layout::TIME_DATE_STAMP);
            let stamps = date_stamps(handle, &stamp_path, times.len());
            let unit = time_unit(handle, &[&node.path, &time_path], default_unit);
            TimeSeries::from_columns(
                source.to_string(),
                variable,
                unit,
                &times,
                &values,
                stamps.as_deref(),
            )
        }
        _ => Err(SeriesError::BadShape {
            path: node.path.clone(),
            expected: "[n] with sibling Time, or [n, 2]",
            actual: node.shape.clone(),
        }),
    }
}
