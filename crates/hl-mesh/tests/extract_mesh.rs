use hl_catalog::{CatalogHandle, MemoryContainer};
use hl_core::{CancelToken, ErrorKind, Point2};
use hl_mesh::*;
use proptest::prelude::*;

/// Add an `nx` x `ny` grid of square cells of side `h` to `src`.
fn grid_area(src: MemoryContainer, area: &str, nx: usize, ny: usize, h: f64, origin: (f64, f64)) -> MemoryContainer {
    let mut facepoints = Vec::new();
    for j in 0..=ny {
        for i in 0..=nx {
            facepoints.push(origin.0 + i as f64 * h);
            facepoints.push(origin.1 + j as f64 * h);
        }
    }
    let fp = |i: usize, j: usize| (j * (nx + 1) + i) as f64;
    let mut centers = Vec::new();
    let mut indexes = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            centers.push(origin.0 + (i as f64 + 0.5) * h);
            centers.push(origin.1 + (j as f64 + 0.5) * h);
            // Padded to 6 columns like HEC-RAS.
            indexes.extend([fp(i, j), fp(i + 1, j), fp(i + 1, j + 1), fp(i, j + 1), -1.0, -1.0]);
        }
    }
    let base = format!("/Geometry/2D Flow Areas/{area}");
    src.dataset(&format!("{base}/Cells Center Coordinate"), &[nx * ny, 2], centers)
        .dataset(&format!("{base}/FacePoints Coordinate"), &[(nx + 1) * (ny + 1), 2], facepoints)
        .dataset(&format!("{base}/Cells FacePoint Indexes"), &[nx * ny, 6], indexes)
}

fn handle(src: MemoryContainer) -> CatalogHandle {
    CatalogHandle::from_source(src, &CancelToken::new()).unwrap()
}

#[test]
fn single_area_from_topology() {
    let src = grid_area(MemoryContainer::new(), "Perimeter 1", 3, 2, 10.0, (0.0, 0.0))
        .attr("/", "Projection", "EPSG:26915");
    let mesh = extract(&handle(src), Some("Perimeter 1"), &CancelToken::new()).unwrap();

    assert_eq!(mesh.cell_count, 6);
    assert_eq!(mesh.node_count, 12);
    assert_eq!(mesh.cell_centers.len(), mesh.cell_areas.len());
    assert_eq!(mesh.area_source, AreaSource::Shoelace);
    assert!(mesh.cell_areas.iter().all(|a| (a - 100.0).abs() < 1e-9));
    assert_eq!(mesh.bounding_box.min_x, 5.0);
    assert_eq!(mesh.bounding_box.max_x, 25.0);
    assert_eq!(mesh.bounding_box.max_y, 15.0);
    assert_eq!(mesh.coordinate_system, "EPSG:26915");
    assert!((mesh.cell_size.avg - 10.0).abs() < 1e-9);
}

#[test]
fn stored_areas_win_and_virtual_cells_dropped() {
    let base = "/Geometry/2D Flow Areas/A";
    // Three rows of centres, but only two real cells.
    let src = MemoryContainer::new()
        .dataset(&format!("{base}/Cells Center Coordinate"), &[3, 2], vec![0.0, 0.0, 1.0, 0.0, 9.0, 9.0])
        .dataset(&format!("{base}/Cells Surface Area"), &[3], vec![2.0, 3.0, 0.0])
        .attr(base, "Cell Count", 2i64);
    let mesh = extract(&handle(src), None, &CancelToken::new()).unwrap();
    assert_eq!(mesh.cell_count, 2);
    assert_eq!(mesh.cell_areas, vec![2.0, 3.0]);
    assert_eq!(mesh.area_source, AreaSource::Stored);
    assert_eq!(mesh.coordinate_system, "unknown");
    assert!(mesh.topology.is_none());
    assert_eq!(mesh.bounding_box.max_x, 1.0);
}

#[test]
fn all_areas_concatenate_with_offsets() {
    let src = grid_area(MemoryContainer::new(), "North", 2, 1, 1.0, (0.0, 10.0));
    let src = grid_area(src, "South", 1, 1, 2.0, (0.0, 0.0));
    let mesh = extract(&handle(src), None, &CancelToken::new()).unwrap();

    assert_eq!(mesh.name, ALL_AREAS);
    assert_eq!(mesh.cell_count, 3);
    assert_eq!(mesh.areas.len(), 2);
    let south = mesh.area("South").unwrap();
    let topo = mesh.topology.as_ref().unwrap();
    let poly = topo.cell_polygon(south.first_cell);
    assert_eq!(poly[2], Point2::new(2.0, 2.0));
    assert!((mesh.cell_areas[south.first_cell] - 4.0).abs() < 1e-12);
}

#[test]
fn degenerate_cell_is_computation_error() {
    let base = "/Geometry/2D Flow Areas/Bad";
    let src = MemoryContainer::new()
        .dataset(&format!("{base}/Cells Center Coordinate"), &[1, 2], vec![0.5, 0.5])
        .dataset(&format!("{base}/FacePoints Coordinate"), &[3, 2], vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0])
        .dataset(&format!("{base}/Cells FacePoint Indexes"), &[1, 4], vec![0.0, 1.0, -1.0, -1.0]);
    let err = extract(&handle(src), None, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComputationError);

    // Collinear facepoints: three of them, but zero area.
    let src = MemoryContainer::new()
        .dataset(&format!("{base}/Cells Center Coordinate"), &[1, 2], vec![0.5, 0.0])
        .dataset(&format!("{base}/FacePoints Coordinate"), &[3, 2], vec![0.0, 0.0, 1.0, 0.0, 2.0, 0.0])
        .dataset(&format!("{base}/Cells FacePoint Indexes"), &[1, 3], vec![0.0, 1.0, 2.0]);
    let err = extract(&handle(src), None, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComputationError);
}

#[test]
fn missing_area_and_datasets() {
    let src = grid_area(MemoryContainer::new(), "A", 1, 1, 1.0, (0.0, 0.0));
    let err = extract(&handle(src), Some("B"), &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatasetMissing);

    let err = extract(&handle(MemoryContainer::new().group("/Geometry")), None, &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatasetMissing);

    // Centres only: no way to get areas.
    let src = MemoryContainer::new().dataset(
        "/Geometry/2D Flow Areas/A/Cells Center Coordinate",
        &[1, 2],
        vec![0.0, 0.0],
    );
    let err = extract(&handle(src), None, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DatasetMissing);
}

#[test]
fn cancelled_extraction() {
    let src = grid_area(MemoryContainer::new(), "A", 2, 2, 1.0, (0.0, 0.0));
    let h = handle(src);
    let cancel = CancelToken::new();
    cancel.cancel();
    assert_eq!(extract(&h, None, &cancel).unwrap_err().kind(), ErrorKind::Cancelled);
}

#[test]
fn locator_on_extracted_grid() {
    let src = grid_area(MemoryContainer::new(), "A", 4, 4, 5.0, (100.0, 200.0));
    let mesh = extract(&handle(src), None, &CancelToken::new()).unwrap();
    let loc = CellLocator::new(&mesh);
    // Column 2, row 3.
    let hit = loc.locate(Point2::new(112.0, 217.0)).unwrap();
    assert_eq!(hit, CellHit::Inside(3 * 4 + 2));
}

proptest! {
    #[test]
    fn grid_areas_sum_to_extent(nx in 1usize..6, ny in 1usize..6, h in 0.5f64..50.0) {
        let src = grid_area(MemoryContainer::new(), "P", nx, ny, h, (0.0, 0.0));
        let mesh = extract(&handle(src), None, &CancelToken::new()).unwrap();
        let expected = nx as f64 * ny as f64 * h * h;
        prop_assert_eq!(mesh.cell_count, nx * ny);
        prop_assert!((mesh.total_area() - expected).abs() <= 1e-9 * expected);
    }
}
