use hl_core::{CancelToken, ErrorKind, Point2};
use hl_mesh::MeshGeometry;
use hl_sections::*;
use hl_terrain::{GeoTransform, TerrainRaster};
use proptest::prelude::*;

fn no_values(_: Point2) -> PointSample {
    PointSample::default()
}

fn plane(p: Point2) -> f64 {
    0.1 * p.x + 0.2 * p.y + 5.0
}

/// 300 x 200 unit pixels covering x in [-50, 250], y in [-100, 100].
fn plane_raster() -> TerrainRaster {
    let t = GeoTransform::new(-50.0, 100.0, 1.0, -1.0);
    let mut data = Vec::with_capacity(300 * 200);
    for row in 0..200 {
        for col in 0..300 {
            data.push(plane(t.pixel_center(col, row)));
        }
    }
    TerrainRaster::new(300, 200, t, data, None).unwrap()
}

fn scenario_a() -> Vec<Point2> {
    vec![
        Point2::new(0.0, 0.0),
        Point2::new(100.0, 0.0),
        Point2::new(200.0, 50.0),
    ]
}

#[test]
fn nanometre_spacing_is_refused() {
    let line = [Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)];
    let params = SectionParams::new(1e-9, 40.0);
    let err = generate(&line, &params, &no_values, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComputationError);
    assert!(err.to_string().contains("stations"), "{err}");
}

#[test]
fn stations_and_offsets_along_bent_alignment() {
    let params = SectionParams::new(50.0, 40.0);
    let sections = generate(&scenario_a(), &params, &no_values, &CancelToken::new()).unwrap();
    let total = AlignmentCurve::new(&scenario_a()).unwrap().total_length();

    let stations: Vec<f64> = sections.iter().map(|s| s.station).collect();
    assert_eq!(&stations[..4], &[0.0, 50.0, 100.0, 150.0]);
    assert_eq!(*stations.last().unwrap(), total);
    assert!(stations.windows(2).all(|w| w[0] < w[1]));

    for (i, s) in sections.iter().enumerate() {
        assert_eq!(s.id, i + 1);
        assert_eq!(s.samples.len(), 21);
        assert_eq!(s.samples[0].offset, -20.0);
        assert_eq!(s.samples[10].offset, 0.0);
        assert_eq!(s.samples[20].offset, 20.0);
        assert!((s.width() - 40.0).abs() < 1e-12);
        assert!((s.left.distance(s.right) - 40.0).abs() < 1e-9);
        assert!(s.samples.iter().all(|p| p.elevation.is_none()));
    }
    // Straight start heading east: the section runs north to south.
    let first = &sections[0];
    assert!(first.center.distance(Point2::new(0.0, 0.0)) < 1e-9);
    assert!((first.bearing - 180.0).abs() < 1e-6);
    assert!(first.left.y > first.right.y);
    assert!(sections.last().unwrap().center.distance(Point2::new(200.0, 50.0)) < 1e-6);
}

#[test]
fn terrain_elevations_are_bilinear() {
    let raster = plane_raster();
    let source = TerrainSampler::new(&raster, None);
    let sections = generate(
        &scenario_a(),
        &SectionParams::new(25.0, 40.0),
        &source,
        &CancelToken::new(),
    )
    .unwrap();
    for s in &sections {
        for sample in &s.samples {
            let z = sample.elevation.unwrap();
            assert!((z - plane(Point2::new(sample.x, sample.y))).abs() < 1e-9);
            assert!(sample.depth.is_none());
        }
    }
}

/// Four 10 x 10 cells centred at (5,5), (15,5), (5,15), (15,15).
fn four_cells() -> MeshGeometry {
    MeshGeometry::from_cells(
        "Quad",
        vec![
            Point2::new(5.0, 5.0),
            Point2::new(15.0, 5.0),
            Point2::new(5.0, 15.0),
            Point2::new(15.0, 15.0),
        ],
        vec![100.0; 4],
    )
    .unwrap()
    .with_min_elevations(vec![1.0, 2.0, 3.0, 4.0])
    .unwrap()
}

#[test]
fn mesh_cells_supply_values() {
    let mesh = four_cells();
    let depth = [0.5, 0.6, 0.7, 0.8];
    let mut params = SectionParams::new(10.0, 10.0);
    params.intervals = 2;
    let sections = generate_on_mesh(
        &[Point2::new(0.0, 10.0), Point2::new(20.0, 10.0)],
        &params,
        &mesh,
        CellFields {
            depth: Some(&depth),
            ..CellFields::default()
        },
        None,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(sections.len(), 3);

    // Left of an eastward alignment is north.
    let first = &sections[0];
    assert_eq!(first.samples[0].elevation, Some(3.0));
    assert_eq!(first.samples[0].depth, Some(0.7));
    assert_eq!(first.samples[2].elevation, Some(1.0));
    assert_eq!(first.samples[2].velocity, None);

    let last = &sections[2];
    assert_eq!(last.samples[0].elevation, Some(4.0));
    assert_eq!(last.samples[2].depth, Some(0.6));
}

#[test]
fn points_far_from_mesh_have_no_values() {
    let mesh = four_cells();
    let sections = generate_on_mesh(
        &[Point2::new(500.0, 500.0), Point2::new(600.0, 500.0)],
        &SectionParams::new(50.0, 10.0),
        &mesh,
        CellFields::default(),
        None,
        &CancelToken::new(),
    )
    .unwrap();
    assert!(sections
        .iter()
        .flat_map(|s| &s.samples)
        .all(|p| p.elevation.is_none() && p.depth.is_none()));
}

#[test]
fn mismatched_cell_field_is_rejected() {
    let mesh = four_cells();
    let err = generate_on_mesh(
        &scenario_a(),
        &SectionParams::new(50.0, 10.0),
        &mesh,
        CellFields {
            velocity: Some(&[1.0, 2.0]),
            ..CellFields::default()
        },
        None,
        &CancelToken::new(),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComputationError);
}

#[test]
fn invalid_inputs_fail() {
    let cancel = CancelToken::new();
    let one = [Point2::new(1.0, 1.0)];
    let dup = [Point2::new(1.0, 1.0), Point2::new(1.0, 1.0)];
    for (points, spacing, width) in [
        (&one[..], 10.0, 10.0),
        (&dup[..], 10.0, 10.0),
        (&scenario_a()[..], 0.0, 10.0),
        (&scenario_a()[..], 10.0, -1.0),
        (&scenario_a()[..], f64::NAN, 10.0),
    ] {
        let err = generate(points, &SectionParams::new(spacing, width), &no_values, &cancel)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ComputationError);
    }
}

#[test]
fn cancelled_before_first_station() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = generate(&scenario_a(), &SectionParams::new(10.0, 10.0), &no_values, &cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn section_hydraulics_on_generated_profile() {
    // Terrain sloping only across the channel: z = 0.2 y + 5.
    let raster = plane_raster();
    let sections = generate(
        &[Point2::new(0.0, 0.0), Point2::new(100.0, 0.0)],
        &SectionParams::new(50.0, 40.0),
        &TerrainSampler::new(&raster, None),
        &CancelToken::new(),
    )
    .unwrap();
    let s = &sections[1];
    // At x = 50: z = 10 + 0.2 y, water at 10 wets the southern half.
    let h = section_hydraulics(s, 10.0).unwrap();
    assert!((h.top_width - 20.0).abs() < 1e-6);
    assert!((h.max_depth - 4.0).abs() < 1e-6);
    assert!((h.wetted_area - 40.0).abs() < 1e-6);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn offsets_symmetric_and_stations_bounded(
        coords in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 2..6),
        spacing in 10.0f64..300.0,
        width in 0.5f64..100.0,
        intervals in 2usize..40,
    ) {
        let points: Vec<Point2> = coords.iter().map(|&(x, y)| Point2::new(x, y)).collect();
        let curve = AlignmentCurve::new(&points);
        prop_assume!(curve.is_ok());
        let total = curve.unwrap().total_length();

        let mut params = SectionParams::new(spacing, width);
        params.intervals = intervals;
        let sections = generate(&points, &params, &no_values, &CancelToken::new()).unwrap();

        let last = sections.last().unwrap();
        prop_assert!(last.station <= total);
        prop_assert!(sections.windows(2).all(|w| w[0].station < w[1].station));
        for s in &sections {
            let offsets: Vec<f64> = s.offsets().collect();
            let n = offsets.len() - 1;
            prop_assert!(n % 2 == 0);
            prop_assert!(offsets.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(offsets[0], -width / 2.0);
            prop_assert_eq!(offsets[n], width / 2.0);
            for i in 0..=n {
                prop_assert_eq!(offsets[i], -offsets[n - i]);
            }
        }
    }
}
