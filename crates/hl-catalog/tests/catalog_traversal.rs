use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hl_catalog::*;
use hl_core::{CancelToken, ErrorKind};

fn model() -> MemoryContainer {
    let centers: Vec<f64> = (0..12).map(f64::from).collect();
    MemoryContainer::new()
        .attr("/", "Projection", "EPSG:32614")
        .dataset(
            "/Geometry/2D Flow Areas/Perimeter 1/Cells Center Coordinate",
            &[6, 2],
            centers,
        )
        .attr("/Geometry/2D Flow Areas/Perimeter 1", "Cell Count", 6i64)
        .strings("/Geometry/2D Flow Areas/Names", ["Perimeter 1"])
}

#[test]
fn list_and_describe() {
    let handle = CatalogHandle::from_source(model(), &CancelToken::new()).unwrap();

    let root = handle.list("/").unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(root[0].name(), "Geometry");

    let node = handle
        .describe("Geometry/2D Flow Areas/Perimeter 1/Cells Center Coordinate")
        .unwrap();
    assert_eq!(node.kind, NodeKind::Dataset);
    assert_eq!(node.shape, vec![6, 2]);
    assert_eq!(node.dtype, Some(DType::Float64));

    let area = handle.describe("/Geometry/2D Flow Areas/Perimeter 1").unwrap();
    assert_eq!(area.attr("Cell Count").and_then(AttrValue::as_f64), Some(6.0));
    assert_eq!(
        handle.attr_text("/", &["Projection"]).as_deref(),
        Some("EPSG:32614")
    );
}

#[test]
fn missing_and_wrong_kind() {
    let handle = CatalogHandle::from_source(model(), &CancelToken::new()).unwrap();
    assert_eq!(
        handle.describe("/Nope").unwrap_err().kind(),
        ErrorKind::DatasetMissing
    );
    assert_eq!(
        handle.read_array("/Geometry", None).unwrap_err().kind(),
        ErrorKind::DatasetMissing
    );
    assert_eq!(
        handle
            .read_array("/Geometry/2D Flow Areas/Names", None)
            .unwrap_err()
            .kind(),
        ErrorKind::DatasetMissing
    );
}

#[test]
fn slice_reads_are_bounded() {
    let handle = CatalogHandle::from_source(model(), &CancelToken::new()).unwrap();
    let path = "/Geometry/2D Flow Areas/Perimeter 1/Cells Center Coordinate";

    let rows = handle.read_array(path, Some(&Selection::Rows(2..4))).unwrap();
    assert_eq!(rows.shape, vec![2, 2]);
    assert_eq!(rows.row_offset, 2);
    assert_eq!(rows.data, vec![4.0, 5.0, 6.0, 7.0]);

    let ys = handle.read_array(path, Some(&Selection::column(0..6, 1))).unwrap();
    assert_eq!(ys.data, vec![1.0, 3.0, 5.0, 7.0, 9.0, 11.0]);

    let err = handle
        .read_array(path, Some(&Selection::Rows(4..9)))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ComputationError);
}

#[test]
fn link_cycle_is_corruption_not_a_hang() {
    let src = MemoryContainer::new()
        .group("/Results/Unsteady")
        .link("/Results/Unsteady/Back", "/Results");
    let err = CatalogHandle::from_source(src, &CancelToken::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptedStructure);
}

#[test]
fn sibling_links_are_not_cycles() {
    // Two links to the same non-ancestor group are legal.
    let src = MemoryContainer::new()
        .dataset("/Shared/x", &[1], vec![1.0])
        .link("/A/s", "/Shared")
        .link("/B/s", "/Shared");
    let handle = CatalogHandle::from_source(src, &CancelToken::new()).unwrap();
    assert!(handle.exists("/A/s/x"));
    assert!(handle.exists("/B/s/x"));
}

#[test]
fn chunked_read_stops_on_cancel() {
    let data: Vec<f64> = (0..100).map(f64::from).collect();
    let src = MemoryContainer::new().dataset("/big", &[100], data);
    let handle = CatalogHandle::from_source(src, &CancelToken::new()).unwrap();

    let cancel = CancelToken::new();
    let mut reader = handle.chunks("/big", 10, &cancel).unwrap();
    assert!(reader.next().unwrap().is_ok());
    cancel.cancel();
    let err = reader.next().unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert!(reader.next().is_none());
}

#[test]
fn handle_cache_reopens_changed_files() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plan.p01.hdf");
    std::fs::write(&file, b"v1").unwrap();

    let opens = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opens);
    let cache = HandleCache::with_opener(move |_, cancel| {
        counter.fetch_add(1, Ordering::SeqCst);
        CatalogHandle::from_source(MemoryContainer::new().group("/g"), cancel)
    });

    let cancel = CancelToken::new();
    cache.get_or_open(&file, &cancel).unwrap();
    cache.get_or_open(&file, &cancel).unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 1);

    std::fs::write(&file, b"version two").unwrap();
    cache.get_or_open(&file, &cancel).unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 1);

    cache.invalidate(&file);
    assert!(cache.is_empty());

    cache.open_uncached(&file, &cancel).unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 3);
    assert!(cache.is_empty());
}

#[test]
fn handle_cache_reports_missing_files() {
    let cache = HandleCache::new();
    let err = cache
        .get_or_open(std::path::Path::new("/no/such/model.hdf"), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[test]
fn handle_cache_evicts_least_recently_used() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<_> = ["a.hdf", "b.hdf", "c.hdf"]
        .iter()
        .map(|name| {
            let file = dir.path().join(name);
            std::fs::write(&file, name.as_bytes()).unwrap();
            file
        })
        .collect();

    let opens = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&opens);
    let cache = HandleCache::with_opener(move |_, cancel| {
        counter.fetch_add(1, Ordering::SeqCst);
        CatalogHandle::from_source(MemoryContainer::new().group("/g"), cancel)
    })
    .with_capacity(2);
    assert_eq!(cache.capacity(), 2);

    let cancel = CancelToken::new();
    cache.get_or_open(&files[0], &cancel).unwrap();
    cache.get_or_open(&files[1], &cancel).unwrap();
    // Touch `a` so `b` becomes the oldest.
    cache.get_or_open(&files[0], &cancel).unwrap();
    cache.get_or_open(&files[2], &cancel).unwrap();
    assert_eq!(cache.len(), 2);
    assert_eq!(opens.load(Ordering::SeqCst), 3);

    cache.get_or_open(&files[0], &cancel).unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 3);
    cache.get_or_open(&files[1], &cancel).unwrap();
    assert_eq!(opens.load(Ordering::SeqCst), 4);
    assert_eq!(cache.len(), 2);
}
