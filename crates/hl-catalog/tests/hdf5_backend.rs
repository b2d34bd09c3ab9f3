#![cfg(feature = "hdf5")]

use hdf5::types::VarLenUnicode;
use hl_catalog::{ContainerSource, Selection, hdf5_source::Hdf5Source, open};
use hl_core::ErrorKind;

fn write_model(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("model.hdf");
    let file = hdf5::File::create(&path).unwrap();
    let results = file.create_group("Results").unwrap();

    let cube: Vec<f64> = (0..24).map(f64::from).collect();
    results
        .new_dataset::<f64>()
        .shape([4, 2, 3])
        .create("Cube")
        .unwrap()
        .write_raw(&cube)
        .unwrap();

    let names: Vec<VarLenUnicode> = ["Upstream", "Downstream", "Lateral"]
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    file.new_dataset::<VarLenUnicode>()
        .shape([3])
        .create("Names")
        .unwrap()
        .write_raw(&names)
        .unwrap();
    path
}

#[test]
fn hard_link_to_ancestor_is_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&dir);
    {
        let file = hdf5::File::open_rw(&path).unwrap();
        file.group("Results").unwrap().link_hard("/Results", "Again").unwrap();
    }
    let err = open(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptedStructure);
}

#[test]
fn links_to_one_object_share_identity() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_model(&dir);
    {
        let file = hdf5::File::open_rw(&path).unwrap();
        file.link_hard("/Results", "Alias").unwrap();
    }
    let source = Hdf5Source::open(&path).unwrap();
    let top = source.children("/").unwrap();
    let id = |name: &str| top.iter().find(|e| e.name == name).unwrap().object_id;
    assert!(id("Results").is_some());
    assert_eq!(id("Results"), id("Alias"));
    assert_ne!(id("Results"), id("Names"));
}

#[test]
fn rank_three_rows_are_sliced() {
    let dir = tempfile::tempdir().unwrap();
    let source = Hdf5Source::open(&write_model(&dir)).unwrap();
    let chunk = source.read_f64("/Results/Cube", &Selection::Rows(1..3)).unwrap();
    assert_eq!(chunk.shape, vec![2, 2, 3]);
    let expected: Vec<f64> = (6..18).map(f64::from).collect();
    assert_eq!(chunk.data, expected);
}

#[test]
fn string_rows_are_sliced() {
    let dir = tempfile::tempdir().unwrap();
    let source = Hdf5Source::open(&write_model(&dir)).unwrap();
    let names = source.read_strings("/Names", &Selection::Rows(1..3)).unwrap();
    assert_eq!(names, vec!["Downstream", "Lateral"]);
    assert_eq!(source.read_strings("/Names", &Selection::All).unwrap().len(), 3);
}
