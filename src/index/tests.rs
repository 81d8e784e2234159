use super::*;
use std::fs;
use tempfile::TempDir;

fn small_index() -> FlatIndex {
    let mut index = FlatIndex::new(2).expect("index should build");
    index.add(&[0.0, 0.0]).expect("add should succeed");
    index.add(&[1.0, 0.0]).expect("add should succeed");
    index.add(&[0.0, 2.0]).expect("add should succeed");
    index.add(&[3.0, 4.0]).expect("add should succeed");
    index
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(matches!(FlatIndex::new(0), Err(RagError::Index(_))));
}

#[test]
fn add_enforces_dimension() {
    let mut index = FlatIndex::new(3).expect("index should build");
    assert!(index.add(&[1.0, 2.0, 3.0]).is_ok());
    assert!(matches!(index.add(&[1.0]), Err(RagError::Index(_))));
    assert_eq!(index.len(), 1);
}

#[test]
fn vector_at_returns_rows_in_order() {
    let index = small_index();
    assert_eq!(index.vector_at(0), Some([0.0, 0.0].as_slice()));
    assert_eq!(index.vector_at(2), Some([0.0, 2.0].as_slice()));
    assert_eq!(index.vector_at(4), None);
}

#[test]
fn search_returns_ascending_l2_distances() {
    let index = small_index();
    let neighbors = index.search(&[0.0, 0.0], 4).expect("search should succeed");

    assert_eq!(neighbors.len(), 4);
    let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
    let distances: Vec<f32> = neighbors.iter().map(|n| n.distance).collect();
    assert_eq!(distances, vec![0.0, 1.0, 2.0, 5.0]);
}

#[test]
fn ties_break_by_position() {
    let mut index = FlatIndex::new(1).expect("index should build");
    index.add(&[1.0]).expect("add should succeed");
    index.add(&[-1.0]).expect("add should succeed");
    index.add(&[1.0]).expect("add should succeed");

    let neighbors = index.search(&[0.0], 3).expect("search should succeed");
    let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[test]
fn top_k_larger_than_index_returns_everything() {
    let index = small_index();
    let neighbors = index
        .search(&[0.0, 0.0], 100)
        .expect("search should succeed");
    assert_eq!(neighbors.len(), 4);
}

#[test]
fn query_dimension_mismatch_is_rejected() {
    let index = small_index();
    assert!(matches!(
        index.search(&[0.0, 0.0, 0.0], 1),
        Err(RagError::Index(_))
    ));
}

#[test]
fn save_and_open_round_trip() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("flat.index");

    let index = small_index();
    index.save(&path).expect("save should succeed");

    let opened = FlatIndex::open(&path).expect("open should succeed");
    assert_eq!(opened, index);
}

#[test]
fn open_missing_file_is_hard_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let result = FlatIndex::open(temp_dir.path().join("absent.index"));
    assert!(matches!(result, Err(RagError::Index(_))));
}

#[test]
fn open_rejects_bad_magic() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("flat.index");
    fs::write(&path, b"NOPE0000000000000000").expect("should write file");

    assert!(matches!(FlatIndex::open(&path), Err(RagError::Index(_))));
}

#[test]
fn open_rejects_truncated_body() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("flat.index");

    let index = small_index();
    index.save(&path).expect("save should succeed");
    let bytes = fs::read(&path).expect("should read file");
    fs::write(&path, &bytes[..bytes.len() - 4]).expect("should write truncated file");

    assert!(matches!(FlatIndex::open(&path), Err(RagError::Index(_))));
}

#[test]
fn metadata_round_trip_preserves_korean() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let path = temp_dir.path().join("metadata.json");

    let metadata = IndexMetadata {
        embedding_model: "text-embedding-3-small".to_string(),
        items: serde_json::from_str(r#"[{"title": "제주 돌담 장인", "alltag": "돌,담"}]"#)
            .expect("items should parse"),
    };
    metadata.save(&path).expect("save should succeed");

    let raw = fs::read_to_string(&path).expect("should read metadata file");
    assert!(raw.contains("제주 돌담 장인"), "Korean must not be escaped");

    let loaded = IndexMetadata::load(&path).expect("load should succeed");
    assert_eq!(loaded, metadata);
}

#[test]
fn metadata_missing_file_is_hard_error() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let result = IndexMetadata::load(temp_dir.path().join("absent.json"));
    assert!(matches!(result, Err(RagError::Index(_))));
}
