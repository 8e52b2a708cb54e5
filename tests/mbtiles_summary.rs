mod common;

use fieldmap::mbtiles::{decode_tile_payload, summarize_tile, MbtilesFile, TileCoord};

use common::{create_raster_mbtiles, create_vector_mbtiles, create_vector_tile, gzip};

#[test]
fn summary_reports_layer_counts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    let summary = summarize_tile(&file, TileCoord::new(3, 4, 5), None)
        .expect("summary")
        .expect("tile present");
    assert_eq!(summary.total_features, 3);
    assert_eq!(summary.layers.len(), 2);
    let roads = summary
        .layers
        .iter()
        .find(|layer| layer.name == "roads")
        .expect("roads layer");
    assert_eq!(roads.feature_count, 2);
    assert_eq!(roads.property_key_count, 2);
}

#[test]
fn summary_filters_layer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    let summary = summarize_tile(&file, TileCoord::new(3, 4, 5), Some("buildings"))
        .expect("summary")
        .expect("tile present");
    assert_eq!(summary.total_features, 1);
    assert_eq!(summary.layers.len(), 1);
    assert_eq!(summary.layers[0].name, "buildings");
    assert_eq!(summary.layers[0].property_key_count, 1);
}

#[test]
fn summary_of_missing_tile_is_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    let summary = summarize_tile(&file, TileCoord::new(3, 0, 0), None).expect("summary");
    assert!(summary.is_none());
}

#[test]
fn summary_rejects_raster_packages() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    assert!(summarize_tile(&file, TileCoord::new(3, 2, 5), None).is_err());
}

#[test]
fn decode_passes_plain_payloads_through() {
    let raw = create_vector_tile();
    assert_eq!(decode_tile_payload(&raw).expect("plain"), raw);
    assert_eq!(decode_tile_payload(&gzip(&raw)).expect("gzip"), raw);
}
