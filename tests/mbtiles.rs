mod common;

use std::sync::Arc;
use std::thread;

use fieldmap::format::{LayerType, TileFormat};
use fieldmap::mbtiles::{
    parse_bounds, parse_center, parse_tile_spec, parse_vector_layers, MbtilesError, MbtilesFile,
    TileCoord,
};
use fieldmap::server::TileSource;

use common::{create_mbtiles, create_raster_mbtiles, create_vector_mbtiles, PNG_BYTES};

#[test]
fn open_png_package_is_raster() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);

    let file = MbtilesFile::open(&path).expect("open");
    assert_eq!(file.format(), TileFormat::Png);
    assert_eq!(file.layer_type(), LayerType::Raster);
    assert_eq!(file.content_type(), "image/png");
    assert_eq!(file.content_encoding(), None);
    assert!(file.vector_layers().is_empty());
    assert_eq!(file.info().name, "satellite");
}

#[test]
fn open_jpeg_aliases() {
    let dir = tempfile::tempdir().expect("tempdir");
    for tag in ["jpg", "jpeg", "JPG"] {
        let path = dir.path().join(format!("{tag}.mbtiles"));
        create_mbtiles(&path, &[("format", tag)], &[]);
        let file = MbtilesFile::open(&path).expect("open");
        assert_eq!(file.content_type(), "image/jpeg");
        assert_eq!(file.layer_type(), LayerType::Raster);
    }
}

#[test]
fn open_vector_package_reads_layers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);

    let file = MbtilesFile::open(&path).expect("open");
    assert_eq!(file.layer_type(), LayerType::Vector);
    assert_eq!(file.content_type(), "application/protobuf");
    assert_eq!(file.content_encoding(), Some("gzip"));
    let layers = file.vector_layers();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].id, "roads");
    assert_eq!(layers[0].description, "Road lines");
    assert_eq!(layers[1].id, "buildings");
    assert_eq!(layers[1].description, "");
}

#[test]
fn unknown_format_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("odd.mbtiles");
    create_mbtiles(&path, &[("format", "xyz")], &[]);

    match MbtilesFile::open(&path) {
        Err(MbtilesError::UnsupportedFormat(tag)) => assert_eq!(tag, "xyz"),
        other => panic!("expected unsupported format, got {other:?}"),
    }
}

#[test]
fn missing_format_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bare.mbtiles");
    create_mbtiles(&path, &[("name", "bare")], &[]);

    match MbtilesFile::open(&path) {
        Err(MbtilesError::UnsupportedFormat(tag)) => assert_eq!(tag, ""),
        other => panic!("expected unsupported format, got {other:?}"),
    }
}

#[test]
fn missing_file_is_not_created() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.mbtiles");

    let err = MbtilesFile::open(&path).expect_err("missing file");
    assert!(matches!(err, MbtilesError::Open { .. }));
    assert!(!path.exists());
}

#[test]
fn get_tile_flips_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    let tile = file
        .get_tile(TileCoord::new(3, 2, 5))
        .expect("query")
        .expect("tile at flipped row");
    assert_eq!(tile.data, PNG_BYTES);
    assert_eq!(tile.content_type, "image/png");

    assert!(file.get_tile(TileCoord::new(3, 2, 2)).expect("query").is_none());
}

#[test]
fn misses_and_out_of_range_are_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    assert!(file.get_tile(TileCoord::new(4, 0, 0)).expect("query").is_none());
    assert!(file.get_tile(TileCoord::new(3, 8, 0)).expect("query").is_none());
    assert!(file.get_tile(TileCoord::new(3, 0, 8)).expect("query").is_none());
    assert!(file.get_tile(TileCoord::new(40, 0, 0)).expect("query").is_none());
}

#[test]
fn tms_row_conversion() {
    assert_eq!(TileCoord::new(0, 0, 0).tms_row(), Some(0));
    assert_eq!(TileCoord::new(3, 2, 5).tms_row(), Some(2));
    assert_eq!(TileCoord::new(3, 2, 8).tms_row(), None);
    assert_eq!(TileCoord::new(31, 0, 0).tms_row(), Some((1u32 << 31) - 1));
    assert_eq!(TileCoord::new(32, 0, 0).tms_row(), None);
}

#[test]
fn concurrent_reads_return_same_bytes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let file = Arc::new(MbtilesFile::open(&path).expect("open"));

    let workers = (0..8)
        .map(|_| {
            let file = Arc::clone(&file);
            thread::spawn(move || {
                (0..25)
                    .map(|_| file.tile(TileCoord::new(3, 2, 5)).expect("tile").data)
                    .collect::<Vec<_>>()
            })
        })
        .collect::<Vec<_>>();
    for worker in workers {
        for data in worker.join().expect("join") {
            assert_eq!(data, PNG_BYTES);
        }
    }
}

#[test]
fn info_reads_optional_metadata() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("meta.mbtiles");
    create_mbtiles(
        &path,
        &[
            ("name", "meta"),
            ("format", "png"),
            ("minzoom", "2"),
            ("maxzoom", "not-a-number"),
            ("center", "12.5,-3.25,7"),
            ("bounds", "-10,-20,30,40"),
        ],
        &[],
    );
    let file = MbtilesFile::open(&path).expect("open");
    let info = file.info();
    assert_eq!(info.min_zoom, Some(2));
    assert_eq!(info.max_zoom, None);
    let center = info.center.expect("center");
    assert_eq!((center.lat, center.lon, center.zoom), (12.5, -3.25, 7.0));
    let bounds = info.bounds.expect("bounds");
    assert_eq!(
        (bounds.west, bounds.south, bounds.east, bounds.north),
        (-10.0, -20.0, 30.0, 40.0)
    );
    assert_eq!(file.metadata("minzoom").expect("query").as_deref(), Some("2"));
    assert_eq!(file.metadata("attribution").expect("query"), None);
}

#[test]
fn tilejson_lists_template_and_layers() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);
    let file = MbtilesFile::open(&path).expect("open");

    let doc = file.tilejson("http://127.0.0.1:8000/streets/{z}/{x}/{y}");
    assert_eq!(doc["tilejson"], "2.2.0");
    assert_eq!(doc["tiles"][0], "http://127.0.0.1:8000/streets/{z}/{x}/{y}");
    assert_eq!(doc["name"], "streets");
    assert_eq!(doc["vector_layers"][0]["id"], "roads");
    assert_eq!(doc["vector_layers"][1]["description"], "");
    assert!(doc.get("minzoom").is_none());
}

#[test]
fn metadata_parsers_are_lenient() {
    assert!(parse_vector_layers("{not json").is_empty());
    assert!(parse_vector_layers(r#"{"name":"no layers"}"#).is_empty());
    let layers = parse_vector_layers(r#"{"vector_layers":[{"description":"anonymous"}]}"#);
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].id, "");

    assert!(parse_center("1,2").is_none());
    assert!(parse_center("1,2,x").is_none());
    assert!(parse_bounds("1,2,3").is_none());
    assert!(parse_bounds(" 1, 2, 3, 4 ").is_some());
}

#[test]
fn parse_tile_spec_accepts_zxy() {
    assert_eq!(parse_tile_spec("3/2/5").expect("spec"), TileCoord::new(3, 2, 5));
    assert!(parse_tile_spec("3/2").is_err());
    assert!(parse_tile_spec("3/2/5/1").is_err());
    assert!(parse_tile_spec("a/2/5").is_err());
}
