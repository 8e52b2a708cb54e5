#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;

use flate2::{write::GzEncoder, Compression};
use mvt::{GeomEncoder, GeomType, Tile};

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-png";

/// Writes an MBTiles file. Tile rows are given in TMS order, as stored.
pub fn create_mbtiles(path: &Path, metadata: &[(&str, &str)], tiles: &[(u8, u32, u32, Vec<u8>)]) {
    let conn = rusqlite::Connection::open(path).expect("open");
    conn.execute_batch(
        "
        CREATE TABLE metadata (name TEXT, value TEXT);
        CREATE TABLE tiles (
            zoom_level INTEGER,
            tile_column INTEGER,
            tile_row INTEGER,
            tile_data BLOB
        );
        ",
    )
    .expect("schema");
    for (name, value) in metadata {
        conn.execute(
            "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
            (name, value),
        )
        .expect("metadata insert");
    }
    for (zoom, column, row, data) in tiles {
        conn.execute(
            "INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
            (zoom, column, row, data),
        )
        .expect("tile insert");
    }
}

pub fn create_raster_mbtiles(path: &Path) {
    create_mbtiles(
        path,
        &[("name", "satellite"), ("format", "png")],
        &[(3, 2, 2, PNG_BYTES.to_vec())],
    );
}

pub fn create_vector_mbtiles(path: &Path) {
    create_mbtiles(
        path,
        &[
            ("name", "streets"),
            ("format", "pbf"),
            (
                "json",
                r#"{"vector_layers":[{"id":"roads","description":"Road lines"},{"id":"buildings"}]}"#,
            ),
        ],
        &[(3, 4, 2, gzip(&create_vector_tile()))],
    );
}

pub fn create_vector_tile() -> Vec<u8> {
    let mut tile = Tile::new(4096);

    let layer = tile.create_layer("roads");
    let geom = GeomEncoder::new(GeomType::Point)
        .point(1.0, 2.0)
        .expect("point")
        .encode()
        .expect("encode");
    let mut feature = layer.into_feature(geom);
    feature.add_tag_string("class", "primary");
    feature.add_tag_string("name", "Main");
    let layer = feature.into_layer();
    let geom = GeomEncoder::new(GeomType::Point)
        .point(3.0, 4.0)
        .expect("point")
        .encode()
        .expect("encode");
    let mut feature = layer.into_feature(geom);
    feature.add_tag_string("name", "Side");
    let layer = feature.into_layer();
    tile.add_layer(layer).expect("add roads layer");

    let layer = tile.create_layer("buildings");
    let geom = GeomEncoder::new(GeomType::Point)
        .point(5.0, 6.0)
        .expect("point")
        .encode()
        .expect("encode");
    let mut feature = layer.into_feature(geom);
    feature.add_tag_string("height", "10");
    let layer = feature.into_layer();
    tile.add_layer(layer).expect("add buildings layer");

    tile.to_bytes().expect("tile bytes")
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

pub struct HttpReply {
    pub head: String,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<String> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then(|| value.trim().to_string())
        })
    }
}

pub fn http_get(addr: SocketAddr, path: &str) -> HttpReply {
    let mut stream = TcpStream::connect(addr).expect("connect");
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nUser-Agent: fieldmap-test\r\n\r\n"
    )
    .expect("send request");
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).expect("read reply");
    let split = raw
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .expect("reply head");
    HttpReply {
        head: String::from_utf8_lossy(&raw[..split]).into_owned(),
        body: raw[split + 4..].to_vec(),
    }
}
