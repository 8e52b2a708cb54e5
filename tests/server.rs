mod common;

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use fieldmap::mbtiles::{MbtilesFile, TileCoord};
use fieldmap::server::{parse_request_line, write_response, Tile, TileHttpServer, TileSource};

use common::{create_raster_mbtiles, create_vector_mbtiles, gzip, http_get, PNG_BYTES};

struct FixedSource(Tile);

impl TileSource for FixedSource {
    fn tile(&self, coord: TileCoord) -> Option<Tile> {
        (coord == TileCoord::new(1, 1, 1)).then(|| self.0.clone())
    }
}

fn raster_server(dir: &std::path::Path) -> TileHttpServer {
    let path = dir.join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let server = TileHttpServer::new(0).with_request_timeout(Duration::from_secs(2));
    server.add_source("satellite", Arc::new(MbtilesFile::open(&path).expect("open")));
    server
}

#[test]
fn serves_present_tile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = raster_server(dir.path());
    let addr = server.start().expect("start");

    let reply = http_get(addr, "/satellite/3/2/5");
    assert!(reply.head.starts_with("HTTP/1.0 200"));
    assert_eq!(reply.header("Content-Type").as_deref(), Some("image/png"));
    assert_eq!(
        reply.header("Content-Length").as_deref(),
        Some(PNG_BYTES.len().to_string().as_str())
    );
    assert_eq!(reply.header("Content-Encoding"), None);
    assert_eq!(reply.body, PNG_BYTES);

    server.stop();
}

#[test]
fn unknown_source_and_miss_are_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let server = raster_server(dir.path());
    let addr = server.start().expect("start");

    for path in ["/nope/3/2/5", "/satellite/3/2/4", "/satellite/3/2", "/satellite/a/b/c"] {
        let reply = http_get(addr, path);
        assert!(reply.head.starts_with("HTTP/1.0 200"), "{path}");
        assert_eq!(reply.header("Content-Length").as_deref(), Some("0"), "{path}");
        assert!(reply.body.is_empty(), "{path}");
    }

    let stats = server.stats();
    assert_eq!(stats.requests, 4);
    assert_eq!(stats.tiles_served, 0);
    server.stop();
}

#[test]
fn gzip_payloads_carry_encoding() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("streets.mbtiles");
    create_vector_mbtiles(&path);
    let server = TileHttpServer::new(0);
    let file = Arc::new(MbtilesFile::open(&path).expect("open"));
    server.add_source("streets", file.clone());
    let addr = server.start().expect("start");

    let reply = http_get(addr, "/streets/3/4/5");
    assert_eq!(
        reply.header("Content-Type").as_deref(),
        Some("application/protobuf")
    );
    assert_eq!(reply.header("Content-Encoding").as_deref(), Some("gzip"));
    let stored = file.get_tile(TileCoord::new(3, 4, 5)).expect("query").expect("tile");
    assert_eq!(reply.body, stored.data);

    server.stop();
}

#[test]
fn uncompressed_vector_payload_has_no_encoding() {
    let plain = Tile {
        data: b"plain protobuf".to_vec(),
        content_type: "application/protobuf",
        content_encoding: Some("gzip"),
    };
    let mut out = Vec::new();
    write_response(&mut out, Some(&plain)).expect("write");
    let text = String::from_utf8(out).expect("utf8");
    assert!(!text.contains("Content-Encoding"));
    assert!(text.ends_with("\r\n\r\nplain protobuf"));

    let compressed = Tile {
        data: gzip(b"payload"),
        ..plain
    };
    let mut out = Vec::new();
    write_response(&mut out, Some(&compressed)).expect("write");
    let head = String::from_utf8_lossy(&out).into_owned();
    assert!(head.contains("Content-Encoding: gzip\r\n"));
}

#[test]
fn sources_can_be_added_while_running() {
    let server = TileHttpServer::new(0);
    let addr = server.start().expect("start");
    assert!(http_get(addr, "/late/1/1/1").body.is_empty());

    server.add_source(
        "late",
        Arc::new(FixedSource(Tile {
            data: b"late tile".to_vec(),
            content_type: "image/png",
            content_encoding: None,
        })),
    );
    assert_eq!(http_get(addr, "/late/1/1/1").body, b"late tile");
    assert!(server.remove_source("late"));
    assert!(http_get(addr, "/late/1/1/1").body.is_empty());

    server.stop();
}

#[test]
fn start_twice_keeps_address() {
    let server = TileHttpServer::new(0);
    let first = server.start().expect("start");
    let second = server.start().expect("start again");
    assert_eq!(first, second);
    assert!(server.is_running());
    assert_eq!(
        server.url_template("roads"),
        format!("http://127.0.0.1:{}/roads/{{z}}/{{x}}/{{y}}", first.port())
    );
    server.stop();
    assert!(!server.is_running());
    assert_eq!(server.local_addr(), None);
}

#[test]
fn stop_releases_port() {
    let server = TileHttpServer::new(0);
    let addr = server.start().expect("start");
    server.stop();

    let rebound = TcpListener::bind(addr).expect("port is free after stop");
    drop(rebound);

    let again = TileHttpServer::new(addr.port());
    assert_eq!(again.start().expect("restart").port(), addr.port());
    again.stop();
}

#[test]
fn request_line_parsing() {
    let request = parse_request_line("GET /roads/12/654/1583 HTTP/1.1\r\n").expect("request");
    assert_eq!(request.source, "roads");
    assert_eq!(request.coord, TileCoord::new(12, 654, 1583));

    let request = parse_request_line("GET /roads/1/0/1?v=2 HTTP/1.0").expect("query string");
    assert_eq!(request.coord, TileCoord::new(1, 0, 1));

    assert!(parse_request_line("POST /roads/1/0/1 HTTP/1.1").is_none());
    assert!(parse_request_line("GET /roads/1/0 HTTP/1.1").is_none());
    assert!(parse_request_line("GET /roads/1/0/1/2 HTTP/1.1").is_none());
    assert!(parse_request_line("GET //1/0/1 HTTP/1.1").is_none());
    assert!(parse_request_line("GET /roads/-1/0/1 HTTP/1.1").is_none());
    assert!(parse_request_line("").is_none());
}

#[test]
fn replies_when_headers_never_end() {
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::time::Instant;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("satellite.mbtiles");
    create_raster_mbtiles(&path);
    let server = TileHttpServer::new(0).with_request_timeout(Duration::from_millis(300));
    server.add_source("satellite", Arc::new(MbtilesFile::open(&path).expect("open")));
    let addr = server.start().expect("start");

    let started = Instant::now();
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    stream
        .write_all(b"GET /satellite/3/2/5 HTTP/1.0\r\n")
        .expect("write request line");
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).expect("read reply");

    assert!(reply.starts_with(b"HTTP/1.0 200"));
    assert!(reply.ends_with(PNG_BYTES));
    assert!(started.elapsed() < Duration::from_secs(5));
    server.stop();
}
