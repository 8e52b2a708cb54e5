use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::PoisonError;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::format::is_gzip;
use crate::mbtiles::TileCoord;
use crate::server::{ServerStats, SourceMap, Tile};

const MAX_HEADER_LINES: usize = 100;
const MAX_LINE_BYTES: u64 = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub source: String,
    pub coord: TileCoord,
}

/// Parses `GET /{source}/{z}/{x}/{y} HTTP/1.x`. Anything else is `None`.
pub fn parse_request_line(line: &str) -> Option<TileRequest> {
    let path = line.trim_end().strip_prefix("GET /")?;
    let path = path.split(' ').next()?;
    let path = path.split('?').next()?;
    let parts = path.split('/').collect::<Vec<_>>();
    let [source, zoom, x, y] = parts.as_slice() else {
        return None;
    };
    if source.is_empty() {
        return None;
    }
    Some(TileRequest {
        source: (*source).to_string(),
        coord: TileCoord {
            zoom: zoom.parse().ok()?,
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        },
    })
}

/// Writes a `200` reply. A gzip body is labelled as such; a missing tile
/// is an empty body.
pub fn write_response(out: &mut impl Write, tile: Option<&Tile>) -> io::Result<()> {
    let (content_type, body) = match tile {
        Some(tile) => (tile.content_type, tile.data.as_slice()),
        None => ("application/octet-stream", &[][..]),
    };
    let mut head = format!("HTTP/1.0 200 OK\r\nContent-Type: {content_type}\r\n");
    if is_gzip(body) {
        head.push_str("Content-Encoding: gzip\r\n");
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    out.write_all(head.as_bytes())?;
    out.write_all(body)?;
    out.flush()
}

pub(crate) fn handle(
    stream: TcpStream,
    sources: &SourceMap,
    stats: &ServerStats,
    timeout: Duration,
) -> io::Result<()> {
    let started = Instant::now();
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))?;
    stats.requests.fetch_add(1, Ordering::Relaxed);

    let mut reader = BufReader::new(stream.try_clone()?);
    let request_line = read_line(&mut reader)?;
    if let Err(err) = drain_headers(&mut reader) {
        debug!(error = %err, "Replying without complete headers");
    }

    let tile = match parse_request_line(&request_line) {
        Some(request) => lookup(sources, &request),
        None => {
            debug!(request = request_line.trim_end(), "Ignoring request");
            None
        }
    };

    let mut writer = stream;
    write_response(&mut writer, tile.as_ref())?;
    if let Some(tile) = &tile {
        stats.tiles_served.fetch_add(1, Ordering::Relaxed);
        stats
            .bytes_served
            .fetch_add(tile.data.len() as u64, Ordering::Relaxed);
        debug!(
            bytes = tile.data.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Served {} bytes in {} ms",
            tile.data.len(),
            started.elapsed().as_millis()
        );
    }
    Ok(())
}

fn lookup(sources: &SourceMap, request: &TileRequest) -> Option<Tile> {
    let source = sources
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&request.source)
        .cloned();
    match source {
        Some(source) => source.tile(request.coord),
        None => {
            debug!(source = %request.source, "no such tile source");
            None
        }
    }
}

fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut line = Vec::new();
    Read::take(&mut *reader, MAX_LINE_BYTES).read_until(b'\n', &mut line)?;
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Consumes request headers so the peer does not see its unread data
/// discarded when the socket closes. A peer that never ends its headers
/// still gets a reply once the read times out.
fn drain_headers(reader: &mut impl BufRead) -> io::Result<()> {
    for _ in 0..MAX_HEADER_LINES {
        let line = read_line(reader)?;
        if line.trim_end().is_empty() {
            break;
        }
    }
    Ok(())
}
