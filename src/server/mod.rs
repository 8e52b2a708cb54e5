//! Local HTTP/1.0 server that hands MBTiles tiles to map engines which can
//! only load tiles from a URL template.
//!
//! Requests look like `GET /{source}/{z}/{x}/{y}`. Every reply is a `200`;
//! unknown sources, missing tiles and malformed requests get an empty body.

pub mod connection;

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::mbtiles::TileCoord;

pub use self::connection::{parse_request_line, write_response, TileRequest};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub data: Vec<u8>,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

/// Anything that can answer tile lookups by XYZ address.
pub trait TileSource: Send + Sync {
    fn tile(&self, coord: TileCoord) -> Option<Tile>;
}

pub(crate) type SourceMap = Arc<RwLock<HashMap<String, Arc<dyn TileSource>>>>;

#[derive(Debug, Default)]
pub(crate) struct ServerStats {
    requests: AtomicU64,
    tiles_served: AtomicU64,
    bytes_served: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    pub requests: u64,
    pub tiles_served: u64,
    pub bytes_served: u64,
}

struct Running {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    accept_task: JoinHandle<()>,
}

pub struct TileHttpServer {
    port: u16,
    request_timeout: Duration,
    sources: SourceMap,
    stats: Arc<ServerStats>,
    running: Mutex<Option<Running>>,
}

impl TileHttpServer {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sources: Arc::new(RwLock::new(HashMap::new())),
            stats: Arc::new(ServerStats::default()),
            running: Mutex::new(None),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn add_source(&self, name: impl Into<String>, source: Arc<dyn TileSource>) {
        let name = name.into();
        debug!(source = %name, "registered tile source");
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, source);
    }

    pub fn remove_source(&self, name: &str) -> bool {
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn source_names(&self) -> Vec<String> {
        let mut names = self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Binds the listener and starts accepting. Starting a running server
    /// returns the address it already listens on.
    pub fn start(&self) -> Result<SocketAddr> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(current) = running.as_ref() {
            return Ok(current.addr);
        }

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, self.port))
            .with_context(|| format!("failed to bind tile server on port {}", self.port))?;
        listener
            .set_nonblocking(true)
            .context("failed to configure tile server listener")?;
        let addr = listener.local_addr().context("tile server has no local address")?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let accept_task = {
            let shutdown = Arc::clone(&shutdown);
            let sources = Arc::clone(&self.sources);
            let stats = Arc::clone(&self.stats);
            let timeout = self.request_timeout;
            thread::Builder::new()
                .name("tile-server".to_string())
                .spawn(move || accept_loop(listener, &shutdown, &sources, &stats, timeout))
                .context("failed to spawn tile server thread")?
        };

        info!(port = addr.port(), "Ready for requests on port {}", addr.port());
        *running = Some(Running {
            addr,
            shutdown,
            accept_task,
        });
        Ok(addr)
    }

    /// Stops accepting and releases the port. Connections already being
    /// answered finish on their own threads.
    pub fn stop(&self) {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return;
        };
        running.shutdown.store(true, Ordering::SeqCst);
        if running.accept_task.join().is_err() {
            warn!("tile server accept thread panicked");
        }
        info!(port = running.addr.port(), "tile server stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|running| running.addr)
    }

    pub fn url_template(&self, source: &str) -> String {
        let port = self.local_addr().map_or(self.port, |addr| addr.port());
        format!("http://127.0.0.1:{port}/{source}/{{z}}/{{x}}/{{y}}")
    }

    pub fn stats(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            requests: self.stats.requests.load(Ordering::Relaxed),
            tiles_served: self.stats.tiles_served.load(Ordering::Relaxed),
            bytes_served: self.stats.bytes_served.load(Ordering::Relaxed),
        }
    }
}

impl Drop for TileHttpServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(
    listener: TcpListener,
    shutdown: &AtomicBool,
    sources: &SourceMap,
    stats: &Arc<ServerStats>,
    timeout: Duration,
) {
    while !shutdown.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                debug!(%peer, "accepted tile connection");
                spawn_handler(stream, peer, Arc::clone(sources), Arc::clone(stats), timeout);
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
            Err(err) => {
                warn!(error = %err, "tile server accept failed");
                thread::sleep(ACCEPT_POLL_INTERVAL);
            }
        }
    }
}

fn spawn_handler(
    stream: TcpStream,
    peer: SocketAddr,
    sources: SourceMap,
    stats: Arc<ServerStats>,
    timeout: Duration,
) {
    let spawned = thread::Builder::new()
        .name("tile-request".to_string())
        .spawn(move || {
            if let Err(err) = connection::handle(stream, &sources, &stats, timeout) {
                warn!(%peer, error = %err, "tile request failed");
            }
        });
    if let Err(err) = spawned {
        warn!(%peer, error = %err, "failed to spawn tile request thread");
    }
}
