use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::map::native::{NativeEvent, NativeEvents};
use crate::point::MapPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub point: MapPoint,
    pub provider: String,
}

impl LocationFix {
    pub fn new(point: MapPoint, provider: impl Into<String>) -> Self {
        Self {
            point,
            provider: provider.into(),
        }
    }
}

/// Where a location client delivers fixes. Each sink belongs to one
/// enable/disable session of one map; fixes from an ended session are
/// discarded by the map.
#[derive(Debug, Clone)]
pub struct FixSink {
    events: NativeEvents,
    session: u64,
}

impl FixSink {
    pub(crate) fn new(events: NativeEvents, session: u64) -> Self {
        Self { events, session }
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn deliver(&self, fix: LocationFix) {
        self.events.post(NativeEvent::LocationFix {
            session: self.session,
            fix,
        });
    }
}

/// A source of location fixes, started and stopped by the map.
pub trait LocationClient {
    fn start(&mut self, sink: FixSink) -> Result<()>;
    fn stop(&mut self);
}

#[derive(Debug, Default)]
pub struct NoLocation;

impl LocationClient for NoLocation {
    fn start(&mut self, _sink: FixSink) -> Result<()> {
        anyhow::bail!("no location source configured")
    }

    fn stop(&mut self) {}
}

/// Replays a fixed list of fixes from a background thread.
#[derive(Debug)]
pub struct ReplayLocationClient {
    fixes: Vec<LocationFix>,
    interval: Duration,
    worker: Option<(Arc<AtomicBool>, JoinHandle<()>)>,
}

impl ReplayLocationClient {
    pub fn new(fixes: Vec<LocationFix>, interval: Duration) -> Self {
        Self {
            fixes,
            interval,
            worker: None,
        }
    }
}

impl LocationClient for ReplayLocationClient {
    fn start(&mut self, sink: FixSink) -> Result<()> {
        self.stop();
        let cancelled = Arc::new(AtomicBool::new(false));
        let fixes = self.fixes.clone();
        let interval = self.interval;
        let worker = {
            let cancelled = Arc::clone(&cancelled);
            thread::Builder::new()
                .name("location-replay".to_string())
                .spawn(move || {
                    for fix in fixes {
                        if cancelled.load(Ordering::SeqCst) {
                            break;
                        }
                        sink.deliver(fix);
                        thread::sleep(interval);
                    }
                    debug!(session = sink.session(), "location replay finished");
                })
                .context("failed to spawn location replay thread")?
        };
        self.worker = Some((cancelled, worker));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some((cancelled, worker)) = self.worker.take() {
            cancelled.store(true, Ordering::SeqCst);
            if worker.join().is_err() {
                warn!("location replay thread panicked");
            }
        }
    }
}

impl Drop for ReplayLocationClient {
    fn drop(&mut self) {
        self.stop();
    }
}
