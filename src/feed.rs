//! Live replacement of the active reachability dataset.
//!
//! The feed holds the current dataset as an `Arc` behind a lock. Readers take
//! a snapshot (an `Arc` clone) and keep using it for the whole query, while an
//! update swaps in a new `Arc`; a snapshot is never mutated.

use crate::base_map::{BaseMap, BasePoseKey};
use crate::error::{Error, Result};
use crate::geometry::Frame;
use crate::reachability::{ReachabilityDetail, ReachabilityMap};
use glam::Vec3;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often an idle listener re-checks its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared handle to the active reachability dataset.
#[derive(Clone, Debug, Default)]
pub struct ReachabilityFeed {
    current: Arc<RwLock<Option<Arc<ReachabilityMap>>>>,
}

impl ReachabilityFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// A feed starting from `map`.
    pub fn with_map(map: ReachabilityMap) -> Result<Self> {
        let feed = Self::new();
        feed.replace(map)?;
        Ok(feed)
    }

    /// Current dataset, if one has been loaded.
    pub fn snapshot(&self) -> Option<Arc<ReachabilityMap>> {
        self.current.read().clone()
    }

    pub fn require_snapshot(&self) -> Result<Arc<ReachabilityMap>> {
        self.snapshot().ok_or(Error::NoDataset)
    }

    /// Atomically replaces the dataset. Invalid datasets are rejected and the
    /// previous one stays active.
    pub fn replace(&self, map: ReachabilityMap) -> Result<()> {
        map.validate()?;
        let spheres = map.spheres.len();
        *self.current.write() = Some(Arc::new(map));
        info!(spheres, "reachability dataset replaced");
        Ok(())
    }

    /// Decodes a raw workspace message and replaces the dataset with it.
    pub fn apply_message(&self, message: &str) -> Result<()> {
        self.replace(ReachabilityMap::from_message(message)?)
    }

    /// Scores `pose` against a snapshot of the current dataset.
    pub fn score_base_pose(
        &self,
        base_map: &mut BaseMap,
        pose: &Frame,
        goals: &[Vec3],
        collisions: Option<&[Vec3]>,
    ) -> Result<(BasePoseKey, ReachabilityDetail)> {
        let snapshot = self.require_snapshot()?;
        base_map.score_base_pose(pose, &snapshot, goals, collisions)
    }

    /// Spawns a listener applying every message received on `messages`.
    ///
    /// The listener ends when [`FeedListener::stop`] is called or the sending
    /// side disconnects. Messages that fail to decode or validate are dropped.
    pub fn spawn_listener(&self, messages: Receiver<String>) -> FeedListener {
        let stop = Arc::new(AtomicBool::new(false));
        let feed = self.clone();
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut applied = 0;
            while !flag.load(Ordering::Acquire) {
                match messages.recv_timeout(POLL_INTERVAL) {
                    Ok(message) => match feed.apply_message(&message) {
                        Ok(()) => applied += 1,
                        Err(e) => warn!("discarding reachability message: {e}"),
                    },
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(applied, "reachability listener finished");
            applied
        });
        FeedListener { stop, handle }
    }
}

/// A running feed listener.
pub struct FeedListener {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<usize>,
}

impl FeedListener {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the listener to stop and waits for it. Returns the number of
    /// updates it applied.
    pub fn stop(self) -> usize {
        self.stop.store(true, Ordering::Release);
        self.join()
    }

    /// Waits for the listener to end on its own (sender disconnected).
    pub fn join(self) -> usize {
        match self.handle.join() {
            Ok(applied) => applied,
            Err(_) => {
                warn!("reachability listener panicked");
                0
            }
        }
    }
}
