//! Latest output of one pipeline, shared between its worker and readers.
//!
//! The whole state is one immutable [`Snapshot`] behind a single lock.
//! Writers build a new snapshot and swap the reference; readers clone the
//! reference and release the lock before doing any work with it. A reader
//! therefore sees either the previous frame/metrics pair or the next one,
//! never a mix.
//!
//! Every [`reset`](SharedState::reset) opens a new [`Generation`]. A worker
//! publishes with the generation it was spawned for; once superseded its
//! publishes are rejected, so a worker that outlives its stop timeout cannot
//! overwrite the fresh baseline or interleave with its successor.

use std::sync::{Arc, Mutex, MutexGuard};

use vmon_media::Frame;

/// Reset epoch of a [`SharedState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Immutable frame/metrics pair.
#[derive(Debug)]
pub struct Snapshot<M> {
    /// Latest annotated frame; `None` until the first publish after a reset.
    pub frame: Option<Arc<Frame>>,
    pub metrics: M,
    pub generation: Generation,
}

impl<M: Default> Snapshot<M> {
    fn baseline(generation: Generation) -> Self {
        Self {
            frame: None,
            metrics: M::default(),
            generation,
        }
    }
}

/// Lock-guarded slot holding the current [`Snapshot`].
#[derive(Debug)]
pub struct SharedState<M> {
    slot: Mutex<Arc<Snapshot<M>>>,
}

impl<M: Clone + Default> SharedState<M> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Arc::new(Snapshot::baseline(Generation::default()))),
        }
    }

    // The slot is only ever replaced wholesale, so a poisoned lock still
    // guards a consistent value.
    fn lock(&self) -> MutexGuard<'_, Arc<Snapshot<M>>> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the state with the baseline (no frame, default metrics) and
    /// open a new generation.
    pub fn reset(&self) -> Generation {
        let mut slot = self.lock();
        let next = Generation(slot.generation.0 + 1);
        *slot = Arc::new(Snapshot::baseline(next));
        next
    }

    /// Publish a frame and its metrics as one update.
    ///
    /// Returns `false` without touching the state when `generation` is no
    /// longer current.
    pub fn publish(&self, generation: Generation, frame: Frame, metrics: M) -> bool {
        let next = Arc::new(Snapshot {
            frame: Some(Arc::new(frame)),
            metrics,
            generation,
        });
        let mut slot = self.lock();
        if slot.generation != generation {
            return false;
        }
        *slot = next;
        true
    }

    /// Current frame/metrics pair.
    pub fn snapshot(&self) -> Arc<Snapshot<M>> {
        Arc::clone(&self.lock())
    }

    /// Copy of the current metrics.
    pub fn metrics(&self) -> M {
        self.snapshot().metrics.clone()
    }

    pub fn generation(&self) -> Generation {
        self.lock().generation
    }
}

impl<M: Clone + Default> Default for SharedState<M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle on the metrics half of a [`SharedState`].
pub struct MetricsReader<M> {
    shared: Arc<SharedState<M>>,
}

impl<M> Clone for MetricsReader<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: Clone + Default> MetricsReader<M> {
    pub fn new(shared: Arc<SharedState<M>>) -> Self {
        Self { shared }
    }

    /// Copy of the current metrics. No side effects.
    pub fn read(&self) -> M {
        self.shared.metrics()
    }
}
