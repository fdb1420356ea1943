use crate::types::{MosaicError, MosaicResult, Raster};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

struct Generation {
    id: u64,
    slots: Vec<Mutex<Option<Arc<Raster>>>>,
}

impl Generation {
    fn new(id: u64, level_count: usize) -> Self {
        Self {
            id,
            slots: (0..level_count).map(|_| Mutex::new(None)).collect(),
        }
    }
}

/// Per-level image cache.
///
/// Each level slot is guarded by its own lock, so concurrent first requests
/// for one level run a single computation while other levels proceed.
/// `reset` swaps in a fresh generation: computations still running against
/// the old one complete, but their results are never visible again.
pub struct LevelCache {
    level_count: usize,
    current: RwLock<Arc<Generation>>,
    next_id: AtomicU64,
}

impl LevelCache {
    pub fn new(level_count: usize) -> Self {
        Self {
            level_count,
            current: RwLock::new(Arc::new(Generation::new(0, level_count))),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn level_count(&self) -> usize {
        self.level_count
    }

    fn generation(&self) -> Arc<Generation> {
        let current = self.current.read().unwrap_or_else(|p| p.into_inner());
        Arc::clone(&current)
    }

    /// Identifier of the current generation, bumped by every reset
    pub fn generation_id(&self) -> u64 {
        self.generation().id
    }

    /// Cached image of `level` or the result of `compute`, stored on success
    pub fn get_or_compute<F>(&self, level: usize, compute: F) -> MosaicResult<Arc<Raster>>
    where
        F: FnOnce() -> MosaicResult<Raster>,
    {
        let generation = self.generation();
        let slot = generation.slots.get(level).ok_or(MosaicError::LevelOutOfRange {
            level,
            level_count: self.level_count,
        })?;

        let mut guard = slot.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(image) = guard.as_ref() {
            return Ok(Arc::clone(image));
        }

        let image = Arc::new(compute()?);
        *guard = Some(Arc::clone(&image));
        Ok(image)
    }

    pub fn get(&self, level: usize) -> Option<Arc<Raster>> {
        let generation = self.generation();
        let slot = generation.slots.get(level)?;
        let guard = slot.lock().unwrap_or_else(|p| p.into_inner());
        guard.as_ref().map(Arc::clone)
    }

    pub fn cached_count(&self) -> usize {
        let generation = self.generation();
        generation
            .slots
            .iter()
            .filter(|slot| slot.lock().unwrap_or_else(|p| p.into_inner()).is_some())
            .count()
    }

    /// Invalidate every cached level
    pub fn reset(&self) {
        self.reset_with(|| {});
    }

    /// Invalidate every cached level, running `release` while no request can
    /// reach either the old or the new generation.
    ///
    /// Requests arriving during the reset block until `release` has returned
    /// and then compute against the fresh generation.
    pub fn reset_with<F: FnOnce()>(&self, release: F) {
        let mut current = self.current.write().unwrap_or_else(|p| p.into_inner());
        release();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        *current = Arc::new(Generation::new(id, self.level_count));
    }
}
