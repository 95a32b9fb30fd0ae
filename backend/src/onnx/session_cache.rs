use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const DEFAULT_SESSION_CAPACITY: usize = 4;

type Slot<T> = Arc<Mutex<Option<Arc<T>>>>;

/// Bounded least-recently-used cache of loaded models keyed by path.
///
/// Loading happens under a per-key lock, so concurrent first requests for the
/// same model wait for a single load instead of racing. A failed load leaves
/// nothing behind.
pub struct SessionCache<T> {
    slots: Mutex<LruCache<PathBuf, Slot<T>>>,
}

impl<T> SessionCache<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, LruCache<PathBuf, Slot<T>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the slot for `key`, creating it (and evicting the oldest key) if needed.
    fn slot(&self, key: &Path) -> Slot<T> {
        let mut slots = self.lock_slots();

        if let Some(slot) = slots.get(key) {
            return Arc::clone(slot);
        }

        let slot: Slot<T> = Arc::new(Mutex::new(None));
        if let Some((oldest, _)) = slots.push(key.to_path_buf(), Arc::clone(&slot)) {
            log::debug!("Evicting cached model session {}", oldest.display());
        }
        slot
    }

    fn forget(&self, key: &Path, slot: &Slot<T>) {
        let mut slots = self.lock_slots();
        if slots.peek(key).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.pop(key);
        }
    }

    pub fn get_or_load<E, F>(&self, key: &Path, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce(&Path) -> Result<T, E>,
    {
        let slot = self.slot(key);
        let mut loaded = slot.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = loaded.as_ref() {
            return Ok(Arc::clone(value));
        }

        match load(key) {
            Ok(value) => {
                let value = Arc::new(value);
                *loaded = Some(Arc::clone(&value));
                Ok(value)
            }
            Err(e) => {
                drop(loaded);
                self.forget(key, &slot);
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &Path) -> bool {
        self.lock_slots().contains(key)
    }
}

impl<T> Default for SessionCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY)
    }
}
