//! Per-thread reuse of [`EntityBlockRenderContext`].
//!
//! Each thread lazily builds its own context and keeps it until the pool is
//! reloaded. A reload bumps the pool generation; threads notice on their next
//! access and build a fresh context.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::renderer::context::EntityBlockRenderContext;

pub type SharedContext = Rc<RefCell<EntityBlockRenderContext>>;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);
static GLOBAL: ContextPool = ContextPool::with_id(u64::MAX);

struct PoolSlot {
    generation: u64,
    context: SharedContext,
}

thread_local! {
    static SLOTS: RefCell<FxHashMap<u64, PoolSlot>> = RefCell::new(FxHashMap::default());
}

#[derive(Debug)]
pub struct ContextPool {
    id: u64,
    generation: AtomicU64,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextPool {
    pub fn new() -> Self {
        Self::with_id(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    const fn with_id(id: u64) -> Self {
        Self {
            id,
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// This thread's context, built on first use or after a reload.
    pub fn get(&self) -> SharedContext {
        let generation = self.generation();
        SLOTS.with(|slots| {
            let mut slots = slots.borrow_mut();
            let slot = slots.entry(self.id).or_insert_with(|| PoolSlot {
                generation,
                context: Rc::new(RefCell::new(EntityBlockRenderContext::new())),
            });
            if slot.generation != generation {
                slot.generation = generation;
                slot.context = Rc::new(RefCell::new(EntityBlockRenderContext::new()));
            }
            Rc::clone(&slot.context)
        })
    }

    /// Invalidates every thread's context. Contexts already handed out stay
    /// usable but are no longer returned by [`get`](Self::get).
    pub fn reload(&self) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Reloading entity block render contexts (generation {generation})");
    }

    /// Runs `f` with this thread's context borrowed mutably.
    ///
    /// Panics if called re-entrantly from inside `f` on the same pool.
    pub fn with<R>(&self, f: impl FnOnce(&mut EntityBlockRenderContext) -> R) -> R {
        let context = self.get();
        let mut context = context.borrow_mut();
        f(&mut context)
    }
}

/// Frees the dropping thread's context. Contexts built for the pool on other
/// threads are released when those threads exit.
impl Drop for ContextPool {
    fn drop(&mut self) {
        let _ = SLOTS.try_with(|slots| slots.borrow_mut().remove(&self.id));
    }
}

#[cfg(test)]
fn slot_count() -> usize {
    SLOTS.with(|slots| slots.borrow().len())
}

/// This thread's context from the process-wide pool.
pub fn get() -> SharedContext {
    GLOBAL.get()
}

pub fn reload() {
    GLOBAL.reload();
}

pub fn with<R>(f: impl FnOnce(&mut EntityBlockRenderContext) -> R) -> R {
    GLOBAL.with(f)
}
