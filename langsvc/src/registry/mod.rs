//! Token registry: opaque, generation-checked handles for engine objects.
//!
//! Every object the service vends across the boundary (modules, programs,
//! expressions, runtime objects, diagnostics, fixes) lives in a [`Pool`] and
//! is referred to only by a [`Handle`]. Handles are `Copy`, phantom-typed per
//! entity kind, and carry a generation counter so a released slot can be
//! reused without ever letting a stale handle resolve.
//!
//! # Lifecycle
//!
//! ```text
//! allocate(value) ──► Handle ──► resolve(handle) ──► Arc<T>
//!                        │
//!                        └─────► release(handle) ──► bool
//! ```
//!
//! - `resolve` on an unknown, released, or stale handle returns `None`,
//!   never panics.
//! - `release` returns `false` on the second call for the same handle.
//! - Child handles are NOT revoked when a parent is released (lazy
//!   fail-on-use): an expression handle stays individually releasable after
//!   its program is gone, and using it is answered with an absent value.

use crate::diagnostics::{Diagnostic, SourceFix};
use crate::program::{Expression, Program, RuntimeObject};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

// =============================================================================
// Handles
// =============================================================================

/// An opaque handle into a [`Pool`].
///
/// The phantom type parameter ties each handle to the entity kind it was
/// allocated for, so passing a module handle where an error handle is
/// expected is a compile error rather than a runtime lookup failure.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _kind: PhantomData,
        }
    }
}

// Manual impls: derive would bound them on `T`, but handles are plain ids.
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

// =============================================================================
// Pool
// =============================================================================

struct Slot<T> {
    generation: u32,
    value: Option<Arc<T>>,
}

/// A generational slot arena.
///
/// Allocation and release are atomic with respect to concurrent callers; no
/// two in-flight allocations can receive the same handle.
pub struct Pool<T> {
    inner: Mutex<PoolInner<T>>,
}

struct PoolInner<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
}

impl<T> Pool<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                slots: Vec::new(),
                free: Vec::new(),
            }),
        }
    }

    /// Stores a value and returns its handle.
    pub fn allocate(&self, value: T) -> Handle<T> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let value = Some(Arc::new(value));
        if let Some(index) = inner.free.pop() {
            let slot = &mut inner.slots[index as usize];
            slot.value = value;
            Handle::new(index, slot.generation)
        } else {
            let index = inner.slots.len() as u32;
            inner.slots.push(Slot {
                generation: 0,
                value,
            });
            Handle::new(index, 0)
        }
    }

    /// Looks up a handle, returning a shared reference to the stored value.
    ///
    /// `None` if the handle was never allocated here, was released, or is a
    /// stale handle into a reused slot.
    pub fn resolve(&self, handle: Handle<T>) -> Option<Arc<T>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let slot = inner.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.clone()
    }

    /// Removes the mapping for a handle.
    ///
    /// Returns `true` exactly once per live handle; a second release of the
    /// same handle returns `false`. The slot's generation is bumped so the
    /// released handle can never alias a future allocation.
    pub fn release(&self, handle: Handle<T>) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let Some(slot) = inner.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.value.is_none() {
            return false;
        }
        slot.value = None;
        slot.generation = slot.generation.wrapping_add(1);
        inner.free.push(handle.index);
        true
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every live entry, returning how many were drained.
    ///
    /// Used for channel-teardown cleanup: all handles a connection allocated
    /// become unresolvable at once.
    pub fn clear(&self) -> usize {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let inner = &mut *guard;
        let mut drained = 0;
        for (index, slot) in inner.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                drained += 1;
                inner.free.push(index as u32);
            }
        }
        drained
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Typed handle aliases for the boundary's entity kinds.
pub type ProgramHandle = Handle<Program>;
pub type ExpressionHandle = Handle<Expression>;
pub type ObjectHandle = Handle<RuntimeObject>;
pub type ErrorHandle = Handle<Diagnostic>;
pub type FixHandle = Handle<SourceFix>;

/// The per-connection object registry.
///
/// The only shared mutable structure in the service; each pool is internally
/// synchronized. Module handles live in the
/// [`ModuleLoader`](crate::language::ModuleLoader), which layers reference
/// counting on top of its own pool.
pub struct Registry {
    pub programs: Pool<Program>,
    pub expressions: Pool<Expression>,
    pub objects: Pool<RuntimeObject>,
    pub errors: Pool<Diagnostic>,
    pub fixes: Pool<SourceFix>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            programs: Pool::new(),
            expressions: Pool::new(),
            objects: Pool::new(),
            errors: Pool::new(),
            fixes: Pool::new(),
        }
    }

    /// Total live entries across all pools.
    pub fn live_entries(&self) -> usize {
        self.programs.len()
            + self.expressions.len()
            + self.objects.len()
            + self.errors.len()
            + self.fixes.len()
    }

    /// Drains every pool. Returns the number of entries released.
    pub fn clear(&self) -> usize {
        self.programs.clear()
            + self.expressions.clear()
            + self.objects.clear()
            + self.errors.clear()
            + self.fixes.clear()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;

    #[test]
    fn test_allocate_then_resolve() {
        let pool: Pool<String> = Pool::new();
        let handle = pool.allocate("hello".to_string());
        assert_eq!(pool.resolve(handle).as_deref(), Some(&"hello".to_string()));
    }

    #[test]
    fn test_resolve_after_release_fails() {
        let pool: Pool<u32> = Pool::new();
        let handle = pool.allocate(7);
        assert!(pool.release(handle));
        assert!(pool.resolve(handle).is_none());
    }

    #[test]
    fn test_double_release_returns_false() {
        let pool: Pool<u32> = Pool::new();
        let handle = pool.allocate(7);
        assert!(pool.release(handle));
        assert!(!pool.release(handle));
    }

    #[test]
    fn test_release_unknown_handle_returns_false() {
        let pool: Pool<u32> = Pool::new();
        let handle = pool.allocate(7);
        let other: Pool<u32> = Pool::new();
        assert!(!other.release(handle));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let pool: Pool<u32> = Pool::new();
        let first = pool.allocate(1);
        assert!(pool.release(first));

        // Slot is reused, generation differs.
        let second = pool.allocate(2);
        assert_ne!(first, second);
        assert!(pool.resolve(first).is_none());
        assert_eq!(pool.resolve(second).as_deref(), Some(&2));
        // Releasing the stale handle must not kill the new entry.
        assert!(!pool.release(first));
        assert_eq!(pool.resolve(second).as_deref(), Some(&2));
    }

    #[test]
    fn test_len_and_clear() {
        let pool: Pool<u32> = Pool::new();
        let a = pool.allocate(1);
        let _b = pool.allocate(2);
        assert_eq!(pool.len(), 2);
        assert!(pool.release(a));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.clear(), 1);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_clear_invalidates_outstanding_handles() {
        let pool: Pool<u32> = Pool::new();
        let handle = pool.allocate(1);
        pool.clear();
        assert!(pool.resolve(handle).is_none());
        assert!(!pool.release(handle));
    }

    #[test]
    fn test_concurrent_allocations_get_unique_handles() {
        let pool = StdArc::new(Pool::<usize>::new());
        let mut joins = Vec::new();
        for t in 0..8 {
            let pool = StdArc::clone(&pool);
            joins.push(std::thread::spawn(move || {
                (0..100).map(|i| pool.allocate(t * 100 + i)).collect::<Vec<_>>()
            }));
        }
        let mut seen = std::collections::HashSet::new();
        for join in joins {
            for handle in join.join().unwrap() {
                assert!(seen.insert(handle), "duplicate handle issued");
            }
        }
        assert_eq!(pool.len(), 800);
    }

    #[test]
    fn test_registry_live_entries_and_clear() {
        let registry = Registry::new();
        assert_eq!(registry.live_entries(), 0);
        let diag = Diagnostic::not_found("program handle did not resolve");
        registry.errors.allocate(diag);
        assert_eq!(registry.live_entries(), 1);
        assert_eq!(registry.clear(), 1);
        assert_eq!(registry.live_entries(), 0);
    }
}
