//! Instance allocation, the two-phase deletion protocol, and reference
//! counting.
//!
//! # Instance layout
//!
//! Every instance is a single raw allocation of its class's
//! `instance_size` bytes, aligned to [`INSTANCE_ALIGN`]. The allocation
//! starts with an [`ObjectHeader`] (class tag, reference count, instance
//! lock); class payload lives at [`instance_size_for`]'s fixed offset past
//! the header and is zero-initialized before the construction chain runs.
//! Payload must be plain data (no drop glue): destruction callbacks, not
//! the allocator, release whatever construction callbacks acquired.
//!
//! # Ownership
//!
//! [`ObjectPtr`] is a `Copy` handle, not an owning smart pointer. Sharing
//! is advisory through the reference count: holders call
//! [`incref`](ObjectPtr::incref) / [`decref`](ObjectPtr::decref), normal
//! paths end with [`delete`](ObjectPtr::delete), and only
//! construction-failure or teardown paths use
//! [`force_delete`](ObjectPtr::force_delete). Nothing prevents a caller
//! from bypassing the protocol and freeing an instance with outstanding
//! references; that hazard is part of the design and is documented rather
//! than defended against.
//!
//! # Thread safety
//!
//! The reference count is atomic and lock-free. The per-instance mutex
//! serializes single-dispatch method invocation (`compare`, `print`,
//! `copy`) only; payload mutation is synchronized by the caller or not at
//! all.

use crate::error::{Error, Result};
use crate::runtime::descriptor::ClassDescriptor;
use crate::runtime::registry::ClassRegistry;
use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Alignment of every instance allocation. Class payload requiring
/// stronger alignment than this is not supported.
pub const INSTANCE_ALIGN: usize = 16;

/// Offset of class payload within an instance allocation: the header
/// rounded up to [`INSTANCE_ALIGN`], so payload alignment is independent
/// of the header's layout.
pub(crate) const PAYLOAD_OFFSET: usize =
    (size_of::<ObjectHeader>() + INSTANCE_ALIGN - 1) & !(INSTANCE_ALIGN - 1);

/// Instance size a class must declare for a payload of type `T`.
///
/// ```
/// use objkit::runtime::instance_size_for;
///
/// #[repr(C)]
/// struct Point { x: f32, y: f32 }
///
/// const POINT_SIZE: usize = instance_size_for::<Point>();
/// ```
pub const fn instance_size_for<T>() -> usize {
    PAYLOAD_OFFSET + size_of::<T>()
}

/// Header at the start of every instance allocation.
///
/// Opaque to class implementations; the lifecycle manager writes it before
/// any construction callback runs and reads it until the memory is freed.
#[repr(C)]
pub struct ObjectHeader {
    /// Tag identifying the instance's class. Always the descriptor, never
    /// the registry's record: instances outlive registry borrows.
    class: &'static ClassDescriptor,
    /// Shared-ownership count. Starts at 0; ownership is established by
    /// whoever increments first.
    refcount: AtomicU32,
    /// Serializes single-dispatch method invocation on this instance.
    lock: Mutex<()>,
}

/// Handle to a runtime instance.
///
/// `Copy` by design: the runtime's ownership model is the advisory
/// reference count, not Rust move semantics. After passing a handle to
/// [`delete`](ObjectPtr::delete) or [`force_delete`](ObjectPtr::force_delete)
/// every copy of it is dangling and must not be used.
pub struct ObjectPtr {
    ptr: NonNull<ObjectHeader>,
}

impl ObjectPtr {
    /// Instantiates a class by descriptor. The class must be registered
    /// and resolved in `registry`.
    ///
    /// Constructors run root-to-leaf on the zeroed allocation; if any
    /// level fails, the partial instance is force-deleted (full-chain
    /// best-effort teardown, no level-by-level unwind) and the
    /// construction error is returned.
    ///
    /// The new instance's reference count is 0.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownClass`], [`Error::UnresolvedHierarchy`],
    /// [`Error::AllocationFailure`], or whatever a construction callback
    /// reports.
    pub fn new(registry: &ClassRegistry, cls: &'static ClassDescriptor) -> Result<ObjectPtr> {
        ObjectPtr::instantiate(registry, cls.name())
    }

    /// Instantiates a class by its unqualified name. See
    /// [`new`](ObjectPtr::new).
    pub fn new_by_name(registry: &ClassRegistry, name: &str) -> Result<ObjectPtr> {
        ObjectPtr::instantiate(registry, name)
    }

    fn instantiate(registry: &ClassRegistry, name: &str) -> Result<ObjectPtr> {
        let record = registry.record(name)?;
        if !record.is_resolved() {
            return Err(Error::UnresolvedHierarchy {
                class: name.into(),
                ancestor: name.into(),
            });
        }
        let cls = record.class();

        let obj = ObjectPtr::allocate(cls)?;

        for (level, callback) in record.construct_chain().iter().enumerate() {
            if let Some(construct) = callback {
                if let Err(err) = construct(obj) {
                    objkit_log::warn!(
                        "construct[{}] of '{}' failed: {}, abandoning instance",
                        level,
                        name,
                        err
                    );
                    // teardown error is secondary; the construction error
                    // is what the caller needs
                    let _ = obj.force_delete(registry);
                    return Err(err);
                }
            }
        }

        if cls.is_pinned() {
            obj.incref();
        }

        objkit_log::trace!("created instance of '{}' at {:p}", name, obj.ptr);
        Ok(obj)
    }

    fn allocate(cls: &'static ClassDescriptor) -> Result<ObjectPtr> {
        let size = cls.instance_size();
        let layout =
            Layout::from_size_align(size, INSTANCE_ALIGN).map_err(|_| Error::InvalidArgument {
                what: "instance size overflows the allocator's layout limits",
            })?;

        // SAFETY: layout has non-zero size (at least the header, validated
        // at registration)
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(raw.cast::<ObjectHeader>()) else {
            return Err(Error::AllocationFailure { size });
        };

        // SAFETY: the allocation holds at least an ObjectHeader and is
        // INSTANCE_ALIGN-aligned; payload bytes past the header stay zeroed
        unsafe {
            ptr.as_ptr().write(ObjectHeader {
                class: cls,
                refcount: AtomicU32::new(0),
                lock: Mutex::new(()),
            });
        }

        Ok(ObjectPtr { ptr })
    }

    /// Invokes the class's single-dispatch `dispose` callback, typically a
    /// reference-count decrement. Classes without the callback (pinned
    /// classes) do not support ordinary disposal and the instance is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// Whatever the callback reports.
    pub fn dispose(&self) -> Result<()> {
        match self.class().dispose {
            Some(dispose) => dispose(*self),
            None => Ok(()),
        }
    }

    /// Two-phase ("soft") deletion: dispose, then reclaim the instance
    /// only if no reference was outstanding at the moment of the request.
    ///
    /// An instance that had outstanding references survives the request
    /// (dispose has released one of them); the final `delete` issued when
    /// the count is already 0 is the one that runs the destruction chain
    /// and frees the memory.
    ///
    /// Whether or not the memory was freed, the handle (and every copy of
    /// it) must be treated as invalidated after this call. An instance
    /// that survives is still owned by its remaining reference holders.
    ///
    /// # Errors
    ///
    /// The first error reported by `dispose` or the destruction chain;
    /// later teardown steps still run.
    pub fn delete(self, registry: &ClassRegistry) -> Result<()> {
        let outstanding = self.ref_count();
        let mut first_err = None;

        if let Err(err) = self.dispose() {
            first_err = Some(err);
        }

        if outstanding == 0 {
            if let Err(err) = self.force_delete(registry) {
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Unconditional deletion: runs the destruction chain leaf-to-root,
    /// ignoring the reference count, then frees the memory. For instances
    /// the caller knows are unreachable: construction failures, pinned
    /// instances at subsystem teardown.
    ///
    /// Teardown is best-effort: a failing destruction callback does not
    /// stop the remaining levels, and the memory is freed regardless. The
    /// first error is the one returned.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownClass`] if the class was removed from `registry`
    /// while the instance was alive (the memory is then **not** freed), or
    /// the first destruction-callback error.
    pub fn force_delete(self, registry: &ClassRegistry) -> Result<()> {
        let name = self.type_name();
        let record = registry.record(name)?;
        let mut first_err = None;

        for (level, callback) in record.destruct_chain().iter().enumerate() {
            if let Some(destruct) = callback {
                if let Err(err) = destruct(self) {
                    objkit_log::warn!("destruct[{}] of '{}' failed: {}", level, name, err);
                    first_err.get_or_insert(err);
                }
            }
        }

        objkit_log::trace!("destroyed instance of '{}' at {:p}", name, self.ptr);

        // SAFETY: the handle is consumed; all copies are invalidated by
        // the protocol's contract
        unsafe { self.free() };

        match first_err {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Releases the allocation.
    ///
    /// # Safety
    ///
    /// No access through any copy of the handle may happen afterwards.
    unsafe fn free(self) {
        let size = self.class().instance_size();
        // SAFETY: same size and alignment the instance was allocated with
        unsafe {
            let layout = Layout::from_size_align_unchecked(size, INSTANCE_ALIGN);
            std::ptr::drop_in_place(self.ptr.as_ptr());
            alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout);
        }
    }

    /// Increments the reference count.
    ///
    /// # Panics
    ///
    /// Panics on reference-count overflow (`u32::MAX` outstanding
    /// references indicates a runaway loop, not a recoverable state).
    pub fn incref(&self) {
        let old = self.header().refcount.fetch_add(1, Ordering::AcqRel);
        if old == u32::MAX {
            panic!(
                "reference count overflow on instance of '{}'",
                self.type_name()
            );
        }
    }

    /// Decrements the reference count. Decrementing an already-zero count
    /// is a silent no-op; the count never underflows.
    pub fn decref(&self) {
        let _ = self
            .header()
            .refcount
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
                count.checked_sub(1)
            });
    }

    /// Current reference count. Other threads may change it between the
    /// load and any decision taken on it.
    pub fn ref_count(&self) -> u32 {
        self.header().refcount.load(Ordering::Acquire)
    }

    /// The instance's class descriptor.
    pub fn class(&self) -> &'static ClassDescriptor {
        self.header().class
    }

    /// The instance's unqualified type name.
    pub fn type_name(&self) -> &'static str {
        self.class().name()
    }

    /// The instance's full hierarchy string.
    pub fn hierarchy(&self) -> &'static str {
        self.class().hierarchy()
    }

    /// Bytes this instance occupies.
    pub fn instance_size(&self) -> usize {
        self.class().instance_size()
    }

    /// Shared access to the class payload.
    ///
    /// # Safety
    ///
    /// The payload of this instance must actually be a `T` (establish this
    /// through [`safe_cast`](ObjectPtr::safe_cast) or construction
    /// context), `T` must not exceed [`INSTANCE_ALIGN`] alignment, and the
    /// caller must synchronize with any concurrent payload mutation.
    pub unsafe fn state<T>(&self) -> &T {
        // SAFETY: payload sits at PAYLOAD_OFFSET, aligned to
        // INSTANCE_ALIGN; the type contract is the caller's
        unsafe { &*self.payload_ptr().cast::<T>() }
    }

    /// Exclusive access to the class payload.
    ///
    /// # Safety
    ///
    /// As [`state`](ObjectPtr::state), and additionally no other reference
    /// to the payload may be live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn state_mut<T>(&self) -> &mut T {
        // SAFETY: as in state(); exclusivity is the caller's contract
        unsafe { &mut *self.payload_ptr().cast::<T>() }
    }

    fn payload_ptr(&self) -> *mut u8 {
        // SAFETY: the allocation is at least PAYLOAD_OFFSET bytes for any
        // class with payload; the pointer is only dereferenced by the
        // unsafe state accessors
        unsafe { self.ptr.as_ptr().cast::<u8>().add(PAYLOAD_OFFSET) }
    }

    /// Acquires the instance lock for a single-dispatch invocation.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned (a callback panicked on another
    /// thread).
    pub(crate) fn method_guard(&self) -> MutexGuard<'_, ()> {
        self.header().lock.lock().unwrap()
    }

    fn header(&self) -> &ObjectHeader {
        // SAFETY: the pointer is valid from allocation until free();
        // use-after-delete is the documented hazard of the advisory
        // protocol, not something the handle can defend against
        unsafe { self.ptr.as_ref() }
    }
}

// SAFETY: ObjectPtr is Send because the header it points to is only
// touched through atomics and the instance mutex; payload access is gated
// behind unsafe accessors whose contract includes synchronization.
unsafe impl Send for ObjectPtr {}

// SAFETY: ObjectPtr is Sync for the same reasons: every safe shared
// operation is atomic (refcount) or lock-guarded (single dispatch).
unsafe impl Sync for ObjectPtr {}

impl Clone for ObjectPtr {
    fn clone(&self) -> ObjectPtr {
        *self
    }
}

impl Copy for ObjectPtr {}

impl PartialEq for ObjectPtr {
    fn eq(&self, other: &ObjectPtr) -> bool {
        // handle identity, not payload equality (that is compare())
        std::ptr::eq(self.ptr.as_ptr(), other.ptr.as_ptr())
    }
}

impl Eq for ObjectPtr {}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPtr")
            .field("class", &self.type_name())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
