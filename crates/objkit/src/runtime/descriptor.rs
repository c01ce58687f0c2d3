//! Class descriptors: the static, immutable type declarations that plugins
//! and built-in modules hand to the registry.
//!
//! A [`ClassDescriptor`] is declared once per type, usually as a `static`
//! item, and never duplicated or mutated after registration. It carries the
//! colon-separated hierarchy string, the instance allocation size, an ABI
//! compatibility tag, and the lifecycle/behavior callbacks.
//!
//! Two callback families exist and behave differently:
//!
//! - `construct` / `destruct` are **chained**: every level of the hierarchy
//!   runs its own, root first on construction, leaf first on destruction.
//! - `dispose`, `compare`, `print` and `copy` are **single-dispatch**: only
//!   the most-derived class's callback is ever invoked, never an ancestor's.

use crate::error::Result;
use crate::runtime::object::{ObjectHeader, ObjectPtr};
use crate::runtime::registry::ClassRegistry;
use std::fmt;

/// Reserved name of the universal root class. Every instance answers true
/// to an `is_type` query for this name, and every resolved hierarchy chain
/// starts with it.
pub const ROOT_CLASS_NAME: &str = "Object";

/// Chained lifecycle callback, one invocation per hierarchy level. The
/// instance handed to `construct` is only partially constructed: ancestor
/// levels have run, descendant levels have not.
pub type LifecycleFn = fn(ObjectPtr) -> Result<()>;

/// Single-dispatch deletion hook, invoked on every ordinary deletion
/// request before the reference count is inspected.
pub type DisposeFn = fn(ObjectPtr) -> Result<()>;

/// Single-dispatch equality callback. Both instances are locked for the
/// duration of the call; the callback must not re-enter locked operations
/// on either instance.
pub type CompareFn = fn(ObjectPtr, ObjectPtr) -> Result<bool>;

/// Single-dispatch textual rendering callback. The instance is locked for
/// the duration of the call.
pub type PrintFn = fn(ObjectPtr) -> Result<String>;

/// Single-dispatch deep-copy callback. Receives the registry so it can
/// instantiate the clone; the source instance is locked for the duration
/// of the call.
pub type CopyFn = fn(ObjectPtr, &ClassRegistry) -> Result<ObjectPtr>;

/// Major/minor ABI compatibility tag carried by every class descriptor.
///
/// The plugin manager refuses descriptors whose tag is incompatible with
/// the running engine: the major version must match exactly and the minor
/// version must not be newer than the host's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiVersion {
    /// Incremented on breaking runtime changes.
    pub major: u16,
    /// Incremented on backwards-compatible additions.
    pub minor: u16,
}

impl AbiVersion {
    /// The ABI of this runtime build.
    pub const CURRENT: AbiVersion = AbiVersion { major: 1, minor: 0 };

    /// Creates a tag.
    pub const fn new(major: u16, minor: u16) -> AbiVersion {
        AbiVersion { major, minor }
    }

    /// Whether a descriptor carrying `self` may be loaded into a host
    /// running `host`.
    pub const fn is_compatible_with(self, host: AbiVersion) -> bool {
        self.major == host.major && self.minor <= host.minor
    }
}

impl fmt::Display for AbiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Static description of one runtime class.
///
/// Descriptors are externally owned and long-lived: the registry stores a
/// reference but never frees descriptor memory, so plugins declare them as
/// `static` items (dynamically assembled descriptors must be leaked before
/// registration).
///
/// # Example
///
/// ```
/// use objkit::runtime::{ClassDescriptor, DescriptorBuilder, instance_size_for};
///
/// static POINT_CLASS: ClassDescriptor =
///     DescriptorBuilder::new("Point", instance_size_for::<[f32; 2]>()).build();
///
/// assert_eq!(POINT_CLASS.name(), "Point");
/// ```
#[derive(PartialEq)]
pub struct ClassDescriptor {
    /// Colon-separated ancestor path ending in this class's own name. The
    /// universal root is implicit and never appears as a prefix token.
    pub(crate) hierarchy: &'static str,
    /// Bytes allocated per instance, header included.
    pub(crate) instance_size: usize,
    pub(crate) abi: AbiVersion,
    pub(crate) construct: Option<LifecycleFn>,
    pub(crate) destruct: Option<LifecycleFn>,
    pub(crate) dispose: Option<DisposeFn>,
    pub(crate) compare: Option<CompareFn>,
    pub(crate) print: Option<PrintFn>,
    pub(crate) copy: Option<CopyFn>,
    /// Pinned classes receive one compensating reference at construction,
    /// so ordinary deletion never reclaims them.
    pub(crate) pinned: bool,
}

impl ClassDescriptor {
    /// The full hierarchy string, e.g. `"Shape:Polygon"`.
    pub fn hierarchy(&self) -> &'static str {
        self.hierarchy
    }

    /// The unqualified class name: the last colon-separated token of the
    /// hierarchy string, or the whole string if it has no colon.
    pub fn name(&self) -> &'static str {
        match self.hierarchy.rsplit_once(':') {
            Some((_, own)) => own,
            None => self.hierarchy,
        }
    }

    /// Bytes allocated per instance of this class.
    pub fn instance_size(&self) -> usize {
        self.instance_size
    }

    /// ABI tag this descriptor was built against.
    pub fn abi(&self) -> AbiVersion {
        self.abi
    }

    /// Whether instances of this class are pinned against ordinary
    /// deletion.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("hierarchy", &self.hierarchy)
            .field("instance_size", &self.instance_size)
            .field("abi", &self.abi)
            .field("pinned", &self.pinned)
            .finish()
    }
}

/// Builder for [`ClassDescriptor`] values.
///
/// All methods are `const fn`, so a descriptor can be assembled directly in
/// a `static` initializer. A new builder starts with no lifecycle callbacks
/// and with [`default_dispose`] as the deletion hook; call [`pinned`] to
/// opt out of ordinary deletion instead.
///
/// [`pinned`]: DescriptorBuilder::pinned
pub struct DescriptorBuilder {
    desc: ClassDescriptor,
}

impl DescriptorBuilder {
    /// Starts a descriptor for the class at the end of `hierarchy`, whose
    /// instances occupy `instance_size` bytes.
    pub const fn new(hierarchy: &'static str, instance_size: usize) -> DescriptorBuilder {
        DescriptorBuilder {
            desc: ClassDescriptor {
                hierarchy,
                instance_size,
                abi: AbiVersion::CURRENT,
                construct: None,
                destruct: None,
                dispose: Some(default_dispose),
                compare: None,
                print: None,
                copy: None,
                pinned: false,
            },
        }
    }

    /// Overrides the ABI tag (plugins compiled against an older engine).
    pub const fn abi(mut self, abi: AbiVersion) -> DescriptorBuilder {
        self.desc.abi = abi;
        self
    }

    /// Sets this level's construction callback.
    pub const fn construct(mut self, f: LifecycleFn) -> DescriptorBuilder {
        self.desc.construct = Some(f);
        self
    }

    /// Sets this level's destruction callback.
    pub const fn destruct(mut self, f: LifecycleFn) -> DescriptorBuilder {
        self.desc.destruct = Some(f);
        self
    }

    /// Replaces the default deletion hook.
    pub const fn dispose(mut self, f: DisposeFn) -> DescriptorBuilder {
        self.desc.dispose = Some(f);
        self
    }

    /// Sets the single-dispatch equality callback.
    pub const fn compare(mut self, f: CompareFn) -> DescriptorBuilder {
        self.desc.compare = Some(f);
        self
    }

    /// Sets the single-dispatch rendering callback.
    pub const fn print(mut self, f: PrintFn) -> DescriptorBuilder {
        self.desc.print = Some(f);
        self
    }

    /// Sets the single-dispatch deep-copy callback.
    pub const fn copy(mut self, f: CopyFn) -> DescriptorBuilder {
        self.desc.copy = Some(f);
        self
    }

    /// Marks the class as pinned: the deletion hook is removed and every
    /// instance is constructed holding one compensating reference, so only
    /// `force_delete` can reclaim it.
    pub const fn pinned(mut self) -> DescriptorBuilder {
        self.desc.dispose = None;
        self.desc.pinned = true;
        self
    }

    /// Finishes the descriptor.
    pub const fn build(self) -> ClassDescriptor {
        self.desc
    }
}

/// The deletion hook of ordinary classes: decrement the reference count
/// and let the two-phase protocol decide whether the instance survives.
pub fn default_dispose(obj: ObjectPtr) -> Result<()> {
    obj.decref();
    Ok(())
}

/// The universal root class. Registered and resolved automatically when a
/// [`ClassRegistry`] is created; carries no payload and no chained
/// callbacks (the lifecycle manager itself initializes the header).
pub static ROOT_CLASS: ClassDescriptor =
    DescriptorBuilder::new(ROOT_CLASS_NAME, size_of::<ObjectHeader>()).build();
