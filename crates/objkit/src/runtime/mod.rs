//! The `objkit` runtime: class registry, hierarchy resolution, object
//! lifecycle, reference counting and runtime type checks.
//!
//! # Architecture
//!
//! - [`descriptor`]: static class declarations (hierarchy string, instance
//!   size, ABI tag, lifecycle and behavior callbacks)
//! - [`registry`]: the class table and the hierarchy resolver that caches
//!   construction/destruction chains per class
//! - [`object`]: instance allocation, the two-phase deletion protocol and
//!   reference counting
//! - [`dispatch`]: single-dispatch behavior methods (`compare`, `print`,
//!   `copy`)
//! - [`typecheck`]: `is_type` and `safe_cast`
//!
//! # Example
//!
//! ```
//! use objkit::runtime::{ClassRegistry, DescriptorBuilder, ClassDescriptor,
//!                       ObjectPtr, instance_size_for};
//!
//! static WIDGET: ClassDescriptor =
//!     DescriptorBuilder::new("Widget", instance_size_for::<u64>()).build();
//!
//! let mut registry = ClassRegistry::new();
//! registry.register(&WIDGET).unwrap();
//!
//! let widget = ObjectPtr::new_by_name(&registry, "Widget").unwrap();
//! assert!(widget.is_type("Object"));
//! widget.delete(&registry).unwrap();
//! ```

pub mod descriptor;
pub mod dispatch;
pub mod object;
pub mod registry;
pub mod typecheck;

pub use descriptor::{
    AbiVersion, ClassDescriptor, CompareFn, CopyFn, DescriptorBuilder, DisposeFn, LifecycleFn,
    PrintFn, ROOT_CLASS, ROOT_CLASS_NAME, default_dispose,
};
pub use object::{INSTANCE_ALIGN, ObjectHeader, ObjectPtr, instance_size_for};
pub use registry::{ClassRegistry, RegistrationRecord};
