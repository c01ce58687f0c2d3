//! objkit: a dynamic class and object runtime.
//!
//! Every data type in an embedding framework (containers, parsers, I/O
//! sources, plugin-provided types) is an instance of this runtime's
//! object model. Classes are registered at run time from string-encoded
//! hierarchy descriptors (plugins can extend and retract the type universe
//! without recompilation), instances are reference-counted raw
//! allocations tagged with their class, and type checks resolve against
//! the hierarchy string instead of compile-time inheritance.
//!
//! # What the runtime provides
//!
//! - **Class registration**: [`ClassRegistry`] maps unqualified class
//!   names to registration records; `add`/`init`/`register`/`remove` are
//!   the plugin-facing surface.
//! - **Hierarchy-aware lifecycle**: construction callbacks run root to
//!   leaf, destruction callbacks leaf to root, both cached per class at
//!   resolution time.
//! - **Two-phase deletion**: `delete` disposes and reclaims only
//!   unreferenced instances; `force_delete` reclaims unconditionally.
//! - **Introspection**: `is_type` and `safe_cast` against any ancestor
//!   name.
//!
//! # What it deliberately does not provide
//!
//! No garbage collection (counting is manual and advisory), no
//! multiple-inheritance method resolution (only construct/destruct chain
//! across ancestors; behavior methods are single-dispatch overrides), and
//! no synchronized registration (plugin load/unload phases are serialized
//! by the embedder).

pub mod error;
pub mod runtime;

pub use error::{Error, Result};
pub use runtime::{
    AbiVersion, ClassDescriptor, ClassRegistry, DescriptorBuilder, ObjectPtr, ROOT_CLASS_NAME,
    default_dispose, instance_size_for,
};
