//! Single-dispatch behavior methods: `compare`, `print` and `copy`.
//!
//! Unlike the chained lifecycle callbacks, these resolve only at the
//! most-derived class: an ancestor's callback is never consulted, an
//! override never calls "super". Each invocation holds the instance lock
//! for its duration, which is the runtime's only synchronization guarantee
//! for instance behavior; callbacks must therefore not re-enter locked
//! operations on the instances they receive.

use crate::error::{Error, Result};
use crate::runtime::object::ObjectPtr;
use crate::runtime::registry::ClassRegistry;

impl ObjectPtr {
    /// Structural equality through the class's `compare` callback.
    ///
    /// Identical handles are equal without dispatching. Otherwise both
    /// instances are locked, self first then other (caller-determined
    /// order; cyclic comparisons across threads are out of scope), and the
    /// callback runs only when both instances share the exact hierarchy.
    /// Instances of different classes, or of a class without a `compare`
    /// callback, are never equal.
    ///
    /// # Errors
    ///
    /// Whatever the callback reports.
    pub fn compare(&self, other: ObjectPtr) -> Result<bool> {
        if *self == other {
            return Ok(true);
        }

        let _self_guard = self.method_guard();
        let _other_guard = other.method_guard();

        if self.hierarchy() != other.hierarchy() {
            return Ok(false);
        }

        match self.class().compare {
            Some(compare) => compare(*self, other),
            None => Ok(false),
        }
    }

    /// Textual rendering through the class's `print` callback. Classes
    /// without the callback render as `"[TypeName]"`.
    ///
    /// # Errors
    ///
    /// Whatever the callback reports.
    pub fn print(&self) -> Result<String> {
        let _guard = self.method_guard();

        match self.class().print {
            Some(print) => print(*self),
            None => Ok(format!("[{}]", self.type_name())),
        }
    }

    /// Deep copy through the class's `copy` callback. The callback
    /// receives `registry` to instantiate the clone.
    ///
    /// # Errors
    ///
    /// [`Error::MethodUnavailable`] if the class has no `copy` callback,
    /// otherwise whatever the callback reports.
    pub fn copy(&self, registry: &ClassRegistry) -> Result<ObjectPtr> {
        let Some(copy) = self.class().copy else {
            return Err(Error::MethodUnavailable {
                class: self.type_name().into(),
                method: "copy",
            });
        };

        let _guard = self.method_guard();
        copy(*self, registry)
    }
}
