//! Runtime type checking and fallible downcasting.
//!
//! `is_type` answers "is-a" by scanning the instance's hierarchy tokens;
//! it produces no ordering or distance information. `safe_cast` gates
//! typed payload access: on success it returns the same handle re-viewed
//! as the requested type, which is the justification callers need before
//! reaching for the unsafe [`state`](ObjectPtr::state) accessors.

use crate::error::{Error, Result};
use crate::runtime::descriptor::ROOT_CLASS_NAME;
use crate::runtime::object::ObjectPtr;

impl ObjectPtr {
    /// Whether this instance is of class `name` or descends from it.
    ///
    /// `name` must exactly match one colon-separated token of the
    /// instance's hierarchy string; the universal root matches every
    /// instance even though it is never a token.
    pub fn is_type(&self, name: &str) -> bool {
        if name == ROOT_CLASS_NAME {
            return true;
        }
        self.hierarchy().split(':').any(|token| token == name)
    }

    /// Re-views this instance as class `name`.
    ///
    /// Not a copy: the returned handle is the same instance, now checked
    /// to be of the requested type.
    ///
    /// # Errors
    ///
    /// [`Error::TypeMismatch`] naming both the actual and the requested
    /// type when the instance is not a `name`.
    pub fn safe_cast(&self, name: &str) -> Result<ObjectPtr> {
        if self.is_type(name) {
            Ok(*self)
        } else {
            Err(Error::TypeMismatch {
                from: self.hierarchy().into(),
                to: name.into(),
            })
        }
    }
}
