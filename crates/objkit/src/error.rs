//! Error types for the `objkit` runtime.
//!
//! Every fallible runtime operation reports its outcome through [`Error`];
//! there is no panicking error path in the library apart from lock
//! poisoning and reference-count overflow, both of which indicate a bug in
//! the embedding program rather than a recoverable condition.

use std::fmt;

/// Errors that can occur in the `objkit` runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required argument was absent or malformed.
    InvalidArgument {
        /// Description of the offending argument.
        what: &'static str,
    },

    /// The allocator refused an instance or bookkeeping allocation.
    AllocationFailure {
        /// The requested allocation size in bytes.
        size: usize,
    },

    /// A class with the same unqualified name is already registered.
    DuplicateRegistration {
        /// The contested class name.
        name: String,
    },

    /// No class with this name is registered.
    UnknownClass {
        /// The name that was looked up.
        name: String,
    },

    /// An ancestor named in a hierarchy string is not registered, or a
    /// class was used before its hierarchy was resolved.
    UnresolvedHierarchy {
        /// The class whose hierarchy failed to resolve.
        class: String,
        /// The ancestor that could not be found. Equal to `class` when the
        /// class itself is registered but was never resolved.
        ancestor: String,
    },

    /// A single-dispatch callback required by the operation is absent.
    MethodUnavailable {
        /// The class missing the callback.
        class: String,
        /// The callback name (`"copy"`, `"compare"`, ...).
        method: &'static str,
    },

    /// A safe cast was refused because the instance is not of the
    /// requested type.
    TypeMismatch {
        /// The instance's actual hierarchy.
        from: String,
        /// The requested type name.
        to: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidArgument { what } => {
                write!(f, "Invalid argument: {what}")
            }
            Error::AllocationFailure { size } => {
                write!(f, "Failed to allocate {size} bytes")
            }
            Error::DuplicateRegistration { name } => {
                write!(f, "Class '{name}' is already registered, class names must be unique")
            }
            Error::UnknownClass { name } => {
                write!(f, "No class named '{name}' is registered")
            }
            Error::UnresolvedHierarchy { class, ancestor } => {
                if class == ancestor {
                    write!(f, "Class '{class}' is registered but its hierarchy has not been resolved")
                } else {
                    write!(
                        f,
                        "Cannot resolve hierarchy of class '{class}': ancestor '{ancestor}' is not registered"
                    )
                }
            }
            Error::MethodUnavailable { class, method } => {
                write!(f, "Class '{class}' does not provide a '{method}' method")
            }
            Error::TypeMismatch { from, to } => {
                write!(f, "Failed to cast instance of type '{from}' to '{to}'")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for `objkit` runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::AllocationFailure { size: 64 }),
            "Failed to allocate 64 bytes"
        );
        assert_eq!(
            format!(
                "{}",
                Error::TypeMismatch {
                    from: "Base:Derived".into(),
                    to: "Other".into()
                }
            ),
            "Failed to cast instance of type 'Base:Derived' to 'Other'"
        );
    }

    #[test]
    fn test_unresolved_display_distinguishes_self() {
        let missing = Error::UnresolvedHierarchy {
            class: "Derived".into(),
            ancestor: "Base".into(),
        };
        assert!(format!("{missing}").contains("ancestor 'Base'"));

        let pending = Error::UnresolvedHierarchy {
            class: "Derived".into(),
            ancestor: "Derived".into(),
        };
        assert!(format!("{pending}").contains("has not been resolved"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(
            Error::UnknownClass { name: "A".into() },
            Error::UnknownClass { name: "A".into() }
        );
        assert_ne!(
            Error::UnknownClass { name: "A".into() },
            Error::UnknownClass { name: "B".into() }
        );
    }
}
