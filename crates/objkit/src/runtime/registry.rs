//! The class registry and hierarchy resolver.
//!
//! A [`ClassRegistry`] maps each unqualified class name to a
//! [`RegistrationRecord`]: a reference to the externally-owned descriptor
//! plus the cached construction and destruction chains computed by
//! hierarchy resolution. The registry owns the records and their chains,
//! never the descriptors or any instance.
//!
//! # Registration protocol
//!
//! Classes are added (`add`), then resolved (`init`) once all their
//! ancestors are present; `register` does both and is the entry point
//! plugins use at load time, with `remove` as the counterpart at unload.
//! `resolve_all` exists for the start-up pattern where a batch of classes
//! is added in arbitrary order and resolved in one pass.
//!
//! # Thread safety
//!
//! Registry mutation is deliberately not synchronized internally: the
//! plugin manager serializes load/unload phases, and `&mut self` on every
//! mutating method makes that contract explicit. Instances created from
//! the registry may outlive no registry borrow, so lookups during ordinary
//! instance creation are plain `&self` reads.

use crate::error::{Error, Result};
use crate::runtime::descriptor::{ClassDescriptor, LifecycleFn, ROOT_CLASS, ROOT_CLASS_NAME};
use crate::runtime::object::ObjectHeader;
use fxhash::FxHashMap;

/// Default initial capacity of the class table. Sized for the built-in
/// classes of a typical embedding plus a handful of plugins; resizing is
/// an ordinary map rehash, just best avoided during plugin load.
const DEFAULT_CAPACITY: usize = 64;

/// The registry's bookkeeping for one registered class.
///
/// Created empty by [`ClassRegistry::add`]; the chains are populated once
/// by hierarchy resolution and never recomputed (a record with a non-empty
/// chain is already resolved).
pub struct RegistrationRecord {
    class: &'static ClassDescriptor,
    /// Construction callbacks in execution order, root first. Absent
    /// callbacks are kept positionally as `None` so the reversed
    /// destruction chain stays aligned level-for-level.
    construct_chain: Vec<Option<LifecycleFn>>,
    /// The construction chain reversed: leaf first.
    destruct_chain: Vec<Option<LifecycleFn>>,
}

impl RegistrationRecord {
    fn new(class: &'static ClassDescriptor) -> RegistrationRecord {
        RegistrationRecord {
            class,
            construct_chain: Vec::new(),
            destruct_chain: Vec::new(),
        }
    }

    /// Whether hierarchy resolution has run for this record.
    pub fn is_resolved(&self) -> bool {
        !self.construct_chain.is_empty()
    }

    /// The descriptor this record was registered from.
    pub fn class(&self) -> &'static ClassDescriptor {
        self.class
    }

    pub(crate) fn construct_chain(&self) -> &[Option<LifecycleFn>] {
        &self.construct_chain
    }

    pub(crate) fn destruct_chain(&self) -> &[Option<LifecycleFn>] {
        &self.destruct_chain
    }
}

/// Table of every class the runtime can instantiate.
///
/// An explicit value rather than process-wide state: embedders create one
/// registry, thread it through registration and instantiation call sites,
/// and choose their own synchronization if plugins ever load concurrently.
pub struct ClassRegistry {
    classes: FxHashMap<&'static str, RegistrationRecord>,
}

impl ClassRegistry {
    /// Creates a registry with the default capacity. The universal root
    /// class is registered and resolved before this returns.
    pub fn new() -> ClassRegistry {
        ClassRegistry::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a registry sized for `capacity` classes.
    ///
    /// # Panics
    ///
    /// Panics if the root class cannot be bootstrapped, which would mean
    /// the runtime's own root descriptor is malformed.
    pub fn with_capacity(capacity: usize) -> ClassRegistry {
        let mut registry = ClassRegistry {
            classes: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        };
        registry
            .register(&ROOT_CLASS)
            .expect("root class bootstrap failed");
        registry
    }

    /// Adds a class to the table of classes available for instantiation.
    ///
    /// The record starts unresolved; call [`init`](ClassRegistry::init) or
    /// [`resolve_all`](ClassRegistry::resolve_all) before instantiating.
    ///
    /// # Errors
    ///
    /// [`Error::DuplicateRegistration`] if the unqualified name is taken,
    /// [`Error::InvalidArgument`] if the hierarchy string is empty or has
    /// empty segments, or if `instance_size` cannot hold the header.
    pub fn add(&mut self, cls: &'static ClassDescriptor) -> Result<()> {
        if cls.hierarchy().is_empty() {
            return Err(Error::InvalidArgument {
                what: "class hierarchy string is empty",
            });
        }
        if cls.hierarchy().split(':').any(str::is_empty) {
            return Err(Error::InvalidArgument {
                what: "class hierarchy string has an empty segment",
            });
        }
        if cls.instance_size() < size_of::<ObjectHeader>() {
            return Err(Error::InvalidArgument {
                what: "instance size is smaller than the object header",
            });
        }

        let name = cls.name();
        if self.classes.contains_key(name) {
            return Err(Error::DuplicateRegistration { name: name.into() });
        }

        self.classes.insert(name, RegistrationRecord::new(cls));
        objkit_log::debug!("added class '{}' ({})", name, cls.hierarchy());
        Ok(())
    }

    /// Resolves the class's inheritance hierarchy, caching the
    /// construction and destruction chains in its record.
    ///
    /// Idempotent: a record whose chains are already populated is left
    /// untouched, so resolve-on-register and resolve-everything-at-startup
    /// call patterns coexist safely.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownClass`] if the class was never added;
    /// [`Error::UnresolvedHierarchy`] if an ancestor token (or the root
    /// class) is not registered. No partial chain is ever stored.
    pub fn init(&mut self, cls: &'static ClassDescriptor) -> Result<()> {
        self.resolve_record(cls.name())
    }

    /// Adds and resolves in one step: the preferred way for plugins to
    /// extend the type universe at load time.
    pub fn register(&mut self, cls: &'static ClassDescriptor) -> Result<()> {
        self.add(cls)?;
        self.init(cls)
    }

    /// Removes a class. After this no instances of the class can be
    /// created; the record and its chains are released, the descriptor is
    /// untouched (it is externally owned). Plugins call this at unload for
    /// every class they registered.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownClass`] if no such class is registered.
    pub fn remove(&mut self, name: &str) -> Result<()> {
        match self.classes.remove(name) {
            Some(_) => {
                objkit_log::debug!("removed class '{}'", name);
                Ok(())
            }
            None => Err(Error::UnknownClass { name: name.into() }),
        }
    }

    /// Looks up a class descriptor by unqualified name.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownClass`] if absent.
    pub fn find(&self, name: &str) -> Result<&'static ClassDescriptor> {
        self.record(name).map(RegistrationRecord::class)
    }

    /// Whether a class with this name is registered. Never fails.
    pub fn is_registered(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Resolves every record that is still unresolved. Used once at
    /// start-up so classes added before their ancestors are still chained
    /// correctly regardless of registration order.
    pub fn resolve_all(&mut self) -> Result<()> {
        let pending: Vec<&'static str> = self
            .classes
            .values()
            .filter(|record| !record.is_resolved())
            .map(|record| record.class.name())
            .collect();

        for name in pending {
            self.resolve_record(name)?;
        }
        Ok(())
    }

    /// Number of registered classes, the root included.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether the registry holds no classes at all (only possible after
    /// [`clear`](ClassRegistry::clear)).
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Iterates the registered class names in table order.
    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.classes.keys().copied()
    }

    /// Drops every record, chains included. Descriptors are untouched.
    /// Used at subsystem teardown; a cleared registry cannot instantiate
    /// anything until classes are registered again.
    pub fn clear(&mut self) {
        objkit_log::debug!("clearing class registry ({} classes)", self.classes.len());
        self.classes.clear();
    }

    pub(crate) fn record(&self, name: &str) -> Result<&RegistrationRecord> {
        self.classes
            .get(name)
            .ok_or_else(|| Error::UnknownClass { name: name.into() })
    }

    /// Computes and caches the chains for one record.
    ///
    /// Tokenizing the hierarchy on `':'` yields `k` tokens; the chain has
    /// `k + 1` levels: level 0 is the universal root, levels `1..=k` are
    /// the tokens looked up left to right. The last token is the class's
    /// own name, so its own callbacks sit at the end of its chain.
    fn resolve_record(&mut self, name: &str) -> Result<()> {
        let record = self.record(name)?;
        if record.is_resolved() {
            return Ok(());
        }
        let hierarchy = record.class.hierarchy();

        let mut construct_chain = Vec::new();
        let mut destructs = Vec::new();

        let root = self
            .classes
            .get(ROOT_CLASS_NAME)
            .ok_or_else(|| Error::UnresolvedHierarchy {
                class: name.into(),
                ancestor: ROOT_CLASS_NAME.into(),
            })?
            .class;
        construct_chain.push(root.construct);
        destructs.push(root.destruct);

        for token in hierarchy.split(':') {
            let ancestor = self
                .classes
                .get(token)
                .ok_or_else(|| Error::UnresolvedHierarchy {
                    class: name.into(),
                    ancestor: token.into(),
                })?
                .class;
            construct_chain.push(ancestor.construct);
            destructs.push(ancestor.destruct);
        }

        let destruct_chain: Vec<Option<LifecycleFn>> = destructs.into_iter().rev().collect();

        objkit_log::debug!(
            "resolved hierarchy of '{}' ({} levels)",
            name,
            construct_chain.len()
        );

        let record = self
            .classes
            .get_mut(name)
            .expect("record vanished during resolution");
        record.construct_chain = construct_chain;
        record.destruct_chain = destruct_chain;
        Ok(())
    }
}

impl Default for ClassRegistry {
    fn default() -> ClassRegistry {
        ClassRegistry::new()
    }
}

impl std::fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.classes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::descriptor::DescriptorBuilder;

    static BASE: ClassDescriptor = DescriptorBuilder::new("Base", 64).build();
    static DERIVED: ClassDescriptor = DescriptorBuilder::new("Base:Derived", 64).build();
    static ORPHAN: ClassDescriptor = DescriptorBuilder::new("Missing:Orphan", 64).build();

    #[test]
    fn new_registry_bootstraps_the_root() {
        let registry = ClassRegistry::new();
        assert!(registry.is_registered(ROOT_CLASS_NAME));
        assert_eq!(registry.len(), 1);
        assert!(registry.record(ROOT_CLASS_NAME).unwrap().is_resolved());
    }

    #[test]
    fn add_then_find_returns_the_same_descriptor() {
        let mut registry = ClassRegistry::new();
        registry.add(&BASE).unwrap();

        let found = registry.find("Base").unwrap();
        assert!(std::ptr::eq(found, &BASE));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ClassRegistry::new();
        registry.add(&BASE).unwrap();

        assert_eq!(
            registry.add(&BASE),
            Err(Error::DuplicateRegistration {
                name: "Base".into()
            })
        );
    }

    #[test]
    fn find_unknown_class_fails() {
        let registry = ClassRegistry::new();
        assert_eq!(
            registry.find("Nope"),
            Err(Error::UnknownClass {
                name: "Nope".into()
            })
        );
        assert!(!registry.is_registered("Nope"));
    }

    #[test]
    fn register_resolves_chains_with_root_prepended() {
        let mut registry = ClassRegistry::new();
        registry.register(&BASE).unwrap();
        registry.register(&DERIVED).unwrap();

        // root + Base + Derived
        let record = registry.record("Derived").unwrap();
        assert!(record.is_resolved());
        assert_eq!(record.construct_chain().len(), 3);
        assert_eq!(record.destruct_chain().len(), 3);

        // root + Base
        let record = registry.record("Base").unwrap();
        assert_eq!(record.construct_chain().len(), 2);
    }

    #[test]
    fn resolution_requires_registered_ancestors() {
        let mut registry = ClassRegistry::new();
        registry.add(&ORPHAN).unwrap();

        assert_eq!(
            registry.init(&ORPHAN),
            Err(Error::UnresolvedHierarchy {
                class: "Orphan".into(),
                ancestor: "Missing".into()
            })
        );
        // no partial chain was stored
        assert!(!registry.record("Orphan").unwrap().is_resolved());
    }

    #[test]
    fn resolve_all_handles_any_registration_order() {
        let mut registry = ClassRegistry::new();
        // descendant added before its ancestor
        registry.add(&DERIVED).unwrap();
        registry.add(&BASE).unwrap();

        registry.resolve_all().unwrap();

        assert!(registry.record("Derived").unwrap().is_resolved());
        assert!(registry.record("Base").unwrap().is_resolved());
    }

    #[test]
    fn resolution_is_idempotent() {
        let mut registry = ClassRegistry::new();
        registry.register(&BASE).unwrap();

        let before = registry.record("Base").unwrap().construct_chain().len();
        registry.init(&BASE).unwrap();
        registry.resolve_all().unwrap();
        let after = registry.record("Base").unwrap().construct_chain().len();

        assert_eq!(before, after);
    }

    #[test]
    fn remove_forgets_the_class_but_not_the_descriptor() {
        let mut registry = ClassRegistry::new();
        registry.register(&BASE).unwrap();

        registry.remove("Base").unwrap();
        assert!(!registry.is_registered("Base"));
        assert_eq!(
            registry.remove("Base"),
            Err(Error::UnknownClass {
                name: "Base".into()
            })
        );
        // the static descriptor is still usable and can be re-registered
        registry.register(&BASE).unwrap();
    }

    #[test]
    fn malformed_descriptors_are_rejected_at_add() {
        static EMPTY: ClassDescriptor = DescriptorBuilder::new("", 64).build();
        static HOLEY: ClassDescriptor = DescriptorBuilder::new("A::B", 64).build();
        static TINY: ClassDescriptor = DescriptorBuilder::new("Tiny", 1).build();

        let mut registry = ClassRegistry::new();
        assert!(matches!(
            registry.add(&EMPTY),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            registry.add(&HOLEY),
            Err(Error::InvalidArgument { .. })
        ));
        assert!(matches!(
            registry.add(&TINY),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn clear_empties_the_table() {
        let mut registry = ClassRegistry::new();
        registry.register(&BASE).unwrap();
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.class_names().count(), 0);
    }
}
