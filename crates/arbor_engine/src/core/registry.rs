//! Instance database
//!
//! The [`Registry`] mints process-unique identifiers for engine objects and
//! tracks a registration record for each live id. It is the only component
//! allowed to issue or retire identifiers. A coarse read/write lock guards the
//! table so auxiliary threads (a signal handler, for instance) can safely
//! query it; all other engine state is single-threaded by design.

use std::collections::HashMap;
use std::sync::RwLock;

use log::{debug, warn};
use thiserror::Error;

use super::object::{InstanceId, Object};

/// Errors raised by identifier issuance and resolution
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The object already carries an identifier
    #[error("object already assigned id {0}")]
    AlreadyAssigned(InstanceId),

    /// Every identifier value is in use
    #[error("identifier space exhausted")]
    IdSpaceExhausted,

    /// No live object carries the identifier
    #[error("no object registered with id {0}")]
    IdNotFound(InstanceId),
}

/// Registration record kept per live identifier
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    name: String,
}

impl RegistryEntry {
    /// Name the object carried at registration time
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<InstanceId, RegistryEntry>,
    next: u32,
}

/// The instance database: issues and retires [`InstanceId`]s
///
/// Identifiers are allocated by a monotonic counter with linear probing past
/// ids still in use, so an id is never reissued while its object lives.
#[derive(Debug, Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a fresh identifier to an unassigned object
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyAssigned`] if the object already holds
    /// an id, and [`RegistryError::IdSpaceExhausted`] once every identifier
    /// value is live.
    pub fn assign<T: Object + ?Sized>(&self, object: &mut T) -> Result<InstanceId, RegistryError> {
        if let Some(id) = object.instance_id() {
            return Err(RegistryError::AlreadyAssigned(id));
        }

        let id = {
            let mut inner = self.inner.write().unwrap();
            if inner.entries.len() >= u32::MAX as usize {
                return Err(RegistryError::IdSpaceExhausted);
            }

            let id = Self::next_free(&mut inner);
            inner.entries.insert(
                id,
                RegistryEntry {
                    name: object.name().to_owned(),
                },
            );
            id
        };

        object.object_meta_mut().assign_id(id);
        debug!("registry: assigned {id} to '{}'", object.name());

        Ok(id)
    }

    /// Resolve an identifier to its registration record
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::IdNotFound`] for unknown or released ids.
    pub fn get(&self, id: InstanceId) -> Result<RegistryEntry, RegistryError> {
        self.inner
            .read()
            .unwrap()
            .entries
            .get(&id)
            .cloned()
            .ok_or(RegistryError::IdNotFound(id))
    }

    /// True if the identifier names a live object
    #[must_use]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.inner.read().unwrap().entries.contains_key(&id)
    }

    /// Retire a batch of identifiers
    ///
    /// Unknown ids are logged and skipped; releasing is never fatal.
    pub fn release(&self, ids: impl IntoIterator<Item = InstanceId>) {
        let mut inner = self.inner.write().unwrap();
        for id in ids {
            if inner.entries.remove(&id).is_some() {
                debug!("registry: released {id}");
            } else {
                warn!("registry: release of unknown id {id} skipped");
            }
        }
    }

    /// Run an owned object's release hook and retire its identifier
    ///
    /// The hook fires even for objects that never got an id assigned.
    pub fn release_object<T: Object + ?Sized>(&self, object: &mut T) {
        object.on_release();
        if let Some(id) = object.object_meta_mut().clear_id() {
            self.release(std::iter::once(id));
        } else {
            debug!("registry: '{}' released without an id", object.name());
        }
    }

    /// Drain every entry (process teardown)
    pub fn release_all(&self) {
        let mut inner = self.inner.write().unwrap();
        let drained = inner.entries.len();
        inner.entries.clear();
        debug!("registry: released all {drained} entries");
    }

    /// Number of live identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().unwrap().entries.len()
    }

    /// True when no identifiers are live
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_free(inner: &mut RegistryInner) -> InstanceId {
        loop {
            inner.next = inner.next.wrapping_add(1);
            let Some(id) = InstanceId::new(inner.next) else {
                continue; // counter wrapped through zero
            };
            if !inner.entries.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::object::ObjectMeta;

    struct Toy {
        meta: ObjectMeta,
        released: bool,
    }

    impl Toy {
        fn new(name: &str) -> Self {
            Self {
                meta: ObjectMeta::new(name),
                released: false,
            }
        }
    }

    impl Object for Toy {
        fn object_meta(&self) -> &ObjectMeta {
            &self.meta
        }

        fn object_meta_mut(&mut self) -> &mut ObjectMeta {
            &mut self.meta
        }

        fn on_release(&mut self) {
            self.released = true;
        }
    }

    #[test]
    fn test_assign_yields_distinct_ids() {
        let registry = Registry::new();
        let mut a = Toy::new("a");
        let mut b = Toy::new("b");

        let id_a = registry.assign(&mut a).unwrap();
        let id_b = registry.assign(&mut b).unwrap();

        assert_ne!(id_a, id_b);
        assert_eq!(a.instance_id(), Some(id_a));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_double_assign_fails() {
        let registry = Registry::new();
        let mut toy = Toy::new("t");
        registry.assign(&mut toy).unwrap();

        match registry.assign(&mut toy) {
            Err(RegistryError::AlreadyAssigned(id)) => assert_eq!(Some(id), toy.instance_id()),
            other => panic!("expected AlreadyAssigned, got {other:?}"),
        }
    }

    #[test]
    fn test_release_then_get_fails() {
        let registry = Registry::new();
        let mut a = Toy::new("a");
        let mut b = Toy::new("b");
        let id_a = registry.assign(&mut a).unwrap();
        let id_b = registry.assign(&mut b).unwrap();

        registry.release(std::iter::once(id_a));

        assert!(matches!(
            registry.get(id_a),
            Err(RegistryError::IdNotFound(_))
        ));
        assert_eq!(registry.get(id_b).unwrap().name(), "b");
    }

    #[test]
    fn test_release_unknown_id_is_skipped() {
        let registry = Registry::new();
        let mut toy = Toy::new("t");
        let id = registry.assign(&mut toy).unwrap();

        // An id that was never issued; must not disturb live entries.
        let bogus = InstanceId::new(0x00F0_0000).unwrap();
        registry.release([bogus, id]);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_object_runs_hook_and_clears_id() {
        let registry = Registry::new();
        let mut toy = Toy::new("t");
        let id = registry.assign(&mut toy).unwrap();

        registry.release_object(&mut toy);

        assert!(toy.released);
        assert_eq!(toy.instance_id(), None);
        assert!(!registry.contains(id));
    }

    #[test]
    fn test_release_all_drains() {
        let registry = Registry::new();
        let mut a = Toy::new("a");
        let mut b = Toy::new("b");
        registry.assign(&mut a).unwrap();
        registry.assign(&mut b).unwrap();

        registry.release_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_id_not_reused_while_alive() {
        let registry = Registry::new();
        let mut toys: Vec<Toy> = (0..16).map(|i| Toy::new(&format!("t{i}"))).collect();
        let mut seen = std::collections::HashSet::new();
        for toy in &mut toys {
            assert!(seen.insert(registry.assign(toy).unwrap()));
        }
    }
}
