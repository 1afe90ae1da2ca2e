//! Identified object model
//!
//! Everything the engine tracks — entities and their components — carries an
//! [`ObjectMeta`] and presents the [`Object`] surface. Instance identifiers are
//! minted exclusively by the [`Registry`](crate::core::Registry); an object is
//! created unassigned and holds its identifier until released.

use std::fmt;
use std::num::NonZeroU32;

/// A process-unique object identifier
///
/// Identifiers are opaque 32-bit values. The zero value never names a live
/// object; unassigned state is modeled as the absence of an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(NonZeroU32);

impl InstanceId {
    /// Wrap a raw identifier value, rejecting zero
    #[must_use]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// The raw identifier value
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0.get())
    }
}

/// Identity fields shared by every engine object
///
/// Embed one of these in a type and hand it out through [`Object::object_meta`]
/// to participate in registry assignment and release.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    id: Option<InstanceId>,
    name: String,
}

impl ObjectMeta {
    /// Create metadata for an unassigned object
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }

    /// The assigned identifier, if any
    #[must_use]
    pub fn id(&self) -> Option<InstanceId> {
        self.id
    }

    /// The object's name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the object
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_owned();
    }

    /// Format as `Kind(name id)` for logs
    #[must_use]
    pub fn describe(&self, kind: &str) -> String {
        match self.id {
            Some(id) => format!("{kind}({} {id})", self.name),
            None => format!("{kind}({} --------)", self.name),
        }
    }

    pub(crate) fn assign_id(&mut self, id: InstanceId) {
        debug_assert!(self.id.is_none(), "identifier assigned twice");
        self.id = Some(id);
    }

    pub(crate) fn clear_id(&mut self) -> Option<InstanceId> {
        self.id.take()
    }
}

impl fmt::Display for ObjectMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe("Object"))
    }
}

/// Surface shared by every registrable engine object
pub trait Object {
    /// Borrow the object's identity fields
    fn object_meta(&self) -> &ObjectMeta;

    /// Mutably borrow the object's identity fields
    fn object_meta_mut(&mut self) -> &mut ObjectMeta;

    /// The assigned identifier, if any
    fn instance_id(&self) -> Option<InstanceId> {
        self.object_meta().id()
    }

    /// The object's name
    fn name(&self) -> &str {
        self.object_meta().name()
    }

    /// Rename the object
    fn set_name(&mut self, name: &str) {
        self.object_meta_mut().set_name(name);
    }

    /// Resource-release hook, run once as the object is retired
    fn on_release(&mut self) {}
}
