//! Spatial placement component
//!
//! Every entity carries a [`Transform`] in component slot 0; the scene graph
//! composes local matrices along the ancestor chain to produce world
//! matrices.

use std::any::Any;

use crate::core::object::{Object, ObjectMeta};
use crate::core::registry::{Registry, RegistryError};
use crate::foundation::math::{self, Mat4, Quat, Vec3};

use super::component::{Capabilities, Component, ComponentMeta};

/// Local position, rotation and scale relative to the parent entity
#[derive(Debug)]
pub struct Transform {
    meta: ComponentMeta,
    /// Local translation
    pub position: Vec3,
    /// Local rotation
    pub rotation: Quat,
    /// Local per-axis scale
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform registered with the instance database
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] when no identifier can be issued.
    pub fn new(registry: &Registry) -> Result<Self, RegistryError> {
        let mut transform = Self {
            meta: ComponentMeta::new("Transform"),
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        };
        registry.assign(&mut transform)?;
        Ok(transform)
    }

    /// Set the local position
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Set the local rotation
    #[must_use]
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the local scale
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Local transformation matrix: translate, then rotate, then scale
    #[must_use]
    pub fn local_matrix(&self) -> Mat4 {
        math::trs_matrix(&self.position, &self.rotation, &self.scale)
    }
}

impl Object for Transform {
    fn object_meta(&self) -> &ObjectMeta {
        self.meta.object()
    }

    fn object_meta_mut(&mut self) -> &mut ObjectMeta {
        self.meta.object_mut()
    }
}

impl Component for Transform {
    fn component_meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn component_meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::TRANSFORM
    }

    fn as_transform(&self) -> Option<&Transform> {
        Some(self)
    }

    fn as_transform_mut(&mut self) -> Option<&mut Transform> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Point3;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_is_identity() {
        let registry = Registry::new();
        let transform = Transform::new(&registry).unwrap();

        assert!(transform.instance_id().is_some());
        let p = transform
            .local_matrix()
            .transform_point(&Point3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 3.0);
    }

    #[test]
    fn test_builders_compose_into_matrix() {
        let registry = Registry::new();
        let transform = Transform::new(&registry)
            .unwrap()
            .with_position(Vec3::new(5.0, 0.0, 0.0))
            .with_scale(Vec3::new(2.0, 2.0, 2.0));

        let p = transform
            .local_matrix()
            .transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(p.x, 7.0); // scaled first, then translated
    }

    #[test]
    fn test_reports_transform_capability() {
        let registry = Registry::new();
        let transform = Transform::new(&registry).unwrap();
        assert!(transform.capabilities().contains(Capabilities::TRANSFORM));
        assert!(transform.as_transform().is_some());
    }
}
