//! Camera component
//!
//! A [`Camera`] carries a projection description and keeps the composed
//! projection matrix cached, refreshing it whenever the scene graph rebuilds.

use std::any::Any;

use log::debug;

use crate::core::object::{Object, ObjectMeta};
use crate::core::registry::{Registry, RegistryError};
use crate::foundation::math::{Mat4, Mat4Ext};

use super::component::{Capabilities, Component, ComponentMeta};

/// Projection kind and parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Perspective frustum; `fov_y` is the vertical field of view in radians
    Perspective {
        /// Vertical field of view in radians
        fov_y: f32,
        /// Width over height
        aspect: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
    /// Orthographic box described by half-extents
    Orthographic {
        /// Half of the box width
        half_width: f32,
        /// Half of the box height
        half_height: f32,
        /// Near clip distance
        near: f32,
        /// Far clip distance
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Self::Perspective {
            fov_y: 1.309,
            aspect: 16.0 / 9.0,
            near: 0.01,
            far: 100_000.0,
        }
    }
}

/// Projection-bearing component
pub struct Camera {
    meta: ComponentMeta,
    projection: Projection,
    projection_matrix: Mat4,
}

impl Camera {
    /// Create a camera with the default perspective projection
    ///
    /// # Errors
    ///
    /// Propagates [`RegistryError`] when no identifier can be issued.
    pub fn new(registry: &Registry) -> Result<Self, RegistryError> {
        let mut camera = Self {
            meta: ComponentMeta::new("Camera"),
            projection: Projection::default(),
            projection_matrix: Mat4::identity(),
        };
        camera.refresh_projection();
        registry.assign(&mut camera)?;
        Ok(camera)
    }

    /// Set the projection
    #[must_use]
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.set_projection(projection);
        self
    }

    /// The current projection description
    #[must_use]
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Replace the projection and recompose the cached matrix
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.refresh_projection();
    }

    /// The cached projection matrix
    #[must_use]
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_matrix
    }

    fn refresh_projection(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective(fov_y, aspect, near, far),
            Projection::Orthographic {
                half_width,
                half_height,
                near,
                far,
            } => Mat4::orthographic(half_width, half_height, near, far),
        };
    }
}

impl Object for Camera {
    fn object_meta(&self) -> &ObjectMeta {
        self.meta.object()
    }

    fn object_meta_mut(&mut self) -> &mut ObjectMeta {
        self.meta.object_mut()
    }
}

impl Component for Camera {
    fn component_meta(&self) -> &ComponentMeta {
        &self.meta
    }

    fn component_meta_mut(&mut self) -> &mut ComponentMeta {
        &mut self.meta
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::CAMERA | Capabilities::SCENE_LISTENER
    }

    fn on_scene_graph_update(&mut self) {
        self.refresh_projection();
        debug!("camera '{}': matrices refreshed", self.name());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
