use std::sync::{PoisonError, RwLock};

use glam::{Mat4, Vec3};

use super::Projection;

/// Both transforms of a viewpoint, read at one moment.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewTransforms {
    /// Camera-to-world transform.
    pub world_transform: Mat4,
    pub projection: Mat4,
}

/// Read-only access to a host-owned viewpoint.
pub trait Viewpoint {
    /// Camera-to-world transform (camera local space looks down -Z).
    fn world_transform(&self) -> Mat4;

    /// View-to-clip projection matrix.
    fn projection_matrix(&self) -> Mat4;

    /// Reads both transforms as one snapshot.
    ///
    /// The default reads them one after the other. Hosts whose viewpoint can be
    /// written concurrently override this to read both under one guard.
    fn transforms(&self) -> ViewTransforms {
        ViewTransforms {
            world_transform: self.world_transform(),
            projection: self.projection_matrix(),
        }
    }
}

impl<V: Viewpoint + ?Sized> Viewpoint for &V {
    fn world_transform(&self) -> Mat4 {
        (**self).world_transform()
    }

    fn projection_matrix(&self) -> Mat4 {
        (**self).projection_matrix()
    }

    fn transforms(&self) -> ViewTransforms {
        (**self).transforms()
    }
}

/// A viewpoint shared with a writer thread.
///
/// A poisoned lock still yields the last written state; the writer panicking
/// mid-update cannot leave a torn `Mat4` behind since writes are whole values.
impl<V: Viewpoint> Viewpoint for RwLock<V> {
    fn world_transform(&self) -> Mat4 {
        self.read().unwrap_or_else(PoisonError::into_inner).world_transform()
    }

    fn projection_matrix(&self) -> Mat4 {
        self.read().unwrap_or_else(PoisonError::into_inner).projection_matrix()
    }

    fn transforms(&self) -> ViewTransforms {
        self.read().unwrap_or_else(PoisonError::into_inner).transforms()
    }
}

/// Plain camera: a camera-to-world transform plus projection settings.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub transform: Mat4,
    pub projection: Projection,
}

impl Camera {
    pub fn new(transform: Mat4, projection: Projection) -> Self {
        Self { transform, projection }
    }

    /// Places the camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3, projection: Projection) -> Self {
        Self {
            transform: Mat4::look_at_rh(eye, target, up).inverse(),
            projection,
        }
    }

    /// Updates the projection aspect, e.g. after a resize.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection.set_aspect(aspect);
    }

    /// Camera position in world space.
    pub fn position(&self) -> Vec3 {
        self.transform.w_axis.truncate()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Projection::default())
    }
}

impl Viewpoint for Camera {
    fn world_transform(&self) -> Mat4 {
        self.transform
    }

    fn projection_matrix(&self) -> Mat4 {
        self.projection.matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn look_at_places_camera_at_eye() {
        let eye = Vec3::new(3.0, 2.0, 5.0);
        let cam = Camera::look_at(eye, Vec3::ZERO, Vec3::Y, Projection::default());
        assert!(cam.position().abs_diff_eq(eye, 1e-5));
    }

    #[test]
    fn look_at_forward_points_at_target() {
        let cam = Camera::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y, Projection::default());
        let forward = cam.transform.transform_vector3(Vec3::NEG_Z);
        assert!(forward.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    #[test]
    fn locked_viewpoint_reads_inner_camera() {
        let cam = Camera::look_at(Vec3::new(1.0, 1.0, 1.0), Vec3::ZERO, Vec3::Y, Projection::default());
        let shared = RwLock::new(cam);
        assert_eq!(shared.transforms(), cam.transforms());
    }
}
