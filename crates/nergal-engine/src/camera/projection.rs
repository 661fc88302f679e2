use glam::Mat4;

/// Projection settings of a viewpoint.
///
/// Matrices follow wgpu clip conventions: right-handed view space looking down
/// -Z, depth mapped to `[0, 1]`. No validation happens here; a degenerate
/// configuration produces a non-invertible matrix, which the camera provider
/// reports.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians.
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        /// Half of the visible height in view-space units.
        half_height: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
}

impl Projection {
    /// Perspective projection with the field of view given in degrees.
    pub fn perspective_degrees(fov_y_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_deg.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective { fov_y, aspect, near, far } => {
                Mat4::perspective_rh(fov_y, aspect, near, far)
            }
            Projection::Orthographic { half_height, aspect, near, far } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }

    pub fn aspect(&self) -> f32 {
        match *self {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                aspect
            }
        }
    }

    pub fn set_aspect(&mut self, new_aspect: f32) {
        match self {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                *aspect = new_aspect;
            }
        }
    }
}

impl Default for Projection {
    fn default() -> Self {
        Projection::perspective_degrees(60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn perspective_maps_near_plane_to_depth_zero() {
        let p = Projection::perspective_degrees(90.0, 1.0, 0.5, 100.0).matrix();
        let clip = p * Vec4::new(0.0, 0.0, -0.5, 1.0);
        assert!((clip.z / clip.w).abs() < 1e-6);
    }

    #[test]
    fn orthographic_respects_aspect() {
        let p = Projection::Orthographic { half_height: 2.0, aspect: 2.0, near: 0.1, far: 10.0 }
            .matrix();
        let clip = p * Vec4::new(4.0, 2.0, -1.0, 1.0);
        assert!((clip.x - 1.0).abs() < 1e-6);
        assert!((clip.y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn set_aspect_keeps_other_fields() {
        let mut p = Projection::perspective_degrees(60.0, 1.0, 0.1, 50.0);
        p.set_aspect(1.5);
        assert_eq!(p, Projection::perspective_degrees(60.0, 1.5, 0.1, 50.0));
    }
}
