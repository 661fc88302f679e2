use std::sync::Arc;

use glam::Mat4;

use crate::error::{TraceError, TraceResult};

use super::{ViewTransforms, Viewpoint};

/// Matrices whose determinant is this small relative to the product of their
/// column lengths are treated as singular.
///
/// The ratio is 1 for orthogonal columns and does not change when the matrix
/// is scaled, so very large or very small scenes are judged alike.
const SINGULAR_RATIO: f64 = 1e-12;

/// Kernel inputs captured for one frame.
///
/// Built fresh every frame and consumed by a single dispatch.
#[derive(Debug)]
pub struct CameraFrameParameters<E> {
    /// Bound as `CameraToWorld`.
    pub camera_to_world: Mat4,

    /// Bound as `CameraInverseProjection`.
    pub inverse_projection: Mat4,

    /// Bound as `EnvironmentImage`.
    pub environment: Arc<E>,
}

/// Produces [`CameraFrameParameters`] from a borrowed viewpoint.
///
/// `E` is the backend's environment image type; the provider only hands out
/// references to it.
#[derive(Debug)]
pub struct CameraProvider<E> {
    environment: Arc<E>,
}

impl<E> CameraProvider<E> {
    pub fn new(environment: Arc<E>) -> Self {
        Self { environment }
    }

    pub fn environment(&self) -> &Arc<E> {
        &self.environment
    }

    /// Swaps the background image used from the next capture on.
    pub fn set_environment(&mut self, environment: Arc<E>) {
        self.environment = environment;
    }

    /// Reads the viewpoint once and derives the kernel inputs.
    ///
    /// Fails with `InvalidProjection` when the projection cannot be inverted;
    /// nothing is cached, so the next frame tries again with whatever the host
    /// has set by then.
    pub fn capture_frame_parameters<V>(&self, viewpoint: &V) -> TraceResult<CameraFrameParameters<E>>
    where
        V: Viewpoint + ?Sized,
    {
        let ViewTransforms { world_transform, projection } = viewpoint.transforms();
        let inverse_projection = invert_projection(projection)?;

        Ok(CameraFrameParameters {
            camera_to_world: world_transform,
            inverse_projection,
            environment: Arc::clone(&self.environment),
        })
    }
}

/// Inverts a 4x4 projection matrix.
///
/// The inverse is computed in double precision and narrowed afterwards, so
/// projections with a large far/near ratio keep their precision.
pub fn invert_projection(projection: Mat4) -> TraceResult<Mat4> {
    if !projection.is_finite() {
        return Err(TraceError::InvalidProjection(
            "projection matrix has non-finite entries".to_string(),
        ));
    }

    let projection = projection.as_dmat4();
    let det = projection.determinant();
    let volume = projection.x_axis.length()
        * projection.y_axis.length()
        * projection.z_axis.length()
        * projection.w_axis.length();
    if !det.is_finite() || volume == 0.0 || (det / volume).abs() < SINGULAR_RATIO {
        return Err(TraceError::InvalidProjection(format!(
            "projection matrix is singular (determinant {det:e})"
        )));
    }

    let inverse = projection.inverse().as_mat4();
    if !inverse.is_finite() {
        return Err(TraceError::InvalidProjection(
            "inverse projection overflows f32".to_string(),
        ));
    }

    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{Camera, Projection};
    use glam::{Vec3, Vec4};

    fn provider() -> CameraProvider<&'static str> {
        CameraProvider::new(Arc::new("sky"))
    }

    fn camera(projection: Projection) -> Camera {
        Camera::look_at(Vec3::new(0.0, 1.0, 4.0), Vec3::ZERO, Vec3::Y, projection)
    }

    fn bits(m: Mat4) -> [u32; 16] {
        m.to_cols_array().map(f32::to_bits)
    }

    // ── capture ───────────────────────────────────────────────────────────

    #[test]
    fn camera_to_world_is_the_world_transform() {
        let cam = camera(Projection::default());
        let params = provider().capture_frame_parameters(&cam).unwrap();
        assert_eq!(params.camera_to_world, cam.transform);
    }

    #[test]
    fn inverse_projection_undoes_projection() {
        let cam = camera(Projection::perspective_degrees(60.0, 16.0 / 9.0, 0.1, 1000.0));
        let params = provider().capture_frame_parameters(&cam).unwrap();
        let product = params.inverse_projection * cam.projection_matrix();
        assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn repeated_capture_is_bit_identical() {
        let cam = camera(Projection::default());
        let p = provider();
        let a = p.capture_frame_parameters(&cam).unwrap();
        let b = p.capture_frame_parameters(&cam).unwrap();
        assert_eq!(bits(a.camera_to_world), bits(b.camera_to_world));
        assert_eq!(bits(a.inverse_projection), bits(b.inverse_projection));
    }

    #[test]
    fn capture_shares_the_environment() {
        let p = provider();
        let params = p.capture_frame_parameters(&camera(Projection::default())).unwrap();
        assert!(Arc::ptr_eq(&params.environment, p.environment()));
    }

    #[test]
    fn center_pixel_unprojects_to_forward_ray() {
        let cam = camera(Projection::default());
        let params = provider().capture_frame_parameters(&Camera { transform: Mat4::IDENTITY, ..cam })
            .unwrap();
        let dir = (params.inverse_projection * Vec4::new(0.0, 0.0, 0.0, 1.0)).truncate();
        let dir = dir.normalize();
        assert!(dir.abs_diff_eq(Vec3::NEG_Z, 1e-5));
    }

    // ── degenerate projections ────────────────────────────────────────────

    #[test]
    fn zero_fov_is_invalid() {
        let cam = camera(Projection::Perspective { fov_y: 0.0, aspect: 1.0, near: 0.1, far: 100.0 });
        let err = provider().capture_frame_parameters(&cam).unwrap_err();
        assert!(matches!(err, TraceError::InvalidProjection(_)));
    }

    #[test]
    fn equal_near_far_is_invalid() {
        let cam = camera(Projection::Perspective { fov_y: 1.0, aspect: 1.0, near: 5.0, far: 5.0 });
        assert!(provider().capture_frame_parameters(&cam).is_err());
    }

    #[test]
    fn collapsed_orthographic_is_invalid() {
        let cam = camera(Projection::Orthographic { half_height: 0.0, aspect: 1.0, near: 0.1, far: 10.0 });
        assert!(provider().capture_frame_parameters(&cam).is_err());
    }

    #[test]
    fn zero_matrix_is_singular() {
        let err = invert_projection(Mat4::ZERO).unwrap_err();
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn rank_deficient_matrix_is_singular() {
        // Third column repeats the first.
        let m = Mat4::from_cols(
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 3.0, 0.0, 0.0),
            Vec4::new(2.0, 0.0, 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0, 1.0),
        );
        assert!(matches!(invert_projection(m), Err(TraceError::InvalidProjection(_))));
    }

    #[test]
    fn huge_orthographic_volume_is_invertible() {
        // Determinant is around 1e-25 but the matrix is well conditioned.
        let p = Projection::Orthographic { half_height: 1e8, aspect: 1.0, near: 0.1, far: 1e9 };
        let inv = invert_projection(p.matrix()).unwrap();
        assert!(inv.is_finite());
        assert!((inv * p.matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn tiny_orthographic_volume_is_invertible() {
        let p = Projection::Orthographic { half_height: 1e-4, aspect: 1.0, near: 1e-5, far: 1e-3 };
        let inv = invert_projection(p.matrix()).unwrap();
        assert!((inv * p.matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn orthographic_is_invertible() {
        let p = Projection::Orthographic { half_height: 5.0, aspect: 1.5, near: 0.1, far: 100.0 };
        let inv = invert_projection(p.matrix()).unwrap();
        assert!((inv * p.matrix()).abs_diff_eq(Mat4::IDENTITY, 1e-4));
    }
}
