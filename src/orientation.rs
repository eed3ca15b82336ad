//! Conversions from raw pose source outputs to camera rotations.
//!
//! Device orientation angles follow the W3C DeviceOrientation frame (Z up out
//! of the screen, alpha/beta/gamma intrinsic Z-X'-Y''). The render camera
//! follows the usual GL convention: looking down -Z with +Y up.

use crate::types::CameraPose;
use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};

/// Below this, a column of the view matrix is treated as degenerate.
const MIN_AXIS_SCALE: f64 = 1e-9;

/// Rotation taking the device frame to camera frame: the camera looks out
/// of the back of the device, not its top edge.
fn back_camera_correction() -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f64::consts::FRAC_PI_2)
}

/// Convert device orientation angles (degrees) to a camera orientation.
///
/// Euler composition is YXZ with (pitch = beta, yaw = alpha, roll = -gamma),
/// followed by the back-camera correction and a rotation of
/// `-screen_orientation_deg` about the view axis for rotated screens.
pub fn device_orientation_to_quaternion(
    alpha_deg: f64,
    beta_deg: f64,
    gamma_deg: f64,
    screen_orientation_deg: f64,
) -> UnitQuaternion<f64> {
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), alpha_deg.to_radians());
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), beta_deg.to_radians());
    let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -gamma_deg.to_radians());
    let screen = UnitQuaternion::from_axis_angle(
        &Vector3::z_axis(),
        -screen_orientation_deg.to_radians(),
    );

    yaw * pitch * roll * back_camera_correction() * screen
}

/// Decompose a column-major world-to-camera view matrix into the camera's
/// world pose.
///
/// Returns `None` when the matrix is not finite or not invertible. Any scale
/// in the upper 3x3 block is divided out before extracting the rotation.
pub fn pose_from_view_matrix(view: &[f64; 16]) -> Option<CameraPose> {
    if view.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let view = Matrix4::from_column_slice(view);
    let world = view.try_inverse()?;

    let position = Vector3::new(world[(0, 3)], world[(1, 3)], world[(2, 3)]);

    let mut basis: Matrix3<f64> = world.fixed_view::<3, 3>(0, 0).into_owned();
    for mut column in basis.column_iter_mut() {
        let norm = column.norm();
        if norm < MIN_AXIS_SCALE {
            return None;
        }
        column /= norm;
    }

    let rotation = Rotation3::from_matrix(&basis);
    Some(CameraPose {
        position,
        orientation: UnitQuaternion::from_rotation_matrix(&rotation),
    })
}

/// Build a column-major view matrix for a camera at `pose`. Inverse of
/// [`pose_from_view_matrix`] for rigid poses.
pub fn view_matrix_from_pose(pose: &CameraPose) -> [f64; 16] {
    let world = nalgebra::Isometry3::from_parts(pose.position.into(), pose.orientation);
    let view = world.inverse().to_homogeneous();
    let mut out = [0.0; 16];
    out.copy_from_slice(view.as_slice());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_between(a: &UnitQuaternion<f64>, b: &UnitQuaternion<f64>) -> f64 {
        a.angle_to(b)
    }

    #[test]
    fn test_upright_device_looks_forward() {
        // Phone held upright (beta = 90) facing the initial azimuth.
        let q = device_orientation_to_quaternion(0.0, 90.0, 0.0, 0.0);
        assert!(angle_between(&q, &UnitQuaternion::identity()) < 1e-9);
    }

    #[test]
    fn test_flat_device_looks_down() {
        let q = device_orientation_to_quaternion(0.0, 0.0, 0.0, 0.0);
        let forward = q * Vector3::new(0.0, 0.0, -1.0);
        assert!((forward - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_yaw_turns_view_about_world_up() {
        let q = device_orientation_to_quaternion(90.0, 90.0, 0.0, 0.0);
        let forward = q * Vector3::new(0.0, 0.0, -1.0);
        // Positive alpha is a counter-clockwise turn seen from above.
        assert!((forward - Vector3::new(-1.0, 0.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn test_screen_rotation_rolls_about_view_axis() {
        let upright = device_orientation_to_quaternion(0.0, 90.0, 0.0, 0.0);
        let landscape = device_orientation_to_quaternion(0.0, 90.0, 0.0, 90.0);
        let forward_a = upright * Vector3::new(0.0, 0.0, -1.0);
        let forward_b = landscape * Vector3::new(0.0, 0.0, -1.0);
        assert!((forward_a - forward_b).norm() < 1e-9);
        assert!((angle_between(&upright, &landscape) - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_view_matrix_translation_only() {
        // World-to-camera for a camera sitting at (1, 2, 3).
        let mut view = [0.0; 16];
        view[0] = 1.0;
        view[5] = 1.0;
        view[10] = 1.0;
        view[15] = 1.0;
        view[12] = -1.0;
        view[13] = -2.0;
        view[14] = -3.0;

        let pose = pose_from_view_matrix(&view).unwrap();
        assert!((pose.position - Vector3::new(1.0, 2.0, 3.0)).norm() < 1e-12);
        assert!(pose.orientation.angle() < 1e-12);
    }

    #[test]
    fn test_view_matrix_recovers_rigid_pose() {
        let pose = CameraPose {
            position: Vector3::new(0.5, -0.25, 2.0),
            orientation: UnitQuaternion::from_euler_angles(0.1, -0.4, 0.7),
        };
        let view = view_matrix_from_pose(&pose);
        let back = pose_from_view_matrix(&view).unwrap();
        assert!((back.position - pose.position).norm() < 1e-9);
        assert!(back.orientation.angle_to(&pose.orientation) < 1e-9);
    }

    #[test]
    fn test_degenerate_view_matrix_rejected() {
        assert!(pose_from_view_matrix(&[0.0; 16]).is_none());
        let mut nan = [0.0; 16];
        nan[0] = f64::NAN;
        assert!(pose_from_view_matrix(&nan).is_none());
    }
}
