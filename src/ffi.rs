//! C FFI layer for arsticker.
//!
//! Exposes the pose manager, the gesture controller and the CPU chroma-key
//! rule as an opaque handle-based API, for hosts that own the render loop
//! themselves. The generated C header is written to `include/arsticker.h`
//! by cbindgen.

use crate::camera_pose::CameraPoseManager;
use crate::chroma::{self, ChromaKeyParams};
use crate::config::{GestureConfig, PoseConfig};
use crate::error::LastError;
use crate::gesture::{GestureController, GestureEvent};
use crate::types::{OrientationEvent, OverlayTransform, ScreenPoint, TrackingMode, ViewEstimate};
use std::ffi::{c_char, c_int, CStr};
use std::time::{Duration, Instant};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque camera pose manager handle for C consumers.
pub struct ArPoseManager(CameraPoseManager);

/// Opaque gesture controller handle for C consumers.
pub struct ArGesture {
    controller: GestureController,
    /// Host timestamps are milliseconds since this instant.
    epoch: Instant,
}

/// Camera pose in C-compatible layout.
#[repr(C)]
pub struct ArPose {
    /// Position [x, y, z] in world units.
    pub position: [f64; 3],
    /// Orientation quaternion [qx, qy, qz, qw].
    pub quaternion: [f64; 4],
}

fn mode_from_int(mode: c_int) -> TrackingMode {
    match mode {
        1 => TrackingMode::Slam,
        2 => TrackingMode::Hybrid,
        _ => TrackingMode::Sensor,
    }
}

unsafe fn points<'a>(ptr: *const ScreenPoint, count: c_int) -> &'a [ScreenPoint] {
    if ptr.is_null() || count <= 0 {
        return &[];
    }
    std::slice::from_raw_parts(ptr, count as usize)
}

/// Parse a tracking mode name (`sensor`, `slam`, `hybrid`).
/// Returns the mode as 0/1/2, or -1 on error (check ar_last_error()).
///
/// # Safety
/// `name` must be a null-terminated string, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_tracking_mode_parse(name: *const c_char) -> c_int {
    if name.is_null() {
        return -1;
    }
    let name = CStr::from_ptr(name).to_string_lossy();
    match name.parse::<TrackingMode>() {
        Ok(mode) => {
            LAST_ERROR.clear();
            mode as c_int
        }
        Err(e) => {
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Create a pose manager.
/// `smoothing_factor` in (0, 1]; values outside fall back to the default.
#[no_mangle]
pub extern "C" fn ar_pose_manager_new(smoothing_factor: f64) -> *mut ArPoseManager {
    let mut config = PoseConfig::default();
    if smoothing_factor > 0.0 && smoothing_factor <= 1.0 {
        config.smoothing_factor = smoothing_factor;
    }
    Box::into_raw(Box::new(ArPoseManager(CameraPoseManager::new(&config))))
}

/// Free a pose manager.
///
/// # Safety
/// `mgr` must be a pointer returned by `ar_pose_manager_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_manager_free(mgr: *mut ArPoseManager) {
    if !mgr.is_null() {
        drop(Box::from_raw(mgr));
    }
}

/// Start a new tick. `mode`: 0 = Sensor, 1 = Slam, 2 = Hybrid.
///
/// # Safety
/// `mgr` must be a valid pose manager pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_begin_tick(mgr: *mut ArPoseManager, mode: c_int) {
    if mgr.is_null() {
        return;
    }
    (*mgr).0.begin_tick(mode_from_int(mode));
}

/// Apply device orientation angles in degrees. A NaN `alpha` marks the
/// sample as unavailable. Returns true when the pose was written.
///
/// # Safety
/// `mgr` must be a valid pose manager pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_apply_orientation(
    mgr: *mut ArPoseManager,
    alpha: f64,
    beta: f64,
    gamma: f64,
    screen_orientation_deg: f64,
) -> bool {
    if mgr.is_null() {
        return false;
    }
    let Some(sample) = OrientationEvent::new(alpha, beta, gamma).sample() else {
        return false;
    };
    (*mgr).0.apply_device_orientation(sample, screen_orientation_deg)
}

/// Apply a VO result: a column-major 4x4 view matrix (16 elements).
/// Returns true when the pose was written.
///
/// # Safety
/// `mgr` must be a valid pose manager pointer, or null. `view_matrix` must
/// point to 16 doubles, or be null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_apply_view_matrix(
    mgr: *mut ArPoseManager,
    view_matrix: *const f64,
    tracking: bool,
    feature_count: u32,
) -> bool {
    if mgr.is_null() || view_matrix.is_null() {
        return false;
    }
    let mut matrix = [0.0; 16];
    matrix.copy_from_slice(std::slice::from_raw_parts(view_matrix, 16));
    let estimate = ViewEstimate {
        view_matrix: matrix,
        tracking,
        feature_count,
    };
    (*mgr).0.apply_view_estimate(&estimate, true)
}

/// Clear the reference orientation and smoothing history.
///
/// # Safety
/// `mgr` must be a valid pose manager pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_reset(mgr: *mut ArPoseManager) {
    if !mgr.is_null() {
        (*mgr).0.reset();
    }
}

/// Read the current camera pose. Returns 0 on success, -1 on null input.
///
/// # Safety
/// `mgr` and `out` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_pose_get(mgr: *const ArPoseManager, out: *mut ArPose) -> c_int {
    if mgr.is_null() || out.is_null() {
        return -1;
    }
    let pose = (*mgr).0.pose();
    let q = pose.orientation.quaternion();
    out.write(ArPose {
        position: [pose.position.x, pose.position.y, pose.position.z],
        quaternion: [q.i, q.j, q.k, q.w],
    });
    0
}

/// Create a gesture controller with default clamps.
#[no_mangle]
pub extern "C" fn ar_gesture_new(fov_deg: f64, screen_height_px: f64) -> *mut ArGesture {
    Box::into_raw(Box::new(ArGesture {
        controller: GestureController::new(GestureConfig::default(), fov_deg, screen_height_px),
        epoch: Instant::now(),
    }))
}

/// Free a gesture controller.
///
/// # Safety
/// `gesture` must be a pointer returned by `ar_gesture_new`, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_free(gesture: *mut ArGesture) {
    if !gesture.is_null() {
        drop(Box::from_raw(gesture));
    }
}

/// Viewport height changed.
///
/// # Safety
/// `gesture` must be a valid gesture pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_resize(gesture: *mut ArGesture, screen_height_px: f64) {
    if !gesture.is_null() {
        (*gesture).controller.resize(screen_height_px);
    }
}

/// Pointer down. `points` holds every active pointer. Returns a
/// `GestureEvent` code.
///
/// # Safety
/// `gesture` must be valid or null; `points` must hold `count` elements or
/// be null; `overlay` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_pointer_down(
    gesture: *mut ArGesture,
    points_ptr: *const ScreenPoint,
    count: c_int,
    overlay: *const OverlayTransform,
) -> c_int {
    if gesture.is_null() {
        return GestureEvent::None as c_int;
    }
    (*gesture)
        .controller
        .on_pointer_down(points(points_ptr, count), overlay.as_ref()) as c_int
}

/// Pointer move. Updates `overlay` in place.
///
/// # Safety
/// Same as `ar_gesture_pointer_down`; `overlay` must be writable.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_pointer_move(
    gesture: *mut ArGesture,
    points_ptr: *const ScreenPoint,
    count: c_int,
    overlay: *mut OverlayTransform,
) -> c_int {
    if gesture.is_null() {
        return GestureEvent::None as c_int;
    }
    (*gesture)
        .controller
        .on_pointer_move(points(points_ptr, count), overlay.as_mut()) as c_int
}

/// Pointer up. `remaining` holds the pointers still down; `timestamp_ms` is
/// milliseconds since the controller was created.
///
/// # Safety
/// Same as `ar_gesture_pointer_down`.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_pointer_up(
    gesture: *mut ArGesture,
    remaining: *const ScreenPoint,
    count: c_int,
    overlay: *const OverlayTransform,
    timestamp_ms: f64,
) -> c_int {
    if gesture.is_null() {
        return GestureEvent::None as c_int;
    }
    let gesture = &mut *gesture;
    let offset = if timestamp_ms.is_finite() && timestamp_ms > 0.0 {
        Duration::from_secs_f64(timestamp_ms / 1000.0)
    } else {
        Duration::ZERO
    };
    gesture
        .controller
        .on_pointer_up(points(remaining, count), overlay.as_ref(), gesture.epoch + offset)
        as c_int
}

/// Mouse wheel. Updates `overlay` in place.
///
/// # Safety
/// `gesture` and `overlay` must be valid pointers, or null.
#[no_mangle]
pub unsafe extern "C" fn ar_gesture_wheel(
    gesture: *mut ArGesture,
    delta_y: f64,
    overlay: *mut OverlayTransform,
) -> c_int {
    if gesture.is_null() {
        return GestureEvent::None as c_int;
    }
    (*gesture).controller.on_wheel(delta_y, overlay.as_mut()) as c_int
}

/// Chroma-key output alpha for one RGB pixel in [0, 1].
/// Null `params` uses the default green key.
///
/// # Safety
/// `params` must point to a valid `ChromaKeyParams`, or be null.
#[no_mangle]
pub unsafe extern "C" fn ar_chroma_key_alpha(
    r: f32,
    g: f32,
    b: f32,
    source_alpha: f32,
    params: *const ChromaKeyParams,
) -> f32 {
    let params = params.as_ref().copied().unwrap_or_default();
    chroma::chroma_key_alpha([r, g, b], source_alpha, &params)
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next arsticker API call.
#[no_mangle]
pub extern "C" fn ar_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
