//! Pointer gestures acting on the overlay.
//!
//! One pointer drags the overlay across the view plane, two pointers pinch
//! its scale, the mouse wheel scales in coarser steps and a double tap asks
//! for the overlay to be placed again. Gestures only touch the overlay's
//! camera-local transform, never the camera pose.

use crate::config::GestureConfig;
use crate::types::{OverlayTransform, ScreenPoint};
use std::time::Instant;

/// The single active gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureState {
    Idle,
    Dragging {
        start_screen: ScreenPoint,
        /// Overlay (x, y) at the anchor; `None` when no overlay is placed.
        start_local: Option<(f64, f64)>,
        last_screen: ScreenPoint,
        /// False once the drag came out of a pinch.
        tap_candidate: bool,
    },
    Pinching {
        initial_distance: f64,
        baseline_scale: f64,
    },
}

/// What a pointer event did.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEvent {
    None = 0,
    Moved = 1,
    Scaled = 2,
    /// Two quick taps: place the overlay again.
    DoubleTap = 3,
}

pub struct GestureController {
    config: GestureConfig,
    fov_deg: f64,
    screen_height_px: f64,
    state: GestureState,
    last_tap: Option<Instant>,
}

impl GestureController {
    pub fn new(config: GestureConfig, fov_deg: f64, screen_height_px: f64) -> Self {
        Self {
            config,
            fov_deg,
            screen_height_px: screen_height_px.max(1.0),
            state: GestureState::Idle,
            last_tap: None,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, GestureState::Dragging { .. })
    }

    pub fn is_pinching(&self) -> bool {
        matches!(self.state, GestureState::Pinching { .. })
    }

    /// Track a viewport resize.
    pub fn resize(&mut self, screen_height_px: f64) {
        if screen_height_px.is_finite() && screen_height_px >= 1.0 {
            self.screen_height_px = screen_height_px;
        }
    }

    /// Local units per screen pixel at the overlay depth.
    ///
    /// The visible height at depth `d` under vertical FOV `f` is
    /// `2·d·tan(f/2)`; spreading it over the screen height keeps the overlay
    /// under the finger regardless of pixel density.
    pub fn screen_pixel_to_local(&self) -> f64 {
        let half_fov = self.fov_deg.to_radians() / 2.0;
        2.0 * self.config.overlay_depth * half_fov.tan() / self.screen_height_px
    }

    fn begin_drag(&mut self, at: ScreenPoint, overlay: Option<&OverlayTransform>, tap_candidate: bool) {
        self.state = GestureState::Dragging {
            start_screen: at,
            start_local: overlay.map(|o| (o.x, o.y)),
            last_screen: at,
            tap_candidate,
        };
    }

    fn begin_pinch(&mut self, a: ScreenPoint, b: ScreenPoint, overlay: Option<&OverlayTransform>) {
        let distance = a.distance(&b);
        self.state = match overlay {
            Some(o) if distance > 0.0 => GestureState::Pinching {
                initial_distance: distance,
                baseline_scale: o.scale,
            },
            // Coincident pointers give no baseline; keep the current gesture.
            Some(_) => return,
            None => GestureState::Idle,
        };
    }

    /// A pointer went down; `pointers` holds every active pointer.
    pub fn on_pointer_down(
        &mut self,
        pointers: &[ScreenPoint],
        overlay: Option<&OverlayTransform>,
    ) -> GestureEvent {
        match pointers {
            [] => {}
            [p] => {
                if !self.is_pinching() {
                    self.begin_drag(*p, overlay, true);
                }
            }
            [a, b, ..] => self.begin_pinch(*a, *b, overlay),
        }
        GestureEvent::None
    }

    /// Pointers moved.
    pub fn on_pointer_move(
        &mut self,
        pointers: &[ScreenPoint],
        overlay: Option<&mut OverlayTransform>,
    ) -> GestureEvent {
        let k = self.screen_pixel_to_local();
        let touch_scale = self.config.touch_scale;

        match (&mut self.state, pointers) {
            (
                GestureState::Dragging {
                    start_screen,
                    start_local,
                    last_screen,
                    ..
                },
                [p, ..],
            ) => {
                *last_screen = *p;
                let (Some((sx, sy)), Some(overlay)) = (*start_local, overlay) else {
                    return GestureEvent::None;
                };
                // Screen Y grows downward, local Y upward.
                overlay.x = sx + (p.x - start_screen.x) * k;
                overlay.y = sy - (p.y - start_screen.y) * k;
                GestureEvent::Moved
            }
            (
                GestureState::Pinching {
                    initial_distance,
                    baseline_scale,
                },
                [a, b, ..],
            ) => {
                let Some(overlay) = overlay else {
                    return GestureEvent::None;
                };
                let ratio = a.distance(b) / *initial_distance;
                overlay.scale = touch_scale.clamp(*baseline_scale * ratio);
                GestureEvent::Scaled
            }
            _ => GestureEvent::None,
        }
    }

    /// A pointer lifted; `remaining` holds the pointers still down.
    pub fn on_pointer_up(
        &mut self,
        remaining: &[ScreenPoint],
        overlay: Option<&OverlayTransform>,
        now: Instant,
    ) -> GestureEvent {
        match (self.state, remaining) {
            (
                GestureState::Dragging {
                    start_screen,
                    last_screen,
                    tap_candidate,
                    ..
                },
                [],
            ) => {
                self.state = GestureState::Idle;
                let slop = self.config.tap_slop_px;
                let is_tap = tap_candidate
                    && (last_screen.x - start_screen.x).abs() < slop
                    && (last_screen.y - start_screen.y).abs() < slop;
                if !is_tap {
                    self.last_tap = None;
                    return GestureEvent::None;
                }
                self.register_tap(now)
            }
            (GestureState::Pinching { .. }, [p]) => {
                // Re-anchor on the remaining finger and where the overlay is now.
                self.begin_drag(*p, overlay, false);
                GestureEvent::None
            }
            (GestureState::Pinching { .. }, [a, b, ..]) => {
                self.begin_pinch(*a, *b, overlay);
                GestureEvent::None
            }
            (_, []) => {
                self.state = GestureState::Idle;
                GestureEvent::None
            }
            _ => GestureEvent::None,
        }
    }

    fn register_tap(&mut self, now: Instant) -> GestureEvent {
        let window = self.config.double_tap_window;
        match self.last_tap.take() {
            Some(previous) if now.saturating_duration_since(previous) <= window => {
                log::debug!("Double tap");
                GestureEvent::DoubleTap
            }
            _ => {
                self.last_tap = Some(now);
                GestureEvent::None
            }
        }
    }

    /// Mouse wheel. Positive `delta_y` scrolls down and shrinks the overlay.
    pub fn on_wheel(&mut self, delta_y: f64, overlay: Option<&mut OverlayTransform>) -> GestureEvent {
        let Some(overlay) = overlay else {
            return GestureEvent::None;
        };
        if delta_y == 0.0 || !delta_y.is_finite() {
            return GestureEvent::None;
        }
        let factor = if delta_y > 0.0 {
            self.config.wheel_zoom_out
        } else {
            self.config.wheel_zoom_in
        };
        overlay.scale = self.config.wheel_scale.clamp(overlay.scale * factor);
        GestureEvent::Scaled
    }
}
