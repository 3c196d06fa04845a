#![forbid(unsafe_code)]

//! 2D pan/zoom steering.
//!
//! Keeps a [`VisibleArea`] in data coordinates and sets the camera's
//! projection to an orthographic projection of it (view stays identity).
//!
//! - Scrolling zooms around the data point under the cursor. Holding the
//!   x (y) zoom key restricts the zoom to that axis.
//! - Dragging with the pan button moves the area with the cursor.
//!
//! Cursor positions are window pixels with the origin bottom-left, mapped to
//! data through the camera resolution.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{DVec2, Mat4};
use vizkit_core::events::PressedState;
use vizkit_core::input::{Action, Key, MouseButton};
use vizkit_core::Events;
use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle, Observable};

use super::{STEERING_PRIORITY, SteeringNode, SteeringSet, normalized_cursor};
use crate::camera::{Camera, PIXEL_SPACE_DEPTH, WeakCamera};
use crate::error::SteeringError;

/// Axis-aligned rectangle in data coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VisibleArea {
    pub origin: DVec2,
    pub size: DVec2,
}

impl VisibleArea {
    #[must_use]
    pub fn new(origin: DVec2, size: DVec2) -> Self {
        Self { origin, size }
    }

    #[must_use]
    pub fn from_corners(a: DVec2, b: DVec2) -> Self {
        let origin = a.min(b);
        Self {
            origin,
            size: a.max(b) - origin,
        }
    }

    #[must_use]
    pub fn max(&self) -> DVec2 {
        self.origin + self.size
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.size.is_finite() && self.size.x > 0.0 && self.size.y > 0.0
    }

    /// Data point at normalized position `t` (0..1 per axis).
    #[must_use]
    pub fn lerp(&self, t: DVec2) -> DVec2 {
        self.origin + t * self.size
    }

    /// Orthographic projection of this area.
    #[must_use]
    pub fn projection(&self) -> Mat4 {
        let min = self.origin.as_vec2();
        let max = self.max().as_vec2();
        Mat4::orthographic_rh_gl(
            min.x,
            max.x,
            min.y,
            max.y,
            -PIXEL_SPACE_DEPTH,
            PIXEL_SPACE_DEPTH,
        )
    }
}

/// Configuration of [`PanZoom`].
#[derive(Debug, Clone, PartialEq)]
pub struct PanZoomConfig {
    /// Fraction of the area removed per scroll step, in `(0, 1)`.
    pub zoom_speed: f64,
    pub pan_button: MouseButton,
    /// Smallest allowed extent of the area along either axis.
    pub min_extent: f64,
    /// Largest allowed extent of the area along either axis.
    pub max_extent: f64,
    /// While held, zoom only along x.
    pub x_zoom_key: Option<Key>,
    /// While held, zoom only along y.
    pub y_zoom_key: Option<Key>,
}

impl Default for PanZoomConfig {
    fn default() -> Self {
        Self {
            zoom_speed: 0.10,
            pan_button: MouseButton::Right,
            min_extent: 1e-9,
            max_extent: 1e12,
            x_zoom_key: Some(Key::Char('x')),
            y_zoom_key: Some(Key::Char('y')),
        }
    }
}

impl PanZoomConfig {
    #[must_use]
    pub fn zoom_speed(mut self, speed: f64) -> Self {
        self.zoom_speed = speed;
        self
    }

    #[must_use]
    pub fn pan_button(mut self, button: MouseButton) -> Self {
        self.pan_button = button;
        self
    }

    #[must_use]
    pub fn extent_limits(mut self, min: f64, max: f64) -> Self {
        self.min_extent = min;
        self.max_extent = max;
        self
    }

    #[must_use]
    pub fn axis_zoom_keys(mut self, x: Option<Key>, y: Option<Key>) -> Self {
        self.x_zoom_key = x;
        self.y_zoom_key = y;
        self
    }

    /// Check the configuration, describing the first problem found.
    ///
    /// # Errors
    ///
    /// A human-readable reason.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.zoom_speed > 0.0 && self.zoom_speed < 1.0) {
            return Err(format!("zoom_speed must be in (0, 1), got {}", self.zoom_speed));
        }
        if self.pan_button == MouseButton::None {
            return Err("pan_button must be a real button".to_string());
        }
        if !(self.min_extent > 0.0 && self.max_extent.is_finite() && self.min_extent < self.max_extent)
        {
            return Err(format!(
                "extent limits must satisfy 0 < min < max < inf, got [{}, {}]",
                self.min_extent, self.max_extent
            ));
        }
        Ok(())
    }
}

struct PanState {
    area: VisibleArea,
    /// Cursor position of the last drag step while the pan button is held.
    drag_anchor: Option<DVec2>,
}

/// 2D pan/zoom controller.
///
/// Cloning yields another handle to the same controller state.
#[derive(Clone)]
pub struct PanZoom {
    config: PanZoomConfig,
    state: Rc<RefCell<PanState>>,
}

impl std::fmt::Debug for PanZoom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PanZoom")
            .field("config", &self.config)
            .field("area", &self.area())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Scroll,
    Button,
    Drag,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Self::Scroll => "pan_zoom.scroll",
            Self::Button => "pan_zoom.button",
            Self::Drag => "pan_zoom.drag",
        }
    }
}

struct PanZoomNode {
    role: Role,
    controller: PanZoom,
}

impl PanZoom {
    #[must_use]
    pub fn new(area: VisibleArea) -> Self {
        Self::with_config(area, PanZoomConfig::default())
    }

    #[must_use]
    pub fn with_config(area: VisibleArea, config: PanZoomConfig) -> Self {
        Self {
            config,
            state: Rc::new(RefCell::new(PanState {
                area,
                drag_anchor: None,
            })),
        }
    }

    #[must_use]
    pub fn config(&self) -> &PanZoomConfig {
        &self.config
    }

    #[must_use]
    pub fn area(&self) -> VisibleArea {
        self.state.borrow().area
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.state.borrow().drag_anchor.is_some()
    }

    /// The control scheme: scroll, button and drag nodes sharing this
    /// controller's state.
    #[must_use]
    pub fn steering(&self) -> SteeringSet {
        [Role::Scroll, Role::Button, Role::Drag]
            .into_iter()
            .fold(SteeringSet::new(), |set, role| {
                set.with(PanZoomNode {
                    role,
                    controller: self.clone(),
                })
            })
    }

    /// Replace the visible area and push it to `camera`.
    ///
    /// # Errors
    ///
    /// Propagates a failing camera watcher.
    pub fn set_area(&self, camera: &Camera, area: VisibleArea) -> Result<(), ListenerError> {
        self.state.borrow_mut().area = area;
        camera.update_projection(area.projection())
    }

    fn check(&self, role: Role) -> Result<(), SteeringError> {
        self.config
            .validate()
            .map_err(|reason| SteeringError::invalid(role.name(), reason))?;
        let area = self.area();
        if !area.is_valid() {
            return Err(SteeringError::invalid(
                role.name(),
                format!("visible area must be finite and non-empty, got {area:?}"),
            ));
        }
        Ok(())
    }

    fn zoom(
        &self,
        camera: &Camera,
        cursor: DVec2,
        steps: f64,
        pressed: &PressedState,
    ) -> Result<bool, ListenerError> {
        let Some(t) = normalized_cursor(camera, cursor) else {
            return Ok(false);
        };
        let only_x = self.config.x_zoom_key.is_some_and(|k| pressed.is_key_pressed(k));
        let only_y = self.config.y_zoom_key.is_some_and(|k| pressed.is_key_pressed(k));
        let axes = match (only_x, only_y) {
            (true, false) => DVec2::new(1.0, 0.0),
            (false, true) => DVec2::new(0.0, 1.0),
            _ => DVec2::ONE,
        };

        let factor = (1.0 - self.config.zoom_speed).powf(steps);
        let area = {
            let mut state = self.state.borrow_mut();
            let old = state.area;
            let anchor = old.lerp(t);
            let per_axis = DVec2::ONE + (DVec2::splat(factor) - DVec2::ONE) * axes;
            let size = (old.size * per_axis).clamp(
                DVec2::splat(self.config.min_extent),
                DVec2::splat(self.config.max_extent),
            );
            state.area = VisibleArea::new(anchor - t * size, size);
            state.area
        };
        tracing::trace!(message = "pan_zoom.zoom", steps, ?area);
        camera.update_projection(area.projection())?;
        Ok(true)
    }

    fn drag(&self, camera: &Camera, cursor: DVec2) -> Result<bool, ListenerError> {
        let resolution = camera.resolution().get().as_dvec2();
        if resolution.x <= 0.0 || resolution.y <= 0.0 {
            return Ok(false);
        }
        let area = {
            let mut state = self.state.borrow_mut();
            let Some(anchor) = state.drag_anchor else {
                return Ok(false);
            };
            state.drag_anchor = Some(cursor);
            let delta = (cursor - anchor) / resolution * state.area.size;
            state.area.origin -= delta;
            state.area
        };
        camera.update_projection(area.projection())?;
        Ok(true)
    }
}

impl SteeringNode for PanZoomNode {
    fn name(&self) -> &str {
        self.role.name()
    }

    fn attach(&self, events: &Events, camera: &Camera) -> Result<ListenerHandle, SteeringError> {
        self.controller.check(self.role)?;
        let controller = self.controller.clone();
        let cam: WeakCamera = camera.downgrade();

        let handle = match self.role {
            Role::Scroll => {
                camera.update_view(Mat4::IDENTITY)?;
                camera.update_projection(controller.area().projection())?;
                let cursor: Observable<DVec2> = events.mouse_position.clone();
                let pressed = events.pressed_state();
                events.scroll.register(STEERING_PRIORITY, move |delta| {
                    let Some(camera) = cam.upgrade() else {
                        return Ok(Dispatch::Continue);
                    };
                    if delta.y == 0.0 {
                        return Ok(Dispatch::Continue);
                    }
                    let zoomed = controller.zoom(&camera, cursor.get(), delta.y, &pressed)?;
                    Ok(Dispatch::consume_if(zoomed))
                })
            }
            Role::Button => {
                let cursor: Observable<DVec2> = events.mouse_position.clone();
                let button = controller.config.pan_button;
                events.mouse_button.register(STEERING_PRIORITY, move |event| {
                    if event.button != button {
                        return Ok(Dispatch::Continue);
                    }
                    let Some(camera) = cam.upgrade() else {
                        return Ok(Dispatch::Continue);
                    };
                    let mut state = controller.state.borrow_mut();
                    match event.action {
                        Action::Press => {
                            let position = cursor.get();
                            if normalized_cursor(&camera, position).is_none() {
                                return Ok(Dispatch::Continue);
                            }
                            state.drag_anchor = Some(position);
                            Ok(Dispatch::Consume)
                        }
                        Action::Release => {
                            Ok(Dispatch::consume_if(state.drag_anchor.take().is_some()))
                        }
                        Action::Repeat => Ok(Dispatch::Continue),
                    }
                })
            }
            Role::Drag => events.mouse_position.register(STEERING_PRIORITY, move |position| {
                let Some(camera) = cam.upgrade() else {
                    return Ok(Dispatch::Continue);
                };
                Ok(Dispatch::consume_if(controller.drag(&camera, *position)?))
            }),
        };
        Ok(handle)
    }
}
