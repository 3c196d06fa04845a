#![forbid(unsafe_code)]

//! 3D orbit steering.
//!
//! The eye moves on a sphere around the look-at point:
//!
//! - dragging with the rotate button yaws around the world up axis and
//!   pitches around the camera's right axis, stopping short of the poles;
//! - scrolling dollies the eye toward or away from the look-at point;
//! - resolution changes keep the perspective aspect ratio current.
//!
//! Every change writes the view matrix, the projection matrix and the eye
//! position of the camera.

use std::cell::RefCell;
use std::rc::Rc;

use glam::{DVec2, Mat4, Quat, Vec3};
use vizkit_core::Events;
use vizkit_core::input::{Action, MouseButton};
use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle};

use super::{STEERING_PRIORITY, SteeringNode, SteeringSet, normalized_cursor};
use crate::camera::Camera;
use crate::error::SteeringError;

/// Closest the eye may get to the look-at point.
const MIN_DISTANCE: f32 = 1e-3;

/// Largest |cos| between view direction and up axis a pitch may reach.
const POLE_LIMIT: f32 = 0.995;

/// Configuration of [`Orbit`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitConfig {
    /// Radians per pixel of drag.
    pub rotation_speed: f32,
    /// Fraction of the distance removed per scroll step, in `(0, 1)`.
    pub zoom_speed: f32,
    pub rotate_button: MouseButton,
    /// Vertical field of view in radians.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub eye: Vec3,
    pub lookat: Vec3,
    pub up: Vec3,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            rotation_speed: 0.01,
            zoom_speed: 0.10,
            rotate_button: MouseButton::Left,
            fov: 45f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            eye: Vec3::splat(3.0),
            lookat: Vec3::ZERO,
            up: Vec3::Z,
        }
    }
}

impl OrbitConfig {
    #[must_use]
    pub fn rotation_speed(mut self, radians_per_pixel: f32) -> Self {
        self.rotation_speed = radians_per_pixel;
        self
    }

    #[must_use]
    pub fn zoom_speed(mut self, speed: f32) -> Self {
        self.zoom_speed = speed;
        self
    }

    #[must_use]
    pub fn rotate_button(mut self, button: MouseButton) -> Self {
        self.rotate_button = button;
        self
    }

    #[must_use]
    pub fn fov(mut self, radians: f32) -> Self {
        self.fov = radians;
        self
    }

    #[must_use]
    pub fn clip_planes(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    #[must_use]
    pub fn look(mut self, eye: Vec3, lookat: Vec3, up: Vec3) -> Self {
        self.eye = eye;
        self.lookat = lookat;
        self.up = up;
        self
    }

    /// # Errors
    ///
    /// A human-readable reason for the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.rotation_speed.is_finite() && self.rotation_speed > 0.0) {
            return Err(format!(
                "rotation_speed must be positive, got {}",
                self.rotation_speed
            ));
        }
        if !(self.zoom_speed > 0.0 && self.zoom_speed < 1.0) {
            return Err(format!("zoom_speed must be in (0, 1), got {}", self.zoom_speed));
        }
        if self.rotate_button == MouseButton::None {
            return Err("rotate_button must be a real button".to_string());
        }
        if !(self.fov > 0.0 && self.fov < std::f32::consts::PI) {
            return Err(format!("fov must be in (0, pi), got {}", self.fov));
        }
        if !(self.near > 0.0 && self.far > self.near && self.far.is_finite()) {
            return Err(format!(
                "clip planes must satisfy 0 < near < far, got {} and {}",
                self.near, self.far
            ));
        }
        if !(self.eye.is_finite() && self.lookat.is_finite()) {
            return Err("eye and lookat must be finite".to_string());
        }
        if self.eye.distance(self.lookat) < MIN_DISTANCE {
            return Err("eye and lookat must be distinct".to_string());
        }
        if self.up.length_squared() < 1e-12 {
            return Err("up must be non-zero".to_string());
        }
        if (self.eye - self.lookat).normalize().cross(self.up.normalize()).length() < 1e-6 {
            return Err("up must not be parallel to the view direction".to_string());
        }
        Ok(())
    }
}

struct OrbitState {
    eye: Vec3,
    lookat: Vec3,
    drag_anchor: Option<DVec2>,
}

/// 3D orbit controller.
///
/// Cloning yields another handle to the same controller state.
#[derive(Clone)]
pub struct Orbit {
    config: OrbitConfig,
    state: Rc<RefCell<OrbitState>>,
}

impl std::fmt::Debug for Orbit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("Orbit")
            .field("eye", &state.eye)
            .field("lookat", &state.lookat)
            .field("dragging", &state.drag_anchor.is_some())
            .finish()
    }
}

impl Default for Orbit {
    fn default() -> Self {
        Self::new(OrbitConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Resolution,
    Button,
    Drag,
    Scroll,
}

impl Role {
    fn name(self) -> &'static str {
        match self {
            Self::Resolution => "orbit.resolution",
            Self::Button => "orbit.button",
            Self::Drag => "orbit.drag",
            Self::Scroll => "orbit.scroll",
        }
    }
}

struct OrbitNode {
    role: Role,
    controller: Orbit,
}

impl Orbit {
    #[must_use]
    pub fn new(config: OrbitConfig) -> Self {
        let state = OrbitState {
            eye: config.eye,
            lookat: config.lookat,
            drag_anchor: None,
        };
        Self {
            config,
            state: Rc::new(RefCell::new(state)),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OrbitConfig {
        &self.config
    }

    #[must_use]
    pub fn eye(&self) -> Vec3 {
        self.state.borrow().eye
    }

    #[must_use]
    pub fn lookat(&self) -> Vec3 {
        self.state.borrow().lookat
    }

    #[must_use]
    pub fn distance(&self) -> f32 {
        let state = self.state.borrow();
        state.eye.distance(state.lookat)
    }

    /// The control scheme: resolution, button, drag and scroll nodes.
    #[must_use]
    pub fn steering(&self) -> SteeringSet {
        [Role::Resolution, Role::Button, Role::Drag, Role::Scroll]
            .into_iter()
            .fold(SteeringSet::new(), |set, role| {
                set.with(OrbitNode {
                    role,
                    controller: self.clone(),
                })
            })
    }

    /// Write view, projection and eye position to `camera`.
    ///
    /// # Errors
    ///
    /// Propagates a failing camera watcher.
    pub fn update_camera(&self, camera: &Camera) -> Result<(), ListenerError> {
        let (eye, lookat) = {
            let state = self.state.borrow();
            (state.eye, state.lookat)
        };
        let resolution = camera.resolution().get();
        let aspect = if resolution.x > 0.0 && resolution.y > 0.0 {
            resolution.x / resolution.y
        } else {
            1.0
        };
        camera.update_view(Mat4::look_at_rh(eye, lookat, self.config.up))?;
        camera.update_projection(Mat4::perspective_rh_gl(
            self.config.fov,
            aspect,
            self.config.near,
            self.config.far,
        ))?;
        camera.update_eye_position(eye)
    }

    /// Move the drag anchor to `cursor`, returning the previous anchor.
    /// `None` when no drag is in progress.
    fn advance_drag(&self, cursor: DVec2) -> Option<DVec2> {
        let mut state = self.state.borrow_mut();
        let anchor = state.drag_anchor?;
        state.drag_anchor = Some(cursor);
        Some(anchor)
    }

    /// Rotate by a drag of `delta` pixels.
    fn rotate(&self, delta: DVec2) {
        let up = self.config.up.normalize();
        let yaw = -(delta.x as f32) * self.config.rotation_speed;
        let pitch = -(delta.y as f32) * self.config.rotation_speed;

        let mut state = self.state.borrow_mut();
        let mut offset = Quat::from_axis_angle(up, yaw) * (state.eye - state.lookat);

        let right = (-offset).normalize_or_zero().cross(up).normalize_or_zero();
        if right.length_squared() > 1e-9 {
            let candidate = Quat::from_axis_angle(right, pitch) * offset;
            if candidate.normalize_or_zero().dot(up).abs() < POLE_LIMIT {
                offset = candidate;
            }
        }
        state.eye = state.lookat + offset;
    }

    /// Dolly by `steps` scroll steps; positive steps move closer.
    fn dolly(&self, steps: f64) {
        let factor = (1.0 - self.config.zoom_speed).powf(steps as f32);
        let mut state = self.state.borrow_mut();
        let offset = state.eye - state.lookat;
        let distance = (offset.length() * factor).max(MIN_DISTANCE);
        state.eye = state.lookat + offset.normalize_or_zero() * distance;
    }
}

impl SteeringNode for OrbitNode {
    fn name(&self) -> &str {
        self.role.name()
    }

    fn attach(&self, events: &Events, camera: &Camera) -> Result<ListenerHandle, SteeringError> {
        self.controller
            .config
            .validate()
            .map_err(|reason| SteeringError::invalid(self.role.name(), reason))?;
        let controller = self.controller.clone();
        let cam = camera.downgrade();

        let handle = match self.role {
            Role::Resolution => {
                controller.update_camera(camera)?;
                camera.resolution().register(STEERING_PRIORITY, move |_| {
                    if let Some(camera) = cam.upgrade() {
                        controller.update_camera(&camera)?;
                    }
                    Ok(Dispatch::Continue)
                })
            }
            Role::Button => {
                let cursor = events.mouse_position.clone();
                let button = controller.config.rotate_button;
                events.mouse_button.register(STEERING_PRIORITY, move |event| {
                    if event.button != button {
                        return Ok(Dispatch::Continue);
                    }
                    let mut state = controller.state.borrow_mut();
                    match event.action {
                        Action::Press => {
                            let position = cursor.get();
                            let inside = cam.upgrade().is_some_and(|camera| {
                                normalized_cursor(&camera, position).is_some()
                            });
                            if !inside {
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
                let Some(anchor) = controller.advance_drag(*position) else {
                    return Ok(Dispatch::Continue);
                };
                let Some(camera) = cam.upgrade() else {
                    return Ok(Dispatch::Continue);
                };
                controller.rotate(*position - anchor);
                controller.update_camera(&camera)?;
                Ok(Dispatch::Consume)
            }),
            Role::Scroll => events.scroll.register(STEERING_PRIORITY, move |delta| {
                if delta.y == 0.0 {
                    return Ok(Dispatch::Continue);
                }
                let Some(camera) = cam.upgrade() else {
                    return Ok(Dispatch::Continue);
                };
                controller.dolly(delta.y);
                controller.update_camera(&camera)?;
                Ok(Dispatch::Consume)
            }),
        };
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use vizkit_core::input::MouseButtonEvent;

    fn setup() -> (Events, Camera, Orbit) {
        let events = Events::new();
        let camera = Camera::with_resolution(200.0, 100.0);
        let orbit = Orbit::default();
        camera.attach_steering(&events, orbit.steering()).unwrap();
        (events, camera, orbit)
    }

    #[test]
    fn attach_writes_camera_state() {
        let (_events, camera, orbit) = setup();
        assert_eq!(camera.eye_position().get(), orbit.eye());
        let center = camera.project(orbit.lookat()).unwrap();
        assert!(center.abs_diff_eq(Vec2::new(100.0, 50.0), 1e-3));
        assert_eq!(camera.steering_count(), 4);
    }

    #[test]
    fn drag_rotates_keeping_distance() {
        let (events, camera, orbit) = setup();
        let distance = orbit.distance();
        let start = orbit.eye();
        events.mouse_position.set(DVec2::new(100.0, 50.0)).unwrap();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Left))
            .unwrap();
        events.mouse_position.set(DVec2::new(140.0, 60.0)).unwrap();

        assert!((orbit.distance() - distance).abs() < 1e-4);
        assert!(orbit.eye().distance(start) > 0.1);
        assert_eq!(camera.eye_position().get(), orbit.eye());
        let center = camera.project(Vec3::ZERO).unwrap();
        assert!(center.abs_diff_eq(Vec2::new(100.0, 50.0), 1e-3));
    }

    #[test]
    fn pitch_stops_short_of_pole() {
        let (events, _camera, orbit) = setup();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Left))
            .unwrap();
        for step in 1..200 {
            events
                .mouse_position
                .set(DVec2::new(0.0, -10.0 * f64::from(step)))
                .unwrap();
        }
        let dir = (orbit.eye() - orbit.lookat()).normalize();
        assert!(dir.dot(Vec3::Z).abs() < POLE_LIMIT);
    }

    #[test]
    fn press_outside_viewport_passes_through() {
        let (events, _camera, orbit) = setup();
        let below = Rc::new(RefCell::new(0));
        let hits = Rc::clone(&below);
        events.mouse_button.register(STEERING_PRIORITY - 1, move |_| {
            *hits.borrow_mut() += 1;
            Ok(Dispatch::Continue)
        });

        let start = orbit.eye();
        events.mouse_position.set(DVec2::new(250.0, 50.0)).unwrap();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Left))
            .unwrap();
        events.mouse_position.set(DVec2::new(150.0, 60.0)).unwrap();
        assert_eq!(*below.borrow(), 1);
        assert_eq!(orbit.eye(), start);

        events
            .mouse_button
            .set(MouseButtonEvent::release(MouseButton::Left))
            .unwrap();
        assert_eq!(*below.borrow(), 2);

        events.mouse_position.set(DVec2::new(100.0, 50.0)).unwrap();
        events
            .mouse_button
            .set(MouseButtonEvent::press(MouseButton::Left))
            .unwrap();
        assert_eq!(*below.borrow(), 2);
    }

    #[test]
    fn moving_without_button_does_not_rotate() {
        let (events, _camera, orbit) = setup();
        let start = orbit.eye();
        events.mouse_position.set(DVec2::new(10.0, 10.0)).unwrap();
        events.mouse_position.set(DVec2::new(90.0, 40.0)).unwrap();
        assert_eq!(orbit.eye(), start);
    }

    #[test]
    fn scroll_dollies() {
        let (events, camera, orbit) = setup();
        let before = orbit.distance();
        events.scroll.set(DVec2::new(0.0, 2.0)).unwrap();
        assert!((orbit.distance() - before * 0.81).abs() < 1e-4);
        assert_eq!(camera.eye_position().get(), orbit.eye());
    }

    #[test]
    fn resolution_change_updates_aspect() {
        let (_events, camera, _orbit) = setup();
        let wide = camera.projection().get();
        camera.update_resolution(100.0, 100.0).unwrap();
        let square = camera.projection().get();
        assert!((square.x_axis.x - wide.x_axis.x * 2.0).abs() < 1e-4);
    }

    #[test]
    fn parallel_up_is_invalid() {
        let config = OrbitConfig::default().look(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Z);
        assert!(config.validate().is_err());
        let err = Camera::new()
            .attach_steering(&Events::new(), Orbit::new(config).steering())
            .unwrap_err();
        assert!(matches!(err, SteeringError::InvalidConfig { .. }));
    }
}
