#![forbid(unsafe_code)]

//! Camera matrices and the steering attachment point.
//!
//! A [`Camera`] owns observable view, projection and resolution cells and
//! keeps two derived cells current through system-tier listeners:
//!
//! - `projection_view = projection * view`
//! - `pixel_space`, an orthographic projection mapping pixel coordinates
//!   (origin bottom-left) to clip space for the current resolution
//!
//! Interactive behavior lives in steering nodes (see [`crate::steering`]).
//! The camera owns the listener handles its steering set registered and
//! tears them down as a unit.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use glam::{Mat4, Vec2, Vec3};
use vizkit_core::Events;
use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle, Observable};

use crate::error::SteeringError;
use crate::steering::SteeringSet;

/// Near/far planes of the pixel-space projection.
pub const PIXEL_SPACE_DEPTH: f32 = 10_000.0;

struct CameraCells {
    view: Observable<Mat4>,
    projection: Observable<Mat4>,
    projection_view: Observable<Mat4>,
    pixel_space: Observable<Mat4>,
    resolution: Observable<Vec2>,
    eye_position: Observable<Vec3>,
    steering: RefCell<Vec<ListenerHandle>>,
}

impl CameraCells {
    fn refresh_projection_view(&self) -> Result<(), ListenerError> {
        self.projection_view
            .set(self.projection.get() * self.view.get())
    }

    fn refresh_pixel_space(&self, resolution: Vec2) -> Result<(), ListenerError> {
        self.pixel_space.set(pixel_space_matrix(resolution))
    }
}

fn pixel_space_matrix(resolution: Vec2) -> Mat4 {
    if resolution.x <= 0.0 || resolution.y <= 0.0 {
        return Mat4::IDENTITY;
    }
    Mat4::orthographic_rh_gl(
        0.0,
        resolution.x,
        0.0,
        resolution.y,
        -PIXEL_SPACE_DEPTH,
        PIXEL_SPACE_DEPTH,
    )
}

/// View/projection state of a scene.
///
/// Cloning yields another handle to the same camera.
#[derive(Clone)]
pub struct Camera {
    cells: Rc<CameraCells>,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Camera")
            .field("resolution", &self.cells.resolution.get())
            .field("eye_position", &self.cells.eye_position.get())
            .field("steering", &self.steering_count())
            .finish()
    }
}

impl Camera {
    /// Identity view and projection, zero resolution.
    #[must_use]
    pub fn new() -> Self {
        Self::with_resolution(0.0, 0.0)
    }

    /// Camera with the given resolution in pixels.
    #[must_use]
    pub fn with_resolution(width: f32, height: f32) -> Self {
        let resolution = Vec2::new(width, height);
        let cells = Rc::new(CameraCells {
            view: Observable::new(Mat4::IDENTITY),
            projection: Observable::new(Mat4::IDENTITY),
            projection_view: Observable::new(Mat4::IDENTITY),
            pixel_space: Observable::new(pixel_space_matrix(resolution)),
            resolution: Observable::new(resolution),
            eye_position: Observable::new(Vec3::Z),
            steering: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&cells);
        cells.view.register_system(0, refresh(&weak));
        cells.projection.register_system(0, refresh(&weak));
        let weak_res = Rc::downgrade(&cells);
        cells.resolution.register_system(0, move |res: &Vec2| {
            if let Some(cells) = weak_res.upgrade() {
                cells.refresh_pixel_space(*res)?;
            }
            Ok(Dispatch::Continue)
        });

        Self { cells }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cells, &other.cells)
    }

    /// A handle that does not keep the camera alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakCamera {
        WeakCamera(Rc::downgrade(&self.cells))
    }

    // -- cells ----------------------------------------------------------

    #[must_use]
    pub fn view(&self) -> &Observable<Mat4> {
        &self.cells.view
    }

    #[must_use]
    pub fn projection(&self) -> &Observable<Mat4> {
        &self.cells.projection
    }

    /// `projection * view`, kept current.
    #[must_use]
    pub fn projection_view(&self) -> &Observable<Mat4> {
        &self.cells.projection_view
    }

    /// Pixel coordinates to clip space, kept current with the resolution.
    #[must_use]
    pub fn pixel_space(&self) -> &Observable<Mat4> {
        &self.cells.pixel_space
    }

    #[must_use]
    pub fn resolution(&self) -> &Observable<Vec2> {
        &self.cells.resolution
    }

    #[must_use]
    pub fn eye_position(&self) -> &Observable<Vec3> {
        &self.cells.eye_position
    }

    // -- updates --------------------------------------------------------

    /// # Errors
    ///
    /// Propagates a failing watcher.
    pub fn update_view(&self, view: Mat4) -> Result<(), ListenerError> {
        self.cells.view.set(view)
    }

    /// # Errors
    ///
    /// Propagates a failing watcher.
    pub fn update_projection(&self, projection: Mat4) -> Result<(), ListenerError> {
        self.cells.projection.set(projection)
    }

    /// # Errors
    ///
    /// Propagates a failing watcher.
    pub fn update_resolution(&self, width: f32, height: f32) -> Result<(), ListenerError> {
        self.cells.resolution.set(Vec2::new(width, height))
    }

    /// # Errors
    ///
    /// Propagates a failing watcher.
    pub fn update_eye_position(&self, eye: Vec3) -> Result<(), ListenerError> {
        self.cells.eye_position.set(eye)
    }

    /// Project a world-space point to pixel coordinates (origin
    /// bottom-left).
    ///
    /// Returns `None` for points at or behind the eye plane.
    #[must_use]
    pub fn project(&self, point: Vec3) -> Option<Vec2> {
        let clip = self.cells.projection_view.get() * point.extend(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        let resolution = self.cells.resolution.get();
        Some((ndc.truncate() + Vec2::ONE) * 0.5 * resolution)
    }

    // -- steering -------------------------------------------------------

    /// Replace the camera's steering with `set`.
    ///
    /// Any previously attached steering is detached first. The new nodes are
    /// attached in order; if one fails, the handles the earlier nodes
    /// registered are detached again before the error is returned, so a
    /// failed attach leaves the camera without steering.
    ///
    /// # Errors
    ///
    /// The error of the first node that failed to attach.
    pub fn attach_steering(
        &self,
        events: &Events,
        set: SteeringSet,
    ) -> Result<Vec<ListenerHandle>, SteeringError> {
        self.detach_steering();

        let mut attached: Vec<ListenerHandle> = Vec::with_capacity(set.len());
        for node in set.iter() {
            match node.attach(events, self) {
                Ok(handle) => attached.push(handle),
                Err(err) => {
                    let rolled_back = attached.iter().filter(|h| h.detach()).count();
                    tracing::warn!(
                        message = "camera.steering.rollback",
                        node = node.name(),
                        rolled_back,
                        error = %err
                    );
                    return Err(err);
                }
            }
        }

        tracing::debug!(
            message = "camera.steering.attach",
            nodes = set.len(),
            listeners = attached.len()
        );
        self.cells.steering.borrow_mut().clone_from(&attached);
        Ok(attached)
    }

    /// Detach every listener of the current steering set.
    ///
    /// Returns how many listeners were actually removed; calling it again
    /// returns 0.
    pub fn detach_steering(&self) -> usize {
        let handles = std::mem::take(&mut *self.cells.steering.borrow_mut());
        let removed = handles.iter().filter(|h| h.detach()).count();
        if removed > 0 {
            tracing::debug!(message = "camera.steering.detach", removed);
        }
        removed
    }

    /// Number of steering listeners currently attached.
    #[must_use]
    pub fn steering_count(&self) -> usize {
        self.cells
            .steering
            .borrow()
            .iter()
            .filter(|h| h.is_attached())
            .count()
    }
}

/// Non-owning camera handle, for listeners registered on cells the camera
/// does not own.
#[derive(Clone)]
pub struct WeakCamera(Weak<CameraCells>);

impl WeakCamera {
    #[must_use]
    pub fn upgrade(&self) -> Option<Camera> {
        self.0.upgrade().map(|cells| Camera { cells })
    }
}

impl fmt::Debug for WeakCamera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WeakCamera")
            .field(&(self.0.strong_count() > 0))
            .finish()
    }
}

fn refresh<T>(
    cells: &Weak<CameraCells>,
) -> impl Fn(&T) -> Result<Dispatch, ListenerError> + 'static {
    let weak = Weak::clone(cells);
    move |_| {
        if let Some(cells) = weak.upgrade() {
            cells.refresh_projection_view()?;
        }
        Ok(Dispatch::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_view_tracks_both_inputs() {
        let cam = Camera::new();
        let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0));
        let proj = Mat4::from_scale(Vec3::splat(2.0));
        cam.update_view(view).unwrap();
        assert_eq!(cam.projection_view().get(), view);
        cam.update_projection(proj).unwrap();
        assert_eq!(cam.projection_view().get(), proj * view);
    }

    #[test]
    fn pixel_space_maps_corners() {
        let cam = Camera::with_resolution(800.0, 600.0);
        let m = cam.pixel_space().get();
        let top_right = m.project_point3(Vec3::new(800.0, 600.0, 0.0));
        let origin = m.project_point3(Vec3::ZERO);
        assert!(top_right.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(origin.abs_diff_eq(Vec3::new(-1.0, -1.0, 0.0), 1e-5));

        cam.update_resolution(0.0, 600.0).unwrap();
        assert_eq!(cam.pixel_space().get(), Mat4::IDENTITY);
    }

    #[test]
    fn initial_resolution_matches_a_later_update() {
        let built = Camera::with_resolution(640.0, 480.0);
        let updated = Camera::new();
        assert_eq!(updated.pixel_space().get(), Mat4::IDENTITY);
        updated.update_resolution(640.0, 480.0).unwrap();

        assert_eq!(built.resolution().get(), Vec2::new(640.0, 480.0));
        assert_eq!(built.pixel_space().get(), updated.pixel_space().get());
        assert_eq!(built.resolution().version(), 0);
    }

    #[test]
    fn derived_watchers_see_new_values() {
        let cam = Camera::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        cam.projection_view()
            .on(move |m: &Mat4| log.borrow_mut().push(m.x_axis.x));
        cam.update_projection(Mat4::from_scale(Vec3::splat(3.0)))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![3.0]);
    }

    #[test]
    fn project_world_to_pixels() {
        let cam = Camera::with_resolution(200.0, 100.0);
        cam.update_projection(Mat4::orthographic_rh_gl(0.0, 10.0, 0.0, 10.0, -1.0, 1.0))
            .unwrap();
        let px = cam.project(Vec3::new(5.0, 10.0, 0.0)).unwrap();
        assert!(px.abs_diff_eq(Vec2::new(100.0, 100.0), 1e-3));
    }

    #[test]
    fn detach_without_steering_is_noop() {
        let cam = Camera::new();
        assert_eq!(cam.detach_steering(), 0);
        assert_eq!(cam.steering_count(), 0);
    }

    #[test]
    fn dropping_camera_releases_cells() {
        let cam = Camera::new();
        let view = cam.view().clone();
        drop(cam);
        view.set(Mat4::IDENTITY).unwrap();
        assert_eq!(view.listener_count(), 1);
    }

    #[test]
    fn weak_camera_does_not_keep_alive() {
        let cam = Camera::new();
        let weak = cam.downgrade();
        assert!(weak.upgrade().is_some_and(|c| c.ptr_eq(&cam)));
        drop(cam);
        assert!(weak.upgrade().is_none());
    }
}
