#![forbid(unsafe_code)]

//! Camera steering: interactive control schemes as sets of listeners.
//!
//! A [`SteeringNode`] registers one listener, usually on an [`Events`] cell,
//! that updates a [`Camera`]. A [`SteeringSet`] is an ordered list of nodes
//! forming one control scheme; [`Camera::attach_steering`] swaps whole sets
//! and rolls back a partially attached one.
//!
//! Built-in schemes:
//! - [`PanZoom`]: 2D, drag to pan and scroll to zoom around the cursor.
//! - [`Orbit`]: 3D, drag to rotate about the look-at point and scroll to
//!   dolly.
//!
//! Custom nodes implement the trait or use [`SteeringSet::with_fn`].

mod orbit;
mod pan_zoom;

use std::fmt;

use glam::{DVec2, Vec2};
use vizkit_core::Events;
use vizkit_reactive::ListenerHandle;

use crate::camera::Camera;
use crate::error::SteeringError;

pub use orbit::{Orbit, OrbitConfig};
pub use pan_zoom::{PanZoom, PanZoomConfig, VisibleArea};

/// Priority of the built-in steering listeners. Interactive widgets that
/// should win over camera control register above it.
pub const STEERING_PRIORITY: i32 = -100;

/// Cursor position as a fraction of the viewport, `None` outside of it.
pub(crate) fn normalized_cursor(camera: &Camera, cursor: DVec2) -> Option<DVec2> {
    let resolution: Vec2 = camera.resolution().get();
    if resolution.x <= 0.0 || resolution.y <= 0.0 {
        return None;
    }
    let t = cursor / resolution.as_dvec2();
    (t.cmpge(DVec2::ZERO).all() && t.cmple(DVec2::ONE).all()).then_some(t)
}

/// One listener of a control scheme.
pub trait SteeringNode {
    /// Short name used in errors and logs.
    fn name(&self) -> &str;

    /// Register the node's listener.
    ///
    /// A node that returns an error must not leave a listener behind.
    ///
    /// # Errors
    ///
    /// [`SteeringError::InvalidConfig`] for a bad configuration,
    /// [`SteeringError::Rejected`] when the camera or bus is in a state the
    /// node cannot work with.
    fn attach(&self, events: &Events, camera: &Camera) -> Result<ListenerHandle, SteeringError>;
}

/// Ordered set of steering nodes, attached and detached as a unit.
#[derive(Default)]
pub struct SteeringSet {
    nodes: Vec<Box<dyn SteeringNode>>,
}

impl fmt::Debug for SteeringSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.nodes.iter().map(|n| n.name()))
            .finish()
    }
}

impl SteeringSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, node: impl SteeringNode + 'static) -> Self {
        self.push(node);
        self
    }

    /// Add a node built from a closure.
    #[must_use]
    pub fn with_fn<F>(self, name: &str, attach: F) -> Self
    where
        F: Fn(&Events, &Camera) -> Result<ListenerHandle, SteeringError> + 'static,
    {
        self.with(FnNode {
            name: name.to_string(),
            attach,
        })
    }

    pub fn push(&mut self, node: impl SteeringNode + 'static) {
        self.nodes.push(Box::new(node));
    }

    /// Append every node of `other`.
    #[must_use]
    pub fn merge(mut self, other: SteeringSet) -> Self {
        self.nodes.extend(other.nodes);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SteeringNode> {
        self.nodes.iter().map(|n| n.as_ref())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }
}

struct FnNode<F> {
    name: String,
    attach: F,
}

impl<F> SteeringNode for FnNode<F>
where
    F: Fn(&Events, &Camera) -> Result<ListenerHandle, SteeringError>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn attach(&self, events: &Events, camera: &Camera) -> Result<ListenerHandle, SteeringError> {
        (self.attach)(events, camera)
    }
}
