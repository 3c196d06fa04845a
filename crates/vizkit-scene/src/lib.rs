#![forbid(unsafe_code)]

//! Scene: transformation hierarchy, camera and camera steering.
//!
//! # Role in vizkit
//! `vizkit-scene` turns input into matrices. [`Transformation`] nodes
//! compose model matrices along a parent chain; a [`Camera`] keeps view,
//! projection and pixel-space matrices current; steering nodes connect the
//! [`Events`](vizkit_core::Events) bus to the camera.
//!
//! # Primary responsibilities
//! - **Transformation**: observable translation/scale/rotation with a
//!   derived model matrix, cycle-checked re-parenting, inherited per-axis
//!   transform functions.
//! - **Camera**: observable matrices with `projection * view` and pixel
//!   space kept current, world-to-pixel projection.
//! - **Steering**: replaceable listener sets with rollback on partial
//!   failure; built-in [`PanZoom`] and [`Orbit`].
//! - **Interface shapes**: glyph collections and plot specs exchanged with
//!   text layout and plot construction.
//!
//! # How it fits in the system
//! The backend feeds `Events`; steering listeners update the `Camera`;
//! the renderer reads `Camera::projection_view`, `Camera::resolution` and
//! `Transformation::model_matrix` each frame.

pub mod camera;
pub mod error;
pub mod interface;
pub mod steering;
pub mod transform_func;
pub mod transformation;

pub use camera::{Camera, WeakCamera};
pub use error::{InterfaceError, SceneError, SteeringError};
pub use steering::{
    Orbit, OrbitConfig, PanZoom, PanZoomConfig, SteeringNode, SteeringSet, VisibleArea,
};
pub use transform_func::{AxisTransforms, TransformFunc};
pub use transformation::{NodeId, Transformation};
