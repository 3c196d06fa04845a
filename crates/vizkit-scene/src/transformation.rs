#![forbid(unsafe_code)]

//! Hierarchical model transforms.
//!
//! A [`Transformation`] holds translation, scale, rotation and a per-axis
//! data transform as observable cells, plus a derived model matrix:
//!
//! ```text
//! model = parent.model * T * R * S     (T * R * S for a root)
//! ```
//!
//! The model cell is recomputed by system-tier listeners whenever a local
//! component changes or the parent's model changes, so watchers of
//! [`Transformation::model`] always see a consistent matrix.
//!
//! # Ownership
//!
//! Parents hold their children weakly and children hold their parent
//! weakly. Listener closures capture weak references too, so a node lives
//! exactly as long as user code holds a [`Transformation`] handle to it.
//! When a parent goes away its children become roots and recompute.
//!
//! # Transform functions
//!
//! A child inherits its parent's [`AxisTransforms`] until
//! [`set_transform_function`](Transformation::set_transform_function) is called on
//! it. The transform function is applied to data before the model matrix
//! and does not enter the matrix itself.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{Mat4, Quat, Vec3};
use vizkit_reactive::{Dispatch, ListenerError, ListenerHandle, Observable};

use crate::error::{Result, SceneError};
use crate::transform_func::AxisTransforms;

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a transformation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Node {
    id: NodeId,
    translation: Observable<Vec3>,
    scale: Observable<Vec3>,
    rotation: Observable<Quat>,
    transform_func: Observable<AxisTransforms>,
    model: Observable<Mat4>,
    parent: RefCell<Weak<Node>>,
    children: RefCell<Vec<Weak<Node>>>,
    /// Listeners this node keeps on its parent's cells.
    parent_links: RefCell<Vec<ListenerHandle>>,
    inherits_transform_func: Cell<bool>,
}

impl Node {
    fn local_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.scale.get(),
            self.rotation.get(),
            self.translation.get(),
        )
    }

    fn recompute(&self) -> std::result::Result<(), ListenerError> {
        let local = self.local_matrix();
        let parent = self.parent.borrow().upgrade();
        let model = match parent {
            Some(parent) => parent.model.get() * local,
            None => local,
        };
        self.model.set(model)
    }

    fn unlink_parent(&self) {
        for handle in self.parent_links.borrow_mut().drain(..) {
            handle.detach();
        }
        let old = std::mem::take(&mut *self.parent.borrow_mut());
        if let Some(old) = old.upgrade() {
            old.children
                .borrow_mut()
                .retain(|child| child.upgrade().is_some_and(|c| c.id != self.id));
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        for handle in self.parent_links.get_mut().drain(..) {
            handle.detach();
        }
        let parent = self.parent.get_mut().upgrade();
        if let Some(parent) = parent {
            parent
                .children
                .borrow_mut()
                .retain(|child| child.strong_count() > 0);
        }
        let children = std::mem::take(self.children.get_mut());
        for child in children.iter().filter_map(Weak::upgrade) {
            let links = std::mem::take(&mut *child.parent_links.borrow_mut());
            for handle in links {
                handle.detach();
            }
            *child.parent.borrow_mut() = Weak::new();
            if let Err(err) = child.recompute() {
                tracing::warn!(
                    message = "transform.orphan_recompute_failed",
                    node = %child.id,
                    error = %err
                );
            }
        }
    }
}

/// A node of the transformation hierarchy.
///
/// Cloning yields another handle to the same node.
#[derive(Clone)]
pub struct Transformation {
    node: Rc<Node>,
}

impl Default for Transformation {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformation")
            .field("id", &self.node.id)
            .field("translation", &self.node.translation.get())
            .field("scale", &self.node.scale.get())
            .field("rotation", &self.node.rotation.get())
            .field("parent", &self.parent().map(|p| p.id()))
            .finish()
    }
}

impl Transformation {
    /// Identity root node.
    #[must_use]
    pub fn new() -> Self {
        Self::with_components(Vec3::ZERO, Vec3::ONE, Quat::IDENTITY)
    }

    #[must_use]
    pub fn with_components(translation: Vec3, scale: Vec3, rotation: Quat) -> Self {
        let node = Rc::new(Node {
            id: NodeId::next(),
            translation: Observable::new(translation),
            scale: Observable::new(scale),
            rotation: Observable::new(rotation),
            transform_func: Observable::new(AxisTransforms::default()),
            model: Observable::new(Mat4::from_scale_rotation_translation(
                scale,
                rotation,
                translation,
            )),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            parent_links: RefCell::new(Vec::new()),
            inherits_transform_func: Cell::new(true),
        });
        let this = Self { node };
        this.wire_local_cells();
        this
    }

    fn wire_local_cells(&self) {
        let n = &self.node;
        n.translation.register_system(0, recompute_on_change(&self.node));
        n.scale.register_system(0, recompute_on_change(&self.node));
        n.rotation.register_system(0, recompute_on_change(&self.node));
    }

    #[must_use]
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    // -- components -----------------------------------------------------

    #[must_use]
    pub fn translation(&self) -> Vec3 {
        self.node.translation.get()
    }

    #[must_use]
    pub fn scale(&self) -> Vec3 {
        self.node.scale.get()
    }

    #[must_use]
    pub fn rotation(&self) -> Quat {
        self.node.rotation.get()
    }

    #[must_use]
    pub fn transform_func(&self) -> AxisTransforms {
        self.node.transform_func.get()
    }

    /// Current model matrix.
    #[must_use]
    pub fn model_matrix(&self) -> Mat4 {
        self.node.model.get()
    }

    /// The model matrix cell, for watchers.
    #[must_use]
    pub fn model(&self) -> &Observable<Mat4> {
        &self.node.model
    }

    /// The transform function cell, for watchers.
    #[must_use]
    pub fn transform_func_cell(&self) -> &Observable<AxisTransforms> {
        &self.node.transform_func
    }

    /// # Errors
    ///
    /// Propagates a failing model watcher; the new translation stays set.
    pub fn set_translation(&self, translation: Vec3) -> Result<()> {
        Ok(self.node.translation.set(translation)?)
    }

    /// # Errors
    ///
    /// Propagates a failing model watcher; the new scale stays set.
    pub fn set_scale(&self, scale: Vec3) -> Result<()> {
        Ok(self.node.scale.set(scale)?)
    }

    /// # Errors
    ///
    /// Propagates a failing model watcher; the new rotation stays set.
    pub fn set_rotation(&self, rotation: Quat) -> Result<()> {
        Ok(self.node.rotation.set(rotation)?)
    }

    /// Add `delta` to the translation.
    ///
    /// # Errors
    ///
    /// Propagates a failing model watcher.
    pub fn translate_by(&self, delta: Vec3) -> Result<()> {
        Ok(self.node.translation.update(|t| *t += delta)?)
    }

    /// Multiply the scale component-wise by `factor`.
    ///
    /// # Errors
    ///
    /// Propagates a failing model watcher.
    pub fn scale_by(&self, factor: Vec3) -> Result<()> {
        Ok(self.node.scale.update(|s| *s *= factor)?)
    }

    /// Apply `rotation` after the current rotation.
    ///
    /// # Errors
    ///
    /// Propagates a failing model watcher.
    pub fn rotate_by(&self, rotation: Quat) -> Result<()> {
        Ok(self
            .node
            .rotation
            .update(|r| *r = (rotation * *r).normalize())?)
    }

    /// Set this node's own transform function.
    ///
    /// The node stops inheriting from its parent; its descendants that still
    /// inherit pick the new value up. Watchers of [`model`](Self::model) are
    /// notified as well.
    ///
    /// # Errors
    ///
    /// Propagates a failing watcher.
    pub fn set_transform_function(&self, funcs: AxisTransforms) -> Result<()> {
        self.node.inherits_transform_func.set(false);
        self.node.transform_func.set(funcs)?;
        Ok(self.node.recompute()?)
    }

    /// Whether this node still follows its parent's transform function.
    #[must_use]
    pub fn inherits_transform_func(&self) -> bool {
        self.node.inherits_transform_func.get()
    }

    /// Map a data-space point through the transform function only.
    #[must_use]
    pub fn apply_transform_func(&self, point: Vec3) -> Vec3 {
        self.node.transform_func.with(|f| f.apply(point))
    }

    /// Map a data-space point to world space: transform function, then
    /// model matrix.
    #[must_use]
    pub fn to_world(&self, point: Vec3) -> Vec3 {
        self.model_matrix()
            .transform_point3(self.apply_transform_func(point))
    }

    // -- hierarchy ------------------------------------------------------

    #[must_use]
    pub fn parent(&self) -> Option<Transformation> {
        self.node
            .parent
            .borrow()
            .upgrade()
            .map(|node| Transformation { node })
    }

    /// Live children, in attach order.
    #[must_use]
    pub fn children(&self) -> Vec<Transformation> {
        self.node
            .children
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .map(|node| Transformation { node })
            .collect()
    }

    /// Whether `self` is `other` or one of its ancestors.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Transformation) -> bool {
        let mut cursor = Some(Rc::clone(&other.node));
        while let Some(node) = cursor {
            if Rc::ptr_eq(&node, &self.node) {
                return true;
            }
            cursor = node.parent.borrow().upgrade();
        }
        false
    }

    /// Make `child` a child of `self`.
    ///
    /// A child that already has a parent is moved. The child's model matrix
    /// is recomputed immediately and follows `self` from then on.
    ///
    /// # Errors
    ///
    /// [`SceneError::Cycle`] if `child` is `self` or one of its ancestors;
    /// the hierarchy is left unchanged. A failing model watcher is
    /// propagated after the link is in place.
    pub fn attach_child(&self, child: &Transformation) -> Result<()> {
        if child.is_ancestor_of(self) {
            tracing::debug!(
                message = "transform.cycle_rejected",
                parent = %self.id(),
                child = %child.id()
            );
            return Err(SceneError::Cycle {
                child: child.id(),
                parent: self.id(),
            });
        }

        child.node.unlink_parent();
        *child.node.parent.borrow_mut() = Rc::downgrade(&self.node);
        self.node
            .children
            .borrow_mut()
            .push(Rc::downgrade(&child.node));

        let mut links = Vec::with_capacity(2);
        links.push(
            self.node
                .model
                .register_system(0, recompute_on_change(&child.node)),
        );
        let weak_child = Rc::downgrade(&child.node);
        links.push(self.node.transform_func.register_system(0, move |funcs| {
            if let Some(child) = weak_child.upgrade()
                && child.inherits_transform_func.get()
            {
                child.transform_func.set(funcs.clone())?;
                child.recompute()?;
            }
            Ok(Dispatch::Continue)
        }));
        *child.node.parent_links.borrow_mut() = links;

        tracing::trace!(
            message = "transform.attach",
            parent = %self.id(),
            child = %child.id()
        );

        if child.node.inherits_transform_func.get() {
            child
                .node
                .transform_func
                .set(self.node.transform_func.get())?;
        }
        Ok(child.node.recompute()?)
    }

    /// Detach from the current parent and become a root.
    ///
    /// No-op for a root.
    ///
    /// # Errors
    ///
    /// Propagates a failing model watcher.
    pub fn detach_from_parent(&self) -> Result<()> {
        if self.node.parent.borrow().upgrade().is_none() {
            return Ok(());
        }
        self.node.unlink_parent();
        tracing::trace!(message = "transform.detach", node = %self.id());
        Ok(self.node.recompute()?)
    }
}

fn recompute_on_change<T>(
    node: &Rc<Node>,
) -> impl Fn(&T) -> std::result::Result<Dispatch, ListenerError> + 'static {
    let weak = Rc::downgrade(node);
    move |_| {
        if let Some(node) = weak.upgrade() {
            node.recompute()?;
        }
        Ok(Dispatch::Continue)
    }
}
