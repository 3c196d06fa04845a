//! End-to-end scenarios: input flowing through steering into camera and
//! model matrices.
//!
//! 1. Parent/child translations compose.
//! 2. Cycles are rejected without touching the hierarchy.
//! 3. A steering set that fails partway leaves no listener behind and does
//!    not bring the previous set back.
//! 4. Detaching steering twice is a no-op.
//! 5. A widget above the steering priority can take input away from the
//!    camera.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use glam::{DVec2, Vec2, Vec3};
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use vizkit_core::Events;
use vizkit_core::input::{MouseButton, MouseButtonEvent};
use vizkit_reactive::Dispatch;
use vizkit_scene::steering::STEERING_PRIORITY;
use vizkit_scene::{
    Camera, Orbit, PanZoom, SceneError, SteeringError, SteeringSet, Transformation, VisibleArea,
};

fn pan_zoom() -> PanZoom {
    PanZoom::new(VisibleArea::new(DVec2::ZERO, DVec2::splat(10.0)))
}

fn failing(name: &'static str) -> SteeringSet {
    SteeringSet::new().with_fn(name, move |_, _| {
        Err(SteeringError::rejected(name, "camera has no window"))
    })
}

#[test]
fn parent_and_child_translations_compose() {
    let parent = Transformation::new();
    let child = Transformation::new();
    parent.attach_child(&child).unwrap();
    parent.set_translation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
    child.set_translation(Vec3::new(0.0, 1.0, 0.0)).unwrap();

    let origin = child.model_matrix().transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));
}

#[test]
fn cycle_is_rejected_and_hierarchy_unchanged() {
    let a = Transformation::new();
    let b = Transformation::new();
    a.attach_child(&b).unwrap();

    let err = b.attach_child(&a).unwrap_err();
    assert!(matches!(err, SceneError::Cycle { child, parent } if child == a.id() && parent == b.id()));
    assert!(a.parent().is_none());
    assert!(b.parent().is_some_and(|p| p.ptr_eq(&a)));
    assert_eq!(a.children().len(), 1);
    assert!(b.children().is_empty());
}

#[test]
fn partial_attach_rolls_back_new_listeners_only() {
    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    let baseline = events.user_listener_count();

    let set = pan_zoom().steering().merge(failing("needs_window"));
    let err = camera.attach_steering(&events, set).unwrap_err();
    assert!(matches!(err, SteeringError::Rejected { ref node, .. } if node == "needs_window"));
    assert_eq!(events.user_listener_count(), baseline);
    assert_eq!(camera.steering_count(), 0);
    assert!(events.pressed_state_wired());
}

#[test]
fn failed_swap_does_not_restore_previous_set() {
    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    let pz = pan_zoom();
    camera.attach_steering(&events, pz.steering()).unwrap();
    assert_eq!(camera.steering_count(), 3);

    let err = camera
        .attach_steering(&events, Orbit::default().steering().merge(failing("late")))
        .unwrap_err();
    assert!(matches!(err, SteeringError::Rejected { .. }));
    assert_eq!(camera.steering_count(), 0);
    assert_eq!(events.user_listener_count(), 0);
    assert_eq!(camera.resolution().user_listener_count(), 0);

    events.mouse_position.set(DVec2::new(50.0, 50.0)).unwrap();
    events.scroll.set(DVec2::new(0.0, 1.0)).unwrap();
    assert_eq!(pz.area().size, DVec2::splat(10.0));
}

#[test]
fn detaching_twice_is_a_noop() {
    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    let handles = camera.attach_steering(&events, pan_zoom().steering()).unwrap();
    assert_eq!(handles.len(), 3);

    assert_eq!(camera.detach_steering(), 3);
    assert_eq!(camera.detach_steering(), 0);
    assert!(handles.iter().all(|h| !h.is_attached()));
    assert!(handles.iter().all(|h| !h.detach()));
    assert_eq!(events.user_listener_count(), 0);
}

#[test]
fn widget_above_steering_takes_the_scroll() {
    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    let pz = pan_zoom();
    camera.attach_steering(&events, pz.steering()).unwrap();

    let hovering = Rc::new(Cell::new(true));
    let over_widget = Rc::clone(&hovering);
    events.scroll.register(STEERING_PRIORITY + 1, move |_| {
        Ok(Dispatch::consume_if(over_widget.get()))
    });

    events.mouse_position.set(DVec2::new(50.0, 50.0)).unwrap();
    events.scroll.set(DVec2::new(0.0, 1.0)).unwrap();
    assert_eq!(pz.area().size, DVec2::splat(10.0));

    hovering.set(false);
    events.scroll.set(DVec2::new(0.0, 1.0)).unwrap();
    assert!(pz.area().size.x < 10.0);
}

#[test]
fn pan_then_project_through_camera() {
    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    let pz = pan_zoom();
    camera.attach_steering(&events, pz.steering()).unwrap();

    let marker = Transformation::new();
    marker.set_translation(Vec3::new(5.0, 5.0, 0.0)).unwrap();
    let world = marker.to_world(Vec3::ZERO);
    let before = camera.project(world).unwrap();
    assert!(before.abs_diff_eq(Vec2::new(50.0, 50.0), 1e-3));

    events.mouse_position.set(DVec2::new(50.0, 50.0)).unwrap();
    events
        .mouse_button
        .set(MouseButtonEvent::press(MouseButton::Right))
        .unwrap();
    events.mouse_position.set(DVec2::new(70.0, 50.0)).unwrap();
    events
        .mouse_button
        .set(MouseButtonEvent::release(MouseButton::Right))
        .unwrap();

    let after = camera.project(world).unwrap();
    assert!(after.abs_diff_eq(Vec2::new(70.0, 50.0), 1e-3));
}

// ── Tracing ─────────────────────────────────────────────────────────────

struct MessageCapture {
    seen: Arc<Mutex<Vec<String>>>,
}

impl<S: Subscriber> Layer<S> for MessageCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        struct Msg(Option<String>);
        impl tracing::field::Visit for Msg {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.0 = Some(value.to_string());
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.0 = Some(format!("{value:?}").trim_matches('"').to_string());
                }
            }
        }
        let mut msg = Msg(None);
        event.record(&mut msg);
        if let Some(message) = msg.0 {
            self.seen.lock().expect("capture lock").push(message);
        }
    }
}

#[test]
fn rollback_is_logged() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(MessageCapture {
        seen: Arc::clone(&seen),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let events = Events::new();
    let camera = Camera::with_resolution(100.0, 100.0);
    camera.attach_steering(&events, pan_zoom().steering()).unwrap();
    let _ = camera.attach_steering(&events, failing("broken"));

    let messages = seen.lock().expect("capture lock");
    assert!(messages.iter().any(|m| m == "camera.steering.attach"));
    assert!(messages.iter().any(|m| m == "camera.steering.detach"));
    assert!(messages.iter().any(|m| m == "camera.steering.rollback"));
}
