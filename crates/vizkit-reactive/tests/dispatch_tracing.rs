//! Tracing output of the dispatch loop.

use std::sync::{Arc, Mutex};

use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::{Context, SubscriberExt};
use vizkit_reactive::{Dispatch, Observable};

#[derive(Default)]
struct Seen {
    messages: Vec<String>,
}

struct MessageCapture {
    seen: Arc<Mutex<Seen>>,
}

impl<S: Subscriber> Layer<S> for MessageCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        struct Msg {
            message: Option<String>,
        }
        impl tracing::field::Visit for Msg {
            fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
                if field.name() == "message" {
                    self.message = Some(value.to_string());
                }
            }

            fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                if field.name() == "message" {
                    self.message = Some(format!("{value:?}").trim_matches('"').to_string());
                }
            }
        }
        let mut msg = Msg { message: None };
        event.record(&mut msg);
        if let Some(message) = msg.message {
            self.seen.lock().expect("capture lock").messages.push(message);
        }
    }
}

#[test]
fn consume_emits_trace_event() {
    let seen = Arc::new(Mutex::new(Seen::default()));
    let subscriber = tracing_subscriber::registry().with(MessageCapture {
        seen: Arc::clone(&seen),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let obs = Observable::new(0);
    obs.register(3, |_| Ok(Dispatch::Consume));
    obs.register(1, |_| Ok(Dispatch::Continue));
    obs.set(1).unwrap();

    let snapshot = seen.lock().expect("capture lock");
    assert!(
        snapshot.messages.iter().any(|m| m == "observable.register"),
        "expected observable.register trace event"
    );
    assert!(
        snapshot.messages.iter().any(|m| m == "observable.consume"),
        "expected observable.consume trace event"
    );
}
