//! Publish/subscribe bus carrying every user-facing message.
//!
//! The engine and its adapters never print directly: they post typed
//! messages here, and user interfaces subscribe to render them. The bus is
//! the serialisation point for user-visible output: callbacks run one at a
//! time, in publish order, regardless of which thread posted.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Category of a reported message, driving how a UI renders it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Normal,
    Title,
    Info,
    Warning,
    Error,
    Notification,
}

/// A single message published on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
}

type Callback = Box<dyn Fn(&Message) + Send>;

struct Bus {
    subscribers: Mutex<Vec<(u64, Callback)>>,
    next_id: AtomicU64,
}

static BUS: Lazy<Bus> = Lazy::new(|| Bus {
    subscribers: Mutex::new(Vec::new()),
    next_id: AtomicU64::new(1),
});

/// Handle returned by [`subscribe`]; dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

impl Subscription {
    /// Explicitly detach this subscriber from the bus.
    pub fn unsubscribe(self) {
        // Removal happens in Drop
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Ok(mut subs) = BUS.subscribers.lock() {
            subs.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Register a callback receiving every message published from now on.
pub fn subscribe(f: impl Fn(&Message) + Send + 'static) -> Subscription {
    let id = BUS.next_id.fetch_add(1, Ordering::Relaxed);
    BUS.subscribers
        .lock()
        .expect("report bus poisoned")
        .push((id, Box::new(f)));
    Subscription { id }
}

fn publish(kind: MessageKind, text: String) {
    let msg = Message { kind, text };
    let subs = BUS.subscribers.lock().expect("report bus poisoned");
    for (_, callback) in subs.iter() {
        callback(&msg);
    }
}

/// Post raw command output or other untyped text.
pub fn post_text(text: impl Into<String>) {
    publish(MessageKind::Normal, text.into());
}

/// Post a section title.
pub fn post_title(text: impl Into<String>) {
    publish(MessageKind::Title, text.into());
}

pub fn post_info(text: impl Into<String>) {
    publish(MessageKind::Info, text.into());
}

pub fn post_warning(text: impl Into<String>) {
    publish(MessageKind::Warning, text.into());
}

pub fn post_error(text: impl Into<String>) {
    publish(MessageKind::Error, text.into());
}

/// Post a message that UIs may additionally surface as a desktop notification.
pub fn post_notification(text: impl Into<String>) {
    publish(MessageKind::Notification, text.into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn collector() -> (Arc<Mutex<Vec<Message>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = subscribe(move |m| sink.lock().unwrap().push(m.clone()));
        (seen, sub)
    }

    #[test]
    fn subscriber_receives_messages_posted_after_subscription() {
        post_info("before");
        let (seen, sub) = collector();
        post_info("after");
        sub.unsubscribe();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|m| m.text != "before"));
        assert!(seen.iter().any(|m| m.text == "after" && m.kind == MessageKind::Info));
    }

    #[test]
    fn unsubscribed_callback_no_longer_fires() {
        let (seen, sub) = collector();
        post_warning("one");
        sub.unsubscribe();
        post_warning("two");

        let seen = seen.lock().unwrap();
        assert!(seen.iter().any(|m| m.text == "one"));
        assert!(seen.iter().all(|m| m.text != "two"));
    }

    #[test]
    fn messages_are_delivered_in_publish_order() {
        let (seen, sub) = collector();
        post_title("t");
        post_text("n");
        post_error("e");
        sub.unsubscribe();

        let kinds: Vec<MessageKind> = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|m| ["t", "n", "e"].contains(&m.text.as_str()))
            .map(|m| m.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![MessageKind::Title, MessageKind::Normal, MessageKind::Error]
        );
    }
}
