use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, PoisonError},
    task::{Context, Poll},
};

use futures::{
    channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
    Stream, StreamExt,
};

use crate::{
    resolver::{Error, EventStream},
    value::FieldValue,
};

/// In-process publish/subscribe event source keyed by trigger name.
///
/// Clones share the same subscribers.
#[derive(Clone, Default)]
pub struct PubSub(Arc<Mutex<Subscribers>>);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    by_trigger: HashMap<String, HashMap<u64, UnboundedSender<FieldValue>>>,
}

impl PubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives the payloads published to any of the triggers until the subscription is dropped.
    pub fn subscribe<T: Into<String>>(&self, triggers: impl IntoIterator<Item = T>) -> EventSubscription {
        let (sender, receiver) = mpsc::unbounded();
        let triggers = triggers.into_iter().map(Into::into).collect::<Vec<String>>();

        let mut subscribers = self.lock();
        let id = subscribers.next_id;
        subscribers.next_id += 1;
        for trigger in &triggers {
            subscribers
                .by_trigger
                .entry(trigger.clone())
                .or_default()
                .insert(id, sender.clone());
        }
        drop(subscribers);

        tracing::debug!("Subscribed to {}", triggers.join(", "));
        EventSubscription {
            id,
            triggers,
            receiver,
            pubsub: self.clone(),
        }
    }

    /// Sends the payload to every subscriber of the trigger and returns how many received it.
    pub fn publish(&self, trigger: &str, payload: impl Into<FieldValue>) -> usize {
        let payload = payload.into();
        let subscribers = self.lock();
        subscribers
            .by_trigger
            .get(trigger)
            .map(|senders| {
                senders
                    .values()
                    .filter(|sender| sender.unbounded_send(payload.clone()).is_ok())
                    .count()
            })
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, trigger: &str) -> usize {
        self.lock().by_trigger.get(trigger).map(HashMap::len).unwrap_or_default()
    }

    fn unsubscribe(&self, id: u64, triggers: &[String]) {
        let mut subscribers = self.lock();
        for trigger in triggers {
            if let Some(senders) = subscribers.by_trigger.get_mut(trigger) {
                senders.remove(&id);
                if senders.is_empty() {
                    subscribers.by_trigger.remove(trigger);
                }
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream of the payloads published to the triggers of a [`PubSub::subscribe`] call.
///
/// Unsubscribes when dropped.
pub struct EventSubscription {
    id: u64,
    triggers: Vec<String>,
    receiver: UnboundedReceiver<FieldValue>,
    pubsub: PubSub,
}

impl EventSubscription {
    pub fn into_event_stream(self) -> EventStream {
        self.boxed()
    }
}

impl Stream for EventSubscription {
    type Item = Result<FieldValue, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx).map(|payload| payload.map(Ok))
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.pubsub.unsubscribe(self.id, &self.triggers);
        tracing::debug!("Unsubscribed from {}", self.triggers.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_to_subscribers() {
        let pubsub = PubSub::new();
        let mut messages = pubsub.subscribe(["messages", "alerts"]);
        let mut alerts = pubsub.subscribe(["alerts"]);

        assert_eq!(pubsub.publish("messages", "hello"), 1);
        assert_eq!(pubsub.publish("alerts", "fire"), 2);
        assert_eq!(pubsub.publish("unknown", "nobody"), 0);

        let next = |event: Option<Result<FieldValue, Error>>| event.unwrap().unwrap().as_str().map(str::to_owned);
        assert_eq!(next(messages.next().await).as_deref(), Some("hello"));
        assert_eq!(next(messages.next().await).as_deref(), Some("fire"));
        assert_eq!(next(alerts.next().await).as_deref(), Some("fire"));
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let pubsub = PubSub::new();
        let first = pubsub.subscribe(["messages"]);
        let second = pubsub.subscribe(["messages"]).into_event_stream();
        assert_eq!(pubsub.subscriber_count("messages"), 2);

        drop(first);
        assert_eq!(pubsub.subscriber_count("messages"), 1);
        assert_eq!(pubsub.publish("messages", 1), 1);

        drop(second);
        assert_eq!(pubsub.subscriber_count("messages"), 0);
        assert_eq!(pubsub.publish("messages", 2), 0);
    }
}
